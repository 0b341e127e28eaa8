use serde::{Deserialize, Serialize};

/// Gamified completion streak: the current run and the best run so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    current: u32,
    best: u32,
}

impl Streak {
    /// Rehydrate a streak from persisted or remote counters.
    ///
    /// `best` is raised to `current` if the stored values disagree.
    #[must_use]
    pub fn from_counts(current: u32, best: u32) -> Self {
        Self {
            current,
            best: best.max(current),
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn best(&self) -> u32 {
        self.best
    }

    /// Extend the streak by one completed day.
    pub fn record_completion(&mut self) {
        self.current = self.current.saturating_add(1);
        self.best = self.best.max(self.current);
    }

    /// A missed day resets the current run; the best run is kept.
    pub fn record_break(&mut self) {
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_raises_best_with_current() {
        let mut streak = Streak::default();
        streak.record_completion();
        streak.record_completion();
        assert_eq!(streak.current(), 2);
        assert_eq!(streak.best(), 2);
    }

    #[test]
    fn break_keeps_best() {
        let mut streak = Streak::from_counts(5, 5);
        streak.record_break();
        streak.record_completion();
        assert_eq!(streak.current(), 1);
        assert_eq!(streak.best(), 5);
    }

    #[test]
    fn from_counts_repairs_inverted_values() {
        let streak = Streak::from_counts(7, 3);
        assert_eq!(streak.best(), 7);
    }
}
