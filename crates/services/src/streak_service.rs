//! Streak tracking with a remote source of truth and a local mirror.

use std::sync::Arc;

use reframe_core::model::{Streak, TransformationPlan};
use storage::repository::StreakStore;

use crate::ai::StreakSource;
use crate::error::StreakServiceError;

/// Serves streak counters, preferring the coach backend and falling back
/// to the locally mirrored copy when it is unreachable.
pub struct StreakService {
    remote: Arc<dyn StreakSource>,
    mirror: Arc<dyn StreakStore>,
}

impl StreakService {
    pub fn new(remote: Arc<dyn StreakSource>, mirror: Arc<dyn StreakStore>) -> Self {
        Self { remote, mirror }
    }

    /// The current streak, refreshed from the backend when possible.
    ///
    /// # Errors
    ///
    /// Returns `Storage` only when the backend is unreachable and the
    /// mirror cannot be read either.
    pub async fn current(&self) -> Result<Streak, StreakServiceError> {
        match self.remote.current_streak().await {
            Ok(streak) => {
                if let Err(err) = self.mirror.save_streak(&streak).await {
                    tracing::warn!(error = %err, "failed to mirror streak");
                }
                Ok(streak)
            }
            Err(err) => {
                tracing::warn!(error = %err, "streak fetch failed, serving mirrored copy");
                let mirrored = self.mirror.load_streak().await?;
                Ok(mirrored.unwrap_or_else(|| Streak::from_counts(0, 0)))
            }
        }
    }

    /// Extends the streak after a completed day and updates the mirror.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the mirror cannot be read or written.
    pub async fn record_completion(&self) -> Result<Streak, StreakServiceError> {
        let mut streak = self
            .mirror
            .load_streak()
            .await?
            .unwrap_or_else(|| Streak::from_counts(0, 0));
        streak.record_completion();
        self.mirror.save_streak(&streak).await?;
        Ok(streak)
    }

    /// Resets the current run after a missed day; the best counter stays.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the mirror cannot be read or written.
    pub async fn record_break(&self) -> Result<Streak, StreakServiceError> {
        let mut streak = self
            .mirror
            .load_streak()
            .await?
            .unwrap_or_else(|| Streak::from_counts(0, 0));
        streak.record_break();
        self.mirror.save_streak(&streak).await?;
        Ok(streak)
    }

    /// Adopts the counters a freshly generated plan ships with.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the mirror cannot be written.
    pub async fn adopt_plan(&self, plan: &TransformationPlan) -> Result<Streak, StreakServiceError> {
        let streak = Streak::from_counts(plan.current_streak, plan.longest_streak);
        self.mirror.save_streak(&streak).await?;
        Ok(streak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::repository::InMemoryStore;

    use crate::error::CoachApiError;

    struct FixedRemote(Streak);

    #[async_trait]
    impl StreakSource for FixedRemote {
        async fn current_streak(&self) -> Result<Streak, CoachApiError> {
            Ok(self.0)
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl StreakSource for FailingRemote {
        async fn current_streak(&self) -> Result<Streak, CoachApiError> {
            Err(CoachApiError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn remote_counters_are_served_and_mirrored() {
        let mirror = Arc::new(InMemoryStore::new());
        let service = StreakService::new(Arc::new(FixedRemote(Streak::from_counts(3, 7))), mirror.clone());

        let streak = service.current().await.unwrap();
        assert_eq!(streak.current(), 3);
        assert_eq!(streak.best(), 7);

        let mirrored = mirror.load_streak().await.unwrap().unwrap();
        assert_eq!(mirrored.current(), 3);
    }

    #[tokio::test]
    async fn mirror_serves_when_remote_fails() {
        let mirror = Arc::new(InMemoryStore::new());
        mirror.save_streak(&Streak::from_counts(2, 5)).await.unwrap();
        let service = StreakService::new(Arc::new(FailingRemote), mirror);

        let streak = service.current().await.unwrap();
        assert_eq!(streak.current(), 2);
        assert_eq!(streak.best(), 5);
    }

    #[tokio::test]
    async fn completion_extends_the_run_and_the_best() {
        let mirror = Arc::new(InMemoryStore::new());
        mirror.save_streak(&Streak::from_counts(4, 4)).await.unwrap();
        let service = StreakService::new(Arc::new(FailingRemote), mirror);

        let streak = service.record_completion().await.unwrap();
        assert_eq!(streak.current(), 5);
        assert_eq!(streak.best(), 5);

        let broken = service.record_break().await.unwrap();
        assert_eq!(broken.current(), 0);
        assert_eq!(broken.best(), 5);
    }
}
