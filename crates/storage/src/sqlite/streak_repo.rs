use async_trait::async_trait;
use sqlx::Row;

use reframe_core::model::Streak;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{StorageError, StreakStore};

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

#[async_trait]
impl StreakStore for SqliteRepository {
    async fn load_streak(&self) -> Result<Option<Streak>, StorageError> {
        let row = sqlx::query("SELECT current, best FROM streak WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let current = u32_from_i64("current", row.try_get::<i64, _>("current").map_err(ser)?)?;
        let best = u32_from_i64("best", row.try_get::<i64, _>("best").map_err(ser)?)?;
        Ok(Some(Streak::from_counts(current, best)))
    }

    async fn save_streak(&self, streak: &Streak) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO streak (id, current, best)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                current = excluded.current,
                best = excluded.best
            ",
        )
        .bind(i64::from(streak.current()))
        .bind(i64::from(streak.best()))
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
