use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;

use reframe_core::model::DeviceId;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{SettingsRepository, StorageError};

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_device_id(&self) -> Result<Option<DeviceId>, StorageError> {
        let row = sqlx::query("SELECT device_id FROM settings WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        row.try_get::<Option<String>, _>("device_id")
            .map_err(ser)?
            .map(|raw| DeviceId::from_str(&raw).map_err(ser))
            .transpose()
    }

    async fn set_device_id(&self, id: DeviceId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO settings (id, device_id)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET device_id = excluded.device_id
            ",
        )
        .bind(id.to_string())
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
