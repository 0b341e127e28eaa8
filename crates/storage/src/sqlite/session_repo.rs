use async_trait::async_trait;
use sqlx::Row;
use std::collections::BTreeMap;

use super::SqliteRepository;
use super::mapping::{from_json, ser, to_json};
use crate::repository::{SessionSnapshot, SessionStore, StorageError};

#[async_trait]
impl SessionStore for SqliteRepository {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                problem_text,
                questions,
                answers,
                current_question,
                unlocked,
                analysis,
                saved_at
            FROM session_snapshot
            WHERE id = 1
            ",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let questions: Vec<String> =
            from_json(&row.try_get::<String, _>("questions").map_err(ser)?)?;
        let answers: BTreeMap<usize, String> =
            from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?;
        let analysis = row
            .try_get::<Option<String>, _>("analysis")
            .map_err(ser)?
            .map(|raw| from_json(&raw))
            .transpose()?;
        let current_question = usize::try_from(
            row.try_get::<i64, _>("current_question").map_err(ser)?,
        )
        .map_err(|_| StorageError::Serialization("current_question overflow".into()))?;

        Ok(Some(SessionSnapshot {
            problem_text: row.try_get("problem_text").map_err(ser)?,
            questions,
            answers,
            current_question,
            unlocked: row.try_get::<i64, _>("unlocked").map_err(ser)? != 0,
            analysis,
            saved_at: row.try_get("saved_at").map_err(ser)?,
        }))
    }

    async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let current_question = i64::try_from(snapshot.current_question)
            .map_err(|_| StorageError::Serialization("current_question overflow".into()))?;
        sqlx::query(
            r"
            INSERT INTO session_snapshot (
                id,
                problem_text,
                questions,
                answers,
                current_question,
                unlocked,
                analysis,
                saved_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                problem_text = excluded.problem_text,
                questions = excluded.questions,
                answers = excluded.answers,
                current_question = excluded.current_question,
                unlocked = excluded.unlocked,
                analysis = excluded.analysis,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(&snapshot.problem_text)
        .bind(to_json(&snapshot.questions)?)
        .bind(to_json(&snapshot.answers)?)
        .bind(current_question)
        .bind(i64::from(snapshot.unlocked))
        .bind(
            snapshot
                .analysis
                .as_ref()
                .map(to_json)
                .transpose()?,
        )
        .bind(snapshot.saved_at)
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_snapshot WHERE id = 1")
            .execute(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
