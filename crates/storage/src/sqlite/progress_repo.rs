use lms_core::model::{ChapterId, ChapterProgress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<ChapterProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT is_completed, completed_at
            FROM chapter_progress
            WHERE user_id = ?1 AND chapter_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("chapter_id", chapter_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|row| map_progress_row(&row)).transpose()
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        progress: ChapterProgress,
    ) -> Result<(), StorageError> {
        let chapter = id_i64("chapter_id", chapter_id.value())?;
        let exists = sqlx::query("SELECT 1 FROM chapters WHERE id = ?1")
            .bind(chapter)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO chapter_progress (user_id, chapter_id, is_completed, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, chapter_id) DO UPDATE SET
                is_completed = excluded.is_completed,
                completed_at = excluded.completed_at
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(chapter)
        .bind(i64::from(progress.is_completed))
        .bind(progress.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
