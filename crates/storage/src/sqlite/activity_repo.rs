use chrono::{DateTime, Utc};
use lms_core::model::{AssignmentId, QuizId, SubmissionStatus, UserId, VerificationStatus};

use super::SqliteRepository;
use super::mapping::{conn, id_i64};
use crate::repository::{LearnerActivityRepository, StorageError};

fn row_id(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization("row id sign overflow".into()))
}

impl SqliteRepository {
    async fn row_exists(&self, sql: &str, id: i64) -> Result<bool, StorageError> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl LearnerActivityRepository for SqliteRepository {
    async fn append_quiz_attempt(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        score: f64,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let quiz = id_i64("quiz_id", quiz_id.value())?;
        if !self.row_exists("SELECT 1 FROM quizzes WHERE id = ?1", quiz).await? {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO quiz_attempts (quiz_id, user_id, score, submitted_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(quiz)
        .bind(id_i64("user_id", user_id.value())?)
        .bind(score)
        .bind(submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        row_id(res.last_insert_rowid())
    }

    async fn append_submission(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
        status: SubmissionStatus,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let assignment = id_i64("assignment_id", assignment_id.value())?;
        if !self
            .row_exists("SELECT 1 FROM assignments WHERE id = ?1", assignment)
            .await?
        {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO assignment_submissions (assignment_id, user_id, status, submitted_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(assignment)
        .bind(id_i64("user_id", user_id.value())?)
        .bind(status.as_str())
        .bind(submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        row_id(res.last_insert_rowid())
    }

    async fn set_verification_status(
        &self,
        assignment_id: AssignmentId,
        status: VerificationStatus,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE assignments SET verification_status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id_i64("assignment_id", assignment_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
