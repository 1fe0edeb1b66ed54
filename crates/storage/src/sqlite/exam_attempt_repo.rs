use lms_core::model::{AttemptId, CourseId, ExamAttempt, UserId};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, conn, id_i64, map_exam_attempt_row, ser};
use crate::repository::{ExamAttemptRepository, NewExamAttempt, StorageError};

#[async_trait::async_trait]
impl ExamAttemptRepository for SqliteRepository {
    async fn save_exam_attempt(&self, attempt: NewExamAttempt) -> Result<AttemptId, StorageError> {
        let questions = serde_json::to_string(&attempt.questions).map_err(ser)?;
        let answers = serde_json::to_string(&attempt.answers).map_err(ser)?;
        let result = attempt.result;

        let res = sqlx::query(
            r"
                INSERT INTO exam_attempts (
                    user_id, course_id, questions, answers, score, correct, total,
                    passed, grade, certificate_eligible, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id_i64("user_id", attempt.user_id.value())?)
        .bind(id_i64("course_id", attempt.course_id.value())?)
        .bind(questions)
        .bind(answers)
        .bind(i64::from(result.score))
        .bind(i64::from(result.correct))
        .bind(i64::from(result.total))
        .bind(i64::from(result.passed))
        .bind(result.grade.as_str())
        .bind(i64::from(result.certificate_eligible))
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn list_exam_attempts(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ExamAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, course_id, questions, answers, score, correct, total,
                    passed, grade, certificate_eligible, completed_at
                FROM exam_attempts
                WHERE user_id = ?1 AND course_id = ?2
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_exam_attempt_row(&row)?);
        }
        Ok(out)
    }
}
