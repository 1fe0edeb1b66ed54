use lms_core::model::{
    Assignment, AssignmentId, AttemptId, Chapter, ChapterId, ChapterProgress, CourseId,
    Difficulty, ExamAttempt, ExamQuestion, ExamResult, Grade, QuestionId, Quiz, QuizAttempt,
    QuizId, Submission, SubmissionStatus, UserId, VerificationStatus,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool, StorageError> {
    Ok(row.try_get::<i64, _>(column).map_err(ser)? != 0)
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

/// Chapter row without quizzes, assignments or progress.
pub(crate) fn map_chapter_row(row: &SqliteRow) -> Result<Chapter, StorageError> {
    let id = ChapterId::new(i64_to_u64("chapter_id", row.try_get("id").map_err(ser)?)?);
    let position = u32_from_i64("position", row.try_get("position").map_err(ser)?)?;
    let mut chapter = Chapter::new(id, row.try_get::<String, _>("title").map_err(ser)?, position);
    chapter.is_published = flag(row, "is_published")?;
    chapter.is_free = flag(row, "is_free")?;
    chapter.is_preview = flag(row, "is_preview")?;
    Ok(chapter)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    Ok(Quiz::new(
        QuizId::new(i64_to_u64("quiz_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
    ))
}

pub(crate) fn map_quiz_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    Ok(QuizAttempt {
        id: i64_to_u64("quiz_attempt_id", row.try_get("id").map_err(ser)?)?,
        score: row.try_get("score").map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

/// Assignment row without submissions.
pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<Assignment, StorageError> {
    let id = AssignmentId::new(i64_to_u64("assignment_id", row.try_get("id").map_err(ser)?)?);
    let status: String = row.try_get("verification_status").map_err(ser)?;

    let mut assignment = Assignment::new(id, row.try_get::<String, _>("title").map_err(ser)?)
        .with_status(VerificationStatus::parse(&status).map_err(ser)?);
    assignment.is_published = flag(row, "is_published")?;
    assignment.due_date = row.try_get("due_date").map_err(ser)?;
    Ok(assignment)
}

pub(crate) fn map_submission_row(row: &SqliteRow) -> Result<Submission, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(Submission {
        id: i64_to_u64("submission_id", row.try_get("id").map_err(ser)?)?,
        status: SubmissionStatus::parse(&status).map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ChapterProgress, StorageError> {
    Ok(ChapterProgress {
        is_completed: flag(row, "is_completed")?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<ExamQuestion, StorageError> {
    let options: String = row.try_get("options").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    Ok(ExamQuestion {
        id: QuestionId::new(i64_to_u64("question_id", row.try_get("id").map_err(ser)?)?),
        prompt: row.try_get("prompt").map_err(ser)?,
        options: serde_json::from_str(&options).map_err(ser)?,
        correct_option: u32_from_i64(
            "correct_option",
            row.try_get("correct_option").map_err(ser)?,
        )?,
        explanation: row.try_get("explanation").map_err(ser)?,
        difficulty: Difficulty::determine(&difficulty),
        topic: row.try_get("topic").map_err(ser)?,
    })
}

pub(crate) fn map_exam_attempt_row(row: &SqliteRow) -> Result<ExamAttempt, StorageError> {
    let questions: String = row.try_get("questions").map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    let grade: String = row.try_get("grade").map_err(ser)?;
    let score: i64 = row.try_get("score").map_err(ser)?;

    let result = ExamResult {
        score: u8::try_from(score)
            .map_err(|_| StorageError::Serialization(format!("invalid score: {score}")))?,
        correct: u32_from_i64("correct", row.try_get("correct").map_err(ser)?)?,
        total: u32_from_i64("total", row.try_get("total").map_err(ser)?)?,
        passed: flag(row, "passed")?,
        grade: Grade::parse(&grade)
            .ok_or_else(|| StorageError::Serialization(format!("invalid grade: {grade}")))?,
        certificate_eligible: flag(row, "certificate_eligible")?,
    };

    Ok(ExamAttempt {
        id: attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        questions: serde_json::from_str(&questions).map_err(ser)?,
        answers: serde_json::from_str(&answers).map_err(ser)?,
        result,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
