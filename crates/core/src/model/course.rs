use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::exam::ExamQuestion;
use crate::model::ids::{AssignmentId, ChapterId, CourseId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("invalid verification status: {0}")]
    InvalidVerificationStatus(String),

    #[error("invalid submission status: {0}")]
    InvalidSubmissionStatus(String),
}

//
// ─── STATUSES ──────────────────────────────────────────────────────────────────
//

/// Instructor review state of an assignment.
///
/// Only `Verified` assignments take part in completion metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    /// Parses the storage label of a verification status.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidVerificationStatus` for unknown labels.
    pub fn parse(value: &str) -> Result<Self, CourseError> {
        match value {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(CourseError::InvalidVerificationStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Graded,
}

impl SubmissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Graded => "graded",
        }
    }

    /// Parses the storage label of a submission status.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidSubmissionStatus` for unknown labels.
    pub fn parse(value: &str) -> Result<Self, CourseError> {
        match value {
            "submitted" => Ok(Self::Submitted),
            "graded" => Ok(Self::Graded),
            other => Err(CourseError::InvalidSubmissionStatus(other.to_owned())),
        }
    }
}

//
// ─── LEARNER RECORDS ───────────────────────────────────────────────────────────
//

/// A learner's completion record for one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterProgress {
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChapterProgress {
    #[must_use]
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            is_completed: true,
            completed_at: Some(at),
        }
    }

    #[must_use]
    pub fn started() -> Self {
        Self {
            is_completed: false,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub id: u64,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

//
// ─── COURSE TREE ───────────────────────────────────────────────────────────────
//

/// A chapter quiz together with the learner's attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub position: u32,
    pub attempts: Vec<QuizAttempt>,
}

impl Quiz {
    #[must_use]
    pub fn new(id: QuizId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            attempts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt: QuizAttempt) -> Self {
        self.attempts.push(attempt);
        self
    }

    /// A quiz counts as completed once it has been attempted, whatever the score.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !self.attempts.is_empty()
    }
}

/// A chapter assignment together with the learner's submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub title: String,
    pub is_published: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub verification_status: VerificationStatus,
    pub submissions: Vec<Submission>,
}

impl Assignment {
    #[must_use]
    pub fn new(id: AssignmentId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            is_published: true,
            due_date: None,
            verification_status: VerificationStatus::Pending,
            submissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.verification_status = status;
        self
    }

    #[must_use]
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    #[must_use]
    pub fn with_submission(mut self, submission: Submission) -> Self {
        self.submissions.push(submission);
        self
    }

    #[must_use]
    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    #[must_use]
    pub fn has_submission(&self) -> bool {
        self.submissions
            .iter()
            .any(|s| matches!(s.status, SubmissionStatus::Submitted | SubmissionStatus::Graded))
    }

    /// Completed means submitted (or graded) and verified by an instructor.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_verified() && self.has_submission()
    }

    /// True when the due date has passed and the assignment is still not completed.
    #[must_use]
    pub fn is_late(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => now > due && !self.is_completed(),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    pub position: u32,
    pub is_published: bool,
    pub is_free: bool,
    pub is_preview: bool,
    pub quizzes: Vec<Quiz>,
    pub assignments: Vec<Assignment>,
    pub progress: Option<ChapterProgress>,
}

impl Chapter {
    #[must_use]
    pub fn new(id: ChapterId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            is_published: true,
            is_free: false,
            is_preview: false,
            quizzes: Vec::new(),
            assignments: Vec::new(),
            progress: None,
        }
    }

    #[must_use]
    pub fn free(mut self) -> Self {
        self.is_free = true;
        self
    }

    #[must_use]
    pub fn preview(mut self) -> Self {
        self.is_preview = true;
        self
    }

    #[must_use]
    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quizzes.push(quiz);
        self
    }

    #[must_use]
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ChapterProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Free and preview chapters skip the purchase and unlock rules.
    #[must_use]
    pub fn is_open_access(&self) -> bool {
        self.is_free || self.is_preview
    }

    /// Missing progress means the learner has not completed the chapter.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.progress.is_some_and(|p| p.is_completed)
    }

    pub fn published_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.is_published)
    }

    #[must_use]
    pub fn all_quizzes_attempted(&self) -> bool {
        self.quizzes.iter().all(Quiz::is_completed)
    }
}

/// Point-in-time view of a course as seen by one learner.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub final_exam_enabled: bool,
    pub chapters: Vec<Chapter>,
    pub exam_questions: Vec<ExamQuestion>,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            final_exam_enabled: false,
            chapters: Vec::new(),
            exam_questions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_final_exam(mut self, enabled: bool) -> Self {
        self.final_exam_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    #[must_use]
    pub fn with_question(mut self, question: ExamQuestion) -> Self {
        self.exam_questions.push(question);
        self
    }

    /// Index of a chapter in the snapshot order.
    #[must_use]
    pub fn chapter_index(&self, id: ChapterId) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
