use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    AssignmentId, AttemptId, ChapterId, ChapterProgress, Course, CourseId, ExamAttempt,
    ExamQuestion, ExamResult, QuizAttempt, QuizId, Submission, SubmissionStatus, UserId,
    VerificationStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A finished final-exam attempt that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExamAttempt {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub questions: Vec<ExamQuestion>,
    pub answers: Vec<u32>,
    pub result: ExamResult,
    pub completed_at: DateTime<Utc>,
}

impl NewExamAttempt {
    #[must_use]
    pub fn with_id(self, id: AttemptId) -> ExamAttempt {
        ExamAttempt {
            id,
            user_id: self.user_id,
            course_id: self.course_id,
            questions: self.questions,
            answers: self.answers,
            result: self.result,
            completed_at: self.completed_at,
        }
    }
}

/// Read model of a course plus authoring writes.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist the structure of a course: chapters, quizzes, assignments and
    /// the exam question bank. Learner data inside the snapshot is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Load a course as seen by one learner.
    ///
    /// Chapters are restricted to published ones and ordered by position;
    /// quizzes are ordered by position. Attempts, submissions and progress
    /// belong to `user_id`. Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_course_with_chapters(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<Course>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the learner's progress row for a chapter, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<ChapterProgress>, StorageError>;

    /// Create or replace the learner's progress row for a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chapter does not exist.
    async fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        progress: ChapterProgress,
    ) -> Result<(), StorageError>;
}

/// Writes performed by quiz and assignment submission flows.
#[async_trait]
pub trait LearnerActivityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn append_quiz_attempt(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        score: f64,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the assignment does not exist.
    async fn append_submission(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
        status: SubmissionStatus,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the assignment does not exist.
    async fn set_verification_status(
        &self,
        assignment_id: AssignmentId,
        status: VerificationStatus,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ExamAttemptRepository: Send + Sync {
    /// Store a scored attempt and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn save_exam_attempt(&self, attempt: NewExamAttempt) -> Result<AttemptId, StorageError>;

    /// All attempts by a learner on a course, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_exam_attempts(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ExamAttempt>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    progress: Arc<Mutex<HashMap<(UserId, ChapterId), ChapterProgress>>>,
    quiz_attempts: Arc<Mutex<HashMap<(UserId, QuizId), Vec<QuizAttempt>>>>,
    submissions: Arc<Mutex<HashMap<(UserId, AssignmentId), Vec<Submission>>>>,
    exam_attempts: Arc<Mutex<Vec<ExamAttempt>>>,
    next_id: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// Drops learner data so only the authored structure is kept.
fn course_structure(course: &Course) -> Course {
    let mut stored = course.clone();
    for chapter in &mut stored.chapters {
        chapter.progress = None;
        for quiz in &mut chapter.quizzes {
            quiz.attempts.clear();
        }
        for assignment in &mut chapter.assignments {
            assignment.submissions.clear();
        }
    }
    stored
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn chapter_exists(&self, chapter_id: ChapterId) -> Result<bool, StorageError> {
        let courses = lock(&self.courses)?;
        Ok(courses
            .values()
            .flat_map(|c| &c.chapters)
            .any(|c| c.id == chapter_id))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = lock(&self.courses)?;
        guard.insert(course.id, course_structure(course));
        Ok(())
    }

    async fn get_course_with_chapters(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<Course>, StorageError> {
        let Some(mut course) = lock(&self.courses)?.get(&course_id).cloned() else {
            return Ok(None);
        };

        let progress = lock(&self.progress)?;
        let attempts = lock(&self.quiz_attempts)?;
        let submissions = lock(&self.submissions)?;

        course.chapters.retain(|c| c.is_published);
        course.chapters.sort_by_key(|c| (c.position, c.id));
        for chapter in &mut course.chapters {
            chapter.progress = progress.get(&(user_id, chapter.id)).copied();
            chapter.quizzes.sort_by_key(|q| (q.position, q.id));
            for quiz in &mut chapter.quizzes {
                quiz.attempts = attempts
                    .get(&(user_id, quiz.id))
                    .cloned()
                    .unwrap_or_default();
            }
            for assignment in &mut chapter.assignments {
                assignment.submissions = submissions
                    .get(&(user_id, assignment.id))
                    .cloned()
                    .unwrap_or_default();
            }
        }

        Ok(Some(course))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<ChapterProgress>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard.get(&(user_id, chapter_id)).copied())
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
        progress: ChapterProgress,
    ) -> Result<(), StorageError> {
        if !self.chapter_exists(chapter_id)? {
            return Err(StorageError::NotFound);
        }
        let mut guard = lock(&self.progress)?;
        guard.insert((user_id, chapter_id), progress);
        Ok(())
    }
}

#[async_trait]
impl LearnerActivityRepository for InMemoryRepository {
    async fn append_quiz_attempt(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        score: f64,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let known = lock(&self.courses)?
            .values()
            .flat_map(|c| &c.chapters)
            .flat_map(|c| &c.quizzes)
            .any(|q| q.id == quiz_id);
        if !known {
            return Err(StorageError::NotFound);
        }

        let id = self.next_id();
        let mut guard = lock(&self.quiz_attempts)?;
        guard.entry((user_id, quiz_id)).or_default().push(QuizAttempt {
            id,
            score,
            submitted_at,
        });
        Ok(id)
    }

    async fn append_submission(
        &self,
        user_id: UserId,
        assignment_id: AssignmentId,
        status: SubmissionStatus,
        submitted_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let known = lock(&self.courses)?
            .values()
            .flat_map(|c| &c.chapters)
            .flat_map(|c| &c.assignments)
            .any(|a| a.id == assignment_id);
        if !known {
            return Err(StorageError::NotFound);
        }

        let id = self.next_id();
        let mut guard = lock(&self.submissions)?;
        guard
            .entry((user_id, assignment_id))
            .or_default()
            .push(Submission {
                id,
                status,
                submitted_at,
            });
        Ok(id)
    }

    async fn set_verification_status(
        &self,
        assignment_id: AssignmentId,
        status: VerificationStatus,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.courses)?;
        let assignment = guard
            .values_mut()
            .flat_map(|c| &mut c.chapters)
            .flat_map(|c| &mut c.assignments)
            .find(|a| a.id == assignment_id)
            .ok_or(StorageError::NotFound)?;
        assignment.verification_status = status;
        Ok(())
    }
}

#[async_trait]
impl ExamAttemptRepository for InMemoryRepository {
    async fn save_exam_attempt(&self, attempt: NewExamAttempt) -> Result<AttemptId, StorageError> {
        let id = AttemptId::new(self.next_id());
        let mut guard = lock(&self.exam_attempts)?;
        guard.push(attempt.with_id(id));
        Ok(id)
    }

    async fn list_exam_attempts(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ExamAttempt>, StorageError> {
        let guard = lock(&self.exam_attempts)?;
        let mut out: Vec<ExamAttempt> = guard
            .iter()
            .filter(|a| a.user_id == user_id && a.course_id == course_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub activity: Arc<dyn LearnerActivityRepository>,
    pub exam_attempts: Arc<dyn ExamAttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            activity: Arc::new(repo.clone()),
            exam_attempts: Arc::new(repo),
        }
    }
}
