use std::sync::{Arc, Mutex, PoisonError};

use lms_core::ExamGate;
use lms_core::exam::{ExamEligibility, correct_answers};
use lms_core::model::{CourseId, ExamAttempt, ExamQuestion, QuestionId, UserId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use storage::repository::{CourseRepository, ExamAttemptRepository, NewExamAttempt};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::ExamServiceError;

/// A completed exam as handed back by the learner: the ids of the questions
/// in the order they were shown and one chosen option index per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedExam {
    pub question_ids: Vec<QuestionId>,
    pub answers: Vec<u32>,
}

impl SubmittedExam {
    #[must_use]
    pub fn new(questions: &[ExamQuestion], answers: Vec<u32>) -> Self {
        Self {
            question_ids: questions.iter().map(|q| q.id).collect(),
            answers,
        }
    }
}

/// Final-exam workflow: eligibility, question sets, scoring and attempt history.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    attempts: Arc<dyn ExamAttemptRepository>,
    rng: Arc<Mutex<StdRng>>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        attempts: Arc<dyn ExamAttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            attempts,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Replace the shuffling source with a seeded one for reproducible exams.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    /// Business failures are reported in the returned verdict, not as errors.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn check_eligibility(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ExamEligibility, ExamServiceError> {
        let course = self
            .courses
            .get_course_with_chapters(course_id, user_id)
            .await?;
        let verdict = ExamGate::check_eligibility(course.as_ref());
        debug!(
            course = %course_id,
            user = %user_id,
            eligible = verdict.eligible,
            reason = ?verdict.reason,
            "checked exam eligibility"
        );
        Ok(verdict)
    }

    /// Shuffled question set for a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Exam` if the course is missing, has the final
    /// exam disabled, or has no questions.
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn generate_exam(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ExamQuestion>, ExamServiceError> {
        let course = self
            .courses
            .get_course_with_chapters(course_id, user_id)
            .await?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let questions = ExamGate::generate_exam(course.as_ref(), &mut *rng)?;
        debug!(course = %course_id, user = %user_id, questions = questions.len(), "generated exam");
        Ok(questions)
    }

    /// Score a submission against the course's own answer key and persist the
    /// attempt with the stored question records.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Exam` when the exam cannot be taken (same
    /// gate as [`ExamService::generate_exam`]), when a question id is unknown
    /// or repeated, or when the answer count does not match the question count.
    /// Returns `ExamServiceError::Storage` if persistence fails.
    pub async fn submit_exam(
        &self,
        user_id: UserId,
        course_id: CourseId,
        submission: SubmittedExam,
    ) -> Result<ExamAttempt, ExamServiceError> {
        let course = self
            .courses
            .get_course_with_chapters(course_id, user_id)
            .await?;
        let reject = |err: &lms_core::ExamError| {
            warn!(course = %course_id, user = %user_id, %err, "rejected exam submission");
        };

        let questions = ExamGate::resolve_questions(course.as_ref(), &submission.question_ids)
            .inspect_err(reject)?;
        let key = correct_answers(&questions);
        let result = ExamGate::score_attempt(&submission.answers, &key).inspect_err(reject)?;

        let record = NewExamAttempt {
            user_id,
            course_id,
            questions,
            answers: submission.answers,
            result,
            completed_at: self.clock.now(),
        };
        let id = self.attempts.save_exam_attempt(record.clone()).await?;
        info!(
            course = %course_id,
            user = %user_id,
            attempt = %id,
            score = result.score,
            grade = %result.grade,
            passed = result.passed,
            "recorded exam attempt"
        );
        Ok(record.with_id(id))
    }

    /// Highest-scoring attempt, earliest first among ties.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn best_result(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<ExamAttempt>, ExamServiceError> {
        let attempts = self.attempts.list_exam_attempts(user_id, course_id).await?;
        Ok(ExamGate::best_result(&attempts).cloned())
    }

    /// Attempts newest first.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn attempt_history(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ExamAttempt>, ExamServiceError> {
        Ok(self.attempts.list_exam_attempts(user_id, course_id).await?)
    }
}
