//! Final-exam gate: eligibility, question sets, scoring.

mod eligibility;
mod scoring;
mod selection;

use std::collections::HashSet;

use rand::Rng;
use thiserror::Error;

use crate::model::{Course, ExamAttempt, ExamQuestion, ExamResult, QuestionId};

pub use eligibility::{
    ExamEligibility, ExamProgress, IneligibleReason, RequirementCount, exam_progress,
};
pub use scoring::{
    CERTIFICATION_THRESHOLD, PASS_THRESHOLD, correct_answers, grade_for, rounded_percentage,
};
pub use selection::select_balanced_questions;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("course not found")]
    CourseNotFound,

    #[error("final exam is not enabled for this course")]
    NotEnabled,

    #[error("final exam has no questions")]
    NoQuestions,

    #[error("answer set does not match question set ({answers} answers for {questions} questions)")]
    InvalidAnswerSet { answers: usize, questions: usize },

    #[error("question {0} is not part of this course's exam")]
    UnknownQuestion(QuestionId),

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

/// The course's question bank, provided the exam can be taken at all.
fn open_bank(course: Option<&Course>) -> Result<&[ExamQuestion], ExamError> {
    let course = course.ok_or(ExamError::CourseNotFound)?;
    if !course.final_exam_enabled {
        return Err(ExamError::NotEnabled);
    }
    if course.exam_questions.is_empty() {
        return Err(ExamError::NoQuestions);
    }
    Ok(&course.exam_questions)
}

/// Stateless entry points for the final exam.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExamGate;

impl ExamGate {
    /// Decides whether the learner may sit the final exam. Business-rule
    /// failures come back as a reason, never as an error.
    #[must_use]
    pub fn check_eligibility(course: Option<&Course>) -> ExamEligibility {
        eligibility::check_eligibility(course)
    }

    /// Builds the question set for a new attempt: the full authored bank in random order.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::CourseNotFound`, `ExamError::NotEnabled` or
    /// `ExamError::NoQuestions`, checked in that order.
    pub fn generate_exam<R: Rng + ?Sized>(
        course: Option<&Course>,
        rng: &mut R,
    ) -> Result<Vec<ExamQuestion>, ExamError> {
        let bank = open_bank(course)?;
        Ok(selection::shuffled_bank(bank, rng))
    }

    /// Looks up the questions a learner answered, in the order shown, from the
    /// course's own bank. Answer keys always come from the bank.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`ExamGate::generate_exam`], then
    /// `ExamError::UnknownQuestion` or `ExamError::DuplicateQuestion` for ids
    /// that do not map one-to-one onto the bank.
    pub fn resolve_questions(
        course: Option<&Course>,
        question_ids: &[QuestionId],
    ) -> Result<Vec<ExamQuestion>, ExamError> {
        let bank = open_bank(course)?;
        let mut seen = HashSet::with_capacity(question_ids.len());
        question_ids
            .iter()
            .map(|&id| {
                if !seen.insert(id) {
                    return Err(ExamError::DuplicateQuestion(id));
                }
                bank.iter()
                    .find(|q| q.id == id)
                    .cloned()
                    .ok_or(ExamError::UnknownQuestion(id))
            })
            .collect()
    }

    /// Scores raw answer indices against the answer key.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidAnswerSet` when lengths differ or are zero.
    pub fn score_attempt(
        user_answers: &[u32],
        correct_answers: &[u32],
    ) -> Result<ExamResult, ExamError> {
        scoring::score_attempt(user_answers, correct_answers)
    }

    #[must_use]
    pub fn best_result(attempts: &[ExamAttempt]) -> Option<&ExamAttempt> {
        scoring::best_result(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, Difficulty, QuestionId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn course_with_bank(n: u64) -> Course {
        (1..=n).fold(
            Course::new(CourseId::new(1), "Rust").with_final_exam(true),
            |course, id| {
                course.with_question(
                    ExamQuestion::new(
                        QuestionId::new(id),
                        format!("Q{id}"),
                        vec!["yes".into(), "no".into()],
                        0,
                    )
                    .with_difficulty(Difficulty::Easy)
                    .with_topic("ownership"),
                )
            },
        )
    }

    #[test]
    fn generation_fails_in_documented_order() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            ExamGate::generate_exam(None, &mut rng).unwrap_err(),
            ExamError::CourseNotFound
        );

        let disabled = Course::new(CourseId::new(1), "Rust");
        assert_eq!(
            ExamGate::generate_exam(Some(&disabled), &mut rng).unwrap_err(),
            ExamError::NotEnabled
        );

        let empty = disabled.with_final_exam(true);
        assert_eq!(
            ExamGate::generate_exam(Some(&empty), &mut rng).unwrap_err(),
            ExamError::NoQuestions
        );
    }

    #[test]
    fn resolved_questions_come_from_the_bank_in_submitted_order() {
        let course = course_with_bank(3);
        let ids = [QuestionId::new(3), QuestionId::new(1)];
        let resolved = ExamGate::resolve_questions(Some(&course), &ids).unwrap();
        assert_eq!(resolved, vec![course.exam_questions[2].clone(), course.exam_questions[0].clone()]);
    }

    #[test]
    fn resolving_rejects_foreign_and_repeated_ids() {
        let course = course_with_bank(2);
        assert_eq!(
            ExamGate::resolve_questions(Some(&course), &[QuestionId::new(999)]).unwrap_err(),
            ExamError::UnknownQuestion(QuestionId::new(999))
        );
        assert_eq!(
            ExamGate::resolve_questions(Some(&course), &[QuestionId::new(1), QuestionId::new(1)])
                .unwrap_err(),
            ExamError::DuplicateQuestion(QuestionId::new(1))
        );

        let disabled = course.with_final_exam(false);
        assert_eq!(
            ExamGate::resolve_questions(Some(&disabled), &[QuestionId::new(1)]).unwrap_err(),
            ExamError::NotEnabled
        );
    }

    #[test]
    fn generation_returns_every_question() {
        let course = course_with_bank(12);
        let mut rng = StdRng::seed_from_u64(42);
        let mut exam = ExamGate::generate_exam(Some(&course), &mut rng).unwrap();
        assert_eq!(exam.len(), 12);

        exam.sort_by_key(|q| q.id);
        assert_eq!(exam, course.exam_questions);
    }

    #[test]
    fn generated_exam_scores_against_its_own_key() {
        let course = course_with_bank(4);
        let mut rng = StdRng::seed_from_u64(9);
        let exam = ExamGate::generate_exam(Some(&course), &mut rng).unwrap();
        let key = correct_answers(&exam);
        let result = ExamGate::score_attempt(&key, &key).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.grade, crate::model::Grade::APlus);
    }
}
