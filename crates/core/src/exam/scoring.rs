use crate::model::{ExamAttempt, ExamQuestion, ExamResult, Grade};

use super::ExamError;

/// Minimum score for a passing attempt.
pub const PASS_THRESHOLD: u8 = 65;

/// Minimum score for certificate eligibility.
///
/// Equal to `PASS_THRESHOLD`, so no attempt can pass without also earning a
/// certificate and the `B` grade is never produced.
pub const CERTIFICATION_THRESHOLD: u8 = 65;

const A_PLUS_THRESHOLD: u8 = 90;
const C_THRESHOLD: u8 = 60;
const D_THRESHOLD: u8 = 50;

/// `round(100 * part / total)` with halves rounded up. `total` must be non-zero.
#[must_use]
pub fn rounded_percentage(part: u32, total: u32) -> u8 {
    debug_assert!(total > 0);
    let part = u64::from(part.min(total));
    let total = u64::from(total);
    let pct = (200 * part + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

/// Maps a percentage score to its letter grade.
#[must_use]
pub fn grade_for(score: u8) -> Grade {
    if score >= A_PLUS_THRESHOLD {
        Grade::APlus
    } else if score >= CERTIFICATION_THRESHOLD {
        Grade::A
    } else if score >= PASS_THRESHOLD {
        Grade::B
    } else if score >= C_THRESHOLD {
        Grade::C
    } else if score >= D_THRESHOLD {
        Grade::D
    } else {
        Grade::F
    }
}

/// Scores a submitted attempt against the answer key.
///
/// # Errors
///
/// Returns `ExamError::InvalidAnswerSet` when the lists are empty or differ in length.
pub fn score_attempt(user_answers: &[u32], correct_answers: &[u32]) -> Result<ExamResult, ExamError> {
    if correct_answers.is_empty() || user_answers.len() != correct_answers.len() {
        return Err(ExamError::InvalidAnswerSet {
            answers: user_answers.len(),
            questions: correct_answers.len(),
        });
    }

    let correct = user_answers
        .iter()
        .zip(correct_answers)
        .filter(|(given, expected)| given == expected)
        .count();

    let total = u32::try_from(correct_answers.len()).map_err(|_| ExamError::InvalidAnswerSet {
        answers: user_answers.len(),
        questions: correct_answers.len(),
    })?;
    // correct <= total, so this cannot fail once `total` fits.
    let correct = u32::try_from(correct).unwrap_or(total);

    let score = rounded_percentage(correct, total);
    Ok(ExamResult {
        score,
        correct,
        total,
        passed: score >= PASS_THRESHOLD,
        grade: grade_for(score),
        certificate_eligible: score >= CERTIFICATION_THRESHOLD,
    })
}

/// Answer key for a question set, in question order.
#[must_use]
pub fn correct_answers(questions: &[ExamQuestion]) -> Vec<u32> {
    questions.iter().map(|q| q.correct_option).collect()
}

/// Highest-scoring attempt; ties go to the earliest completed one.
#[must_use]
pub fn best_result(attempts: &[ExamAttempt]) -> Option<&ExamAttempt> {
    attempts.iter().reduce(|best, candidate| {
        let better = candidate.result.score > best.result.score
            || (candidate.result.score == best.result.score
                && candidate.completed_at < best.completed_at);
        if better { candidate } else { best }
    })
}
