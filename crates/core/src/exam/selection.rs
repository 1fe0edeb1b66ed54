use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Difficulty, ExamQuestion};

/// Share of easy and medium questions in a balanced exam, in percent.
/// Hard questions take whatever is left.
const EASY_SHARE: usize = 30;
const MEDIUM_SHARE: usize = 50;

/// Returns the whole bank in random order.
pub fn shuffled_bank<R: Rng + ?Sized>(bank: &[ExamQuestion], rng: &mut R) -> Vec<ExamQuestion> {
    let mut questions = bank.to_vec();
    questions.shuffle(rng);
    questions
}

/// Picks `count` questions with a mix of difficulties.
///
/// Targets are 30% easy, 50% medium and the rest hard. When a difficulty runs
/// short the gap is filled from the questions left over. Asking for more
/// questions than the bank holds returns the whole bank shuffled.
///
/// Exam generation does not go through this path; it always uses the full
/// shuffled bank.
pub fn select_balanced_questions<R: Rng + ?Sized>(
    bank: &[ExamQuestion],
    count: usize,
    rng: &mut R,
) -> Vec<ExamQuestion> {
    if count >= bank.len() {
        return shuffled_bank(bank, rng);
    }

    let easy_target = (count * EASY_SHARE + 50) / 100;
    let medium_target = ((count * MEDIUM_SHARE + 50) / 100).min(count - easy_target);
    let hard_target = count - easy_target - medium_target;

    let mut pools = [
        (Difficulty::Easy, easy_target, Vec::new()),
        (Difficulty::Medium, medium_target, Vec::new()),
        (Difficulty::Hard, hard_target, Vec::new()),
    ];
    for question in bank {
        if let Some(pool) = pools.iter_mut().find(|(d, _, _)| *d == question.difficulty) {
            pool.2.push(question.clone());
        }
    }

    let mut selected = Vec::with_capacity(count);
    let mut leftovers = Vec::new();
    for (_, target, pool) in &mut pools {
        pool.shuffle(rng);
        let take = (*target).min(pool.len());
        leftovers.extend(pool.drain(take..));
        selected.append(pool);
    }

    leftovers.shuffle(rng);
    let missing = count - selected.len();
    selected.extend(leftovers.into_iter().take(missing));

    selected.shuffle(rng);
    selected
}
