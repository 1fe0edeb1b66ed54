use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{AttemptId, CourseId, QuestionId, UserId};

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Reads an authored difficulty label. Unknown or empty labels count as medium.
    #[must_use]
    pub fn determine(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "easy" | "beginner" => Self::Easy,
            "hard" | "advanced" => Self::Hard,
            _ => Self::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// An instructor-authored multiple-choice question from a course's final-exam bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: u32,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub topic: String,
}

impl ExamQuestion {
    #[must_use]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: u32,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options,
            correct_option,
            explanation: None,
            difficulty: Difficulty::Medium,
            topic: String::new(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

//
// ─── GRADES ────────────────────────────────────────────────────────────────────
//

/// Letter grade of a final-exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    /// Parses a stored grade label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A+" => Some(Self::APlus),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Outcome of scoring one final-exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    /// Integer percentage in `0..=100`.
    pub score: u8,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    pub grade: Grade,
    pub certificate_eligible: bool,
}

/// A stored final-exam attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub questions: Vec<ExamQuestion>,
    pub answers: Vec<u32>,
    pub result: ExamResult,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_labels_default_to_medium() {
        assert_eq!(Difficulty::determine("EASY"), Difficulty::Easy);
        assert_eq!(Difficulty::determine(" hard "), Difficulty::Hard);
        assert_eq!(Difficulty::determine("advanced"), Difficulty::Hard);
        assert_eq!(Difficulty::determine(""), Difficulty::Medium);
        assert_eq!(Difficulty::determine("spicy"), Difficulty::Medium);
    }

    #[test]
    fn grade_labels_roundtrip() {
        for grade in [Grade::APlus, Grade::A, Grade::B, Grade::C, Grade::D, Grade::F] {
            assert_eq!(Grade::parse(grade.as_str()), Some(grade));
        }
        assert_eq!(Grade::parse("E"), None);
    }
}
