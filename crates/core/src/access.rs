//! Chapter, quiz and assignment unlocking for a single learner.
//!
//! Everything here works on an already loaded [`Course`] snapshot. Chapters
//! unlock strictly in order: a chapter opens once the previous one has been
//! completed, and only actual completion carries forward.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::exam::rounded_percentage;
use crate::model::{
    AssignmentId, Chapter, ChapterId, Course, QuizId, UserId, VerificationStatus,
};

//
// ─── VIEWER ────────────────────────────────────────────────────────────────────
//

/// Who is looking at the course, and what they are entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub is_purchased: bool,
    pub is_instructor: bool,
}

impl Viewer {
    #[must_use]
    pub fn learner(user_id: UserId, is_purchased: bool) -> Self {
        Self {
            user_id,
            is_purchased,
            is_instructor: false,
        }
    }

    #[must_use]
    pub fn instructor(user_id: UserId) -> Self {
        Self {
            user_id,
            is_purchased: true,
            is_instructor: true,
        }
    }
}

//
// ─── VERDICTS ──────────────────────────────────────────────────────────────────
//

/// Why a chapter is open or locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Instructor,
    FreePreview,
    FirstChapter,
    PreviousCompleted,
    NotPurchased,
    PreviousIncomplete,
}

impl AccessReason {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(
            self,
            Self::Instructor | Self::FreePreview | Self::FirstChapter | Self::PreviousCompleted
        )
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Instructor => "instructor access",
            Self::FreePreview => "free preview",
            Self::FirstChapter => "first chapter",
            Self::PreviousCompleted => "previous chapter completed",
            Self::NotPurchased => "course not purchased",
            Self::PreviousIncomplete => "previous chapter not completed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterAccess {
    pub chapter_id: ChapterId,
    pub title: String,
    pub position: u32,
    pub is_accessible: bool,
    pub is_completed: bool,
    pub reason: AccessReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAccess {
    pub quiz_id: QuizId,
    pub title: String,
    pub is_accessible: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AssignmentAccess {
    pub assignment_id: AssignmentId,
    pub title: String,
    pub is_accessible: bool,
    pub is_completed: bool,
    pub is_late: bool,
    pub has_submission: bool,
    pub verification_status: VerificationStatus,
}

impl AssignmentAccess {
    /// Submitted work an instructor has not verified yet.
    #[must_use]
    pub fn is_awaiting_verification(&self) -> bool {
        self.has_submission && self.verification_status != VerificationStatus::Verified
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterWithContent {
    pub access: ChapterAccess,
    pub quizzes: Vec<QuizAccess>,
    pub assignments: Vec<AssignmentAccess>,
    pub is_fully_completed: bool,
}

/// Chapter completion totals for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    pub completed_chapters: u32,
    pub total_chapters: u32,
    pub percentage: u8,
}

//
// ─── EVALUATOR ─────────────────────────────────────────────────────────────────
//

/// Computes per-item access for a learner from a course snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessEvaluator;

impl AccessEvaluator {
    /// Evaluates every chapter in snapshot order.
    ///
    /// `course.chapters` must already be restricted to published chapters and
    /// sorted by position.
    #[must_use]
    pub fn evaluate_chapters(viewer: &Viewer, course: &Course) -> Vec<ChapterAccess> {
        let mut previous_completed = true;
        let mut out = Vec::with_capacity(course.chapters.len());

        for (index, chapter) in course.chapters.iter().enumerate() {
            let reason = chapter_reason(viewer, chapter, index == 0, previous_completed);
            let is_completed = chapter.is_completed();
            // Only real completion unlocks the next chapter.
            previous_completed = is_completed;

            out.push(ChapterAccess {
                chapter_id: chapter.id,
                title: chapter.title.clone(),
                position: chapter.position,
                is_accessible: reason.is_granted(),
                is_completed,
                reason,
            });
        }

        out
    }

    /// Evaluates chapters together with their quizzes and published assignments.
    #[must_use]
    pub fn evaluate_chapter_contents(
        viewer: &Viewer,
        course: &Course,
        now: DateTime<Utc>,
    ) -> Vec<ChapterWithContent> {
        Self::evaluate_chapters(viewer, course)
            .into_iter()
            .zip(&course.chapters)
            .map(|(access, chapter)| chapter_contents(viewer, access, chapter, now))
            .collect()
    }

    #[must_use]
    pub fn next_accessible_chapter(
        chapters: &[ChapterAccess],
        current: ChapterId,
    ) -> Option<&ChapterAccess> {
        let index = chapters.iter().position(|c| c.chapter_id == current)?;
        chapters[index + 1..].iter().find(|c| c.is_accessible)
    }

    #[must_use]
    pub fn previous_accessible_chapter(
        chapters: &[ChapterAccess],
        current: ChapterId,
    ) -> Option<&ChapterAccess> {
        let index = chapters.iter().position(|c| c.chapter_id == current)?;
        chapters[..index].iter().rev().find(|c| c.is_accessible)
    }

    #[must_use]
    pub fn course_progress(course: &Course) -> CourseProgress {
        let total = u32::try_from(course.chapters.len()).unwrap_or(u32::MAX);
        let completed = u32::try_from(course.chapters.iter().filter(|c| c.is_completed()).count())
            .unwrap_or(u32::MAX);
        CourseProgress {
            completed_chapters: completed,
            total_chapters: total,
            percentage: if total == 0 {
                0
            } else {
                rounded_percentage(completed, total)
            },
        }
    }
}

fn chapter_reason(
    viewer: &Viewer,
    chapter: &Chapter,
    is_first: bool,
    previous_completed: bool,
) -> AccessReason {
    if viewer.is_instructor {
        AccessReason::Instructor
    } else if chapter.is_open_access() {
        AccessReason::FreePreview
    } else if !viewer.is_purchased {
        AccessReason::NotPurchased
    } else if is_first {
        AccessReason::FirstChapter
    } else if previous_completed {
        AccessReason::PreviousCompleted
    } else {
        AccessReason::PreviousIncomplete
    }
}

fn chapter_contents(
    viewer: &Viewer,
    access: ChapterAccess,
    chapter: &Chapter,
    now: DateTime<Utc>,
) -> ChapterWithContent {
    let open = access.is_accessible;

    // Quiz 0 waits for the chapter content, quiz k for an attempt on quiz k-1.
    let mut previous_done = chapter.is_completed();
    let quizzes = chapter
        .quizzes
        .iter()
        .map(|quiz| {
            let is_accessible = viewer.is_instructor || (open && previous_done);
            previous_done = quiz.is_completed();
            QuizAccess {
                quiz_id: quiz.id,
                title: quiz.title.clone(),
                is_accessible,
                is_completed: quiz.is_completed(),
            }
        })
        .collect();

    let quizzes_done = chapter.all_quizzes_attempted();
    let assignments: Vec<AssignmentAccess> = chapter
        .published_assignments()
        .map(|assignment| AssignmentAccess {
            assignment_id: assignment.id,
            title: assignment.title.clone(),
            is_accessible: viewer.is_instructor || (open && quizzes_done),
            is_completed: assignment.is_completed(),
            is_late: assignment.is_late(now),
            has_submission: assignment.has_submission(),
            verification_status: assignment.verification_status,
        })
        .collect();

    let verified_done = chapter
        .published_assignments()
        .filter(|a| a.is_verified())
        .all(|a| a.is_completed());

    ChapterWithContent {
        is_fully_completed: access.is_completed && quizzes_done && verified_done,
        access,
        quizzes,
        assignments,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
