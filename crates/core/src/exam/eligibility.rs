use std::fmt;

use crate::model::{Assignment, Course, VerificationStatus};

/// Completed versus required count for one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequirementCount {
    pub completed: u32,
    pub total: u32,
}

impl RequirementCount {
    /// Nothing required counts as fully met.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            100
        } else {
            super::rounded_percentage(self.completed, self.total)
        }
    }

    #[must_use]
    pub fn is_met(&self) -> bool {
        self.completed >= self.total
    }

    fn tally(items: impl Iterator<Item = bool>) -> Self {
        items.fold(Self::default(), |acc, done| Self {
            completed: acc.completed + u32::from(done),
            total: acc.total + 1,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExamProgress {
    pub chapters: RequirementCount,
    pub quizzes: RequirementCount,
    pub assignments: RequirementCount,
}

/// First unmet condition for sitting the final exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    CourseNotFound,
    FinalExamDisabled,
    ChaptersIncomplete { completed: u32, total: u32 },
    QuizzesIncomplete { completed: u32, total: u32 },
    AssignmentsPendingVerification { pending: u32 },
    AssignmentsIncomplete { completed: u32, total: u32 },
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CourseNotFound => f.write_str("course not found"),
            Self::FinalExamDisabled => f.write_str("final exam not enabled for this course"),
            Self::ChaptersIncomplete { completed, total } => write!(
                f,
                "complete all chapters first ({completed}/{total} completed)"
            ),
            Self::QuizzesIncomplete { completed, total } => write!(
                f,
                "complete all quizzes first ({completed}/{total} completed)"
            ),
            Self::AssignmentsPendingVerification { pending } => write!(
                f,
                "{pending} submitted assignment(s) pending instructor verification"
            ),
            Self::AssignmentsIncomplete { completed, total } => write!(
                f,
                "submit all assignments first ({completed}/{total} completed)"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamEligibility {
    pub eligible: bool,
    pub reason: Option<IneligibleReason>,
    pub progress: ExamProgress,
}

impl ExamEligibility {
    fn denied(reason: IneligibleReason, progress: ExamProgress) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
            progress,
        }
    }
}

/// Counts chapters, quizzes and verified assignments across a course.
#[must_use]
pub fn exam_progress(course: &Course) -> ExamProgress {
    let chapters = &course.chapters;
    ExamProgress {
        chapters: RequirementCount::tally(chapters.iter().map(|c| c.is_completed())),
        quizzes: RequirementCount::tally(
            chapters
                .iter()
                .flat_map(|c| &c.quizzes)
                .map(|q| q.is_completed()),
        ),
        assignments: RequirementCount::tally(
            verified_assignments(course).map(Assignment::is_completed),
        ),
    }
}

/// Decides whether the learner may take the final exam.
///
/// Never fails: every blocking condition is reported through `reason`.
#[must_use]
pub fn check_eligibility(course: Option<&Course>) -> ExamEligibility {
    let Some(course) = course else {
        return ExamEligibility::denied(IneligibleReason::CourseNotFound, ExamProgress::default());
    };
    let progress = exam_progress(course);

    if !course.final_exam_enabled {
        return ExamEligibility::denied(IneligibleReason::FinalExamDisabled, progress);
    }

    let ExamProgress {
        chapters,
        quizzes,
        assignments,
    } = progress;

    let reason = if !chapters.is_met() {
        Some(IneligibleReason::ChaptersIncomplete {
            completed: chapters.completed,
            total: chapters.total,
        })
    } else if !quizzes.is_met() {
        Some(IneligibleReason::QuizzesIncomplete {
            completed: quizzes.completed,
            total: quizzes.total,
        })
    } else if !assignments.is_met() {
        let pending = pending_verification(course);
        Some(if pending > 0 {
            IneligibleReason::AssignmentsPendingVerification { pending }
        } else {
            IneligibleReason::AssignmentsIncomplete {
                completed: assignments.completed,
                total: assignments.total,
            }
        })
    } else {
        None
    };

    ExamEligibility {
        eligible: reason.is_none(),
        reason,
        progress,
    }
}

fn published_assignments(course: &Course) -> impl Iterator<Item = &Assignment> {
    course.chapters.iter().flat_map(|c| c.published_assignments())
}

fn verified_assignments(course: &Course) -> impl Iterator<Item = &Assignment> {
    published_assignments(course).filter(|a| a.is_verified())
}

/// Published assignments the learner submitted that still await a verdict.
/// Rejected work is not pending.
fn pending_verification(course: &Course) -> u32 {
    let count = published_assignments(course)
        .filter(|a| a.verification_status == VerificationStatus::Pending && a.has_submission())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AssignmentId, Chapter, ChapterId, ChapterProgress, CourseId, Quiz, QuizAttempt, QuizId,
        Submission, SubmissionStatus,
    };
    use crate::time::fixed_now;

    fn done_chapter(id: u64) -> Chapter {
        Chapter::new(ChapterId::new(id), format!("Ch {id}"), u32::try_from(id).unwrap())
            .with_progress(ChapterProgress::completed(fixed_now()))
    }

    fn attempted_quiz(id: u64) -> Quiz {
        Quiz::new(QuizId::new(id), "Quiz", 0).with_attempt(QuizAttempt {
            id,
            score: 10.0,
            submitted_at: fixed_now(),
        })
    }

    fn graded() -> Submission {
        Submission {
            id: 1,
            status: SubmissionStatus::Graded,
            submitted_at: fixed_now(),
        }
    }

    fn finished_course() -> Course {
        Course::new(CourseId::new(1), "Rust")
            .with_final_exam(true)
            .with_chapter(done_chapter(1).with_quiz(attempted_quiz(1)))
            .with_chapter(
                done_chapter(2).with_assignment(
                    Assignment::new(AssignmentId::new(1), "Essay")
                        .with_status(VerificationStatus::Verified)
                        .with_submission(graded()),
                ),
            )
    }

    #[test]
    fn missing_course_is_reported() {
        let verdict = check_eligibility(None);
        assert!(!verdict.eligible);
        assert_eq!(verdict.reason, Some(IneligibleReason::CourseNotFound));
        assert_eq!(verdict.reason.unwrap().to_string(), "course not found");
    }

    #[test]
    fn disabled_exam_short_circuits_complete_progress() {
        let course = finished_course().with_final_exam(false);
        let verdict = check_eligibility(Some(&course));
        assert!(!verdict.eligible);
        assert_eq!(verdict.reason, Some(IneligibleReason::FinalExamDisabled));
        assert_eq!(verdict.progress.chapters.percentage(), 100);
    }

    #[test]
    fn complete_course_is_eligible() {
        let course = finished_course();
        let verdict = check_eligibility(Some(&course));
        assert!(verdict.eligible);
        assert!(verdict.reason.is_none());
        assert_eq!(verdict.progress.assignments, RequirementCount { completed: 1, total: 1 });
    }

    #[test]
    fn chapters_are_checked_before_quizzes() {
        let mut course = finished_course();
        course.chapters[1].progress = None;
        course.chapters[0].quizzes[0].attempts.clear();

        let verdict = check_eligibility(Some(&course));
        assert_eq!(
            verdict.reason,
            Some(IneligibleReason::ChaptersIncomplete {
                completed: 1,
                total: 2
            })
        );
        assert_eq!(verdict.progress.chapters.percentage(), 50);
    }

    #[test]
    fn unattempted_quiz_blocks() {
        let mut course = finished_course();
        course.chapters[0].quizzes.push(Quiz::new(QuizId::new(2), "Quiz 2", 1));

        let verdict = check_eligibility(Some(&course));
        assert_eq!(
            verdict.reason,
            Some(IneligibleReason::QuizzesIncomplete {
                completed: 1,
                total: 2
            })
        );
    }

    #[test]
    fn pending_submission_is_reported_as_awaiting_verification() {
        let mut course = finished_course();
        course.chapters[0].assignments.push(
            Assignment::new(AssignmentId::new(2), "Graded but pending").with_submission(graded()),
        );
        course.chapters[1].assignments.push(
            Assignment::new(AssignmentId::new(3), "Verified, not submitted")
                .with_status(VerificationStatus::Verified),
        );

        let verdict = check_eligibility(Some(&course));
        assert!(!verdict.eligible);
        assert_eq!(
            verdict.reason,
            Some(IneligibleReason::AssignmentsPendingVerification { pending: 1 })
        );
        // The pending assignment is not part of the verified count.
        assert_eq!(verdict.progress.assignments, RequirementCount { completed: 1, total: 2 });
    }

    #[test]
    fn rejected_submission_is_not_reported_as_pending() {
        let mut course = finished_course();
        course.chapters[0].assignments.push(
            Assignment::new(AssignmentId::new(2), "Rejected essay")
                .with_status(VerificationStatus::Rejected)
                .with_submission(graded()),
        );
        course.chapters[1].assignments.push(
            Assignment::new(AssignmentId::new(3), "Verified, not submitted")
                .with_status(VerificationStatus::Verified),
        );

        let verdict = check_eligibility(Some(&course));
        assert_eq!(
            verdict.reason,
            Some(IneligibleReason::AssignmentsIncomplete {
                completed: 1,
                total: 2
            })
        );
    }

    #[test]
    fn missing_submission_asks_learner_to_submit() {
        let mut course = finished_course();
        course.chapters[1].assignments.push(
            Assignment::new(AssignmentId::new(3), "Verified, not submitted")
                .with_status(VerificationStatus::Verified),
        );

        let verdict = check_eligibility(Some(&course));
        assert_eq!(
            verdict.reason,
            Some(IneligibleReason::AssignmentsIncomplete {
                completed: 1,
                total: 2
            })
        );
        assert!(verdict.reason.unwrap().to_string().starts_with("submit all assignments"));
    }

    #[test]
    fn only_unverified_assignments_do_not_block() {
        let course = Course::new(CourseId::new(1), "Rust")
            .with_final_exam(true)
            .with_chapter(done_chapter(1).with_assignment(
                Assignment::new(AssignmentId::new(1), "Pending").with_submission(graded()),
            ))
            .with_chapter(done_chapter(2).with_assignment(
                Assignment::new(AssignmentId::new(2), "Rejected")
                    .with_status(VerificationStatus::Rejected),
            ));

        let verdict = check_eligibility(Some(&course));
        assert!(verdict.eligible);
        assert_eq!(verdict.progress.assignments.total, 0);
        assert_eq!(verdict.progress.assignments.percentage(), 100);
    }

    #[test]
    fn unpublished_assignments_are_ignored() {
        let mut course = finished_course();
        course.chapters[1].assignments.push(
            Assignment::new(AssignmentId::new(9), "Draft")
                .with_status(VerificationStatus::Verified)
                .unpublished(),
        );
        assert!(check_eligibility(Some(&course)).eligible);
    }
}
