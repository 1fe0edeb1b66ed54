use lms_core::{ExamError, Viewer};
use lms_core::access::AccessReason;
use lms_core::exam::IneligibleReason;
use lms_core::model::{
    Assignment, AssignmentId, Chapter, ChapterId, Course, CourseId, ExamQuestion, QuestionId,
    Quiz, QuizId, SubmissionStatus, UserId, VerificationStatus,
};
use lms_core::time::fixed_now;
use services::{AppServices, Clock, ExamServiceError, SubmittedExam};
use storage::repository::Storage;

const COURSE: CourseId = CourseId::new(1);

fn build_course() -> Course {
    let bank = (1..=5).map(|id| {
        ExamQuestion::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["yes".into(), "no".into()],
            u32::try_from(id % 2).unwrap(),
        )
    });

    bank.fold(
        Course::new(COURSE, "Systems Programming")
            .with_final_exam(true)
            .with_chapter(
                Chapter::new(ChapterId::new(1), "Memory", 1)
                    .with_quiz(Quiz::new(QuizId::new(1), "Stack or heap", 1)),
            )
            .with_chapter(
                Chapter::new(ChapterId::new(2), "Concurrency", 2)
                    .with_quiz(Quiz::new(QuizId::new(2), "Send and Sync", 1))
                    .with_assignment(
                        Assignment::new(AssignmentId::new(1), "Thread pool")
                            .with_status(VerificationStatus::Verified),
                    )
                    .with_assignment(Assignment::new(AssignmentId::new(2), "Channel benchmark")),
            ),
        Course::with_question,
    )
}

#[tokio::test]
async fn learner_progresses_from_first_chapter_to_certificate() {
    let storage = Storage::in_memory();
    storage.courses.upsert_course(&build_course()).await.unwrap();

    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let access = services.course_access();
    let exams = services.exams();
    let learner = Viewer::learner(UserId::new(42), true);
    let user = learner.user_id;

    let chapters = access.chapter_access(&learner, COURSE).await.unwrap();
    assert_eq!(chapters[0].reason, AccessReason::FirstChapter);
    assert_eq!(chapters[1].reason, AccessReason::PreviousIncomplete);

    let verdict = exams.check_eligibility(user, COURSE).await.unwrap();
    assert_eq!(
        verdict.reason,
        Some(IneligibleReason::ChaptersIncomplete {
            completed: 0,
            total: 2
        })
    );

    access.complete_chapter(user, ChapterId::new(1)).await.unwrap();
    access.complete_chapter(user, ChapterId::new(2)).await.unwrap();
    let chapters = access.chapter_access(&learner, COURSE).await.unwrap();
    assert!(chapters.iter().all(|c| c.is_accessible && c.is_completed));

    let verdict = exams.check_eligibility(user, COURSE).await.unwrap();
    assert!(matches!(
        verdict.reason,
        Some(IneligibleReason::QuizzesIncomplete { completed: 0, total: 2 })
    ));

    for quiz in [QuizId::new(1), QuizId::new(2)] {
        storage
            .activity
            .append_quiz_attempt(user, quiz, 70.0, fixed_now())
            .await
            .unwrap();
    }

    // Work handed in on the unverified assignment does not count yet.
    storage
        .activity
        .append_submission(
            user,
            AssignmentId::new(2),
            SubmissionStatus::Submitted,
            fixed_now(),
        )
        .await
        .unwrap();
    let verdict = exams.check_eligibility(user, COURSE).await.unwrap();
    assert_eq!(
        verdict.reason,
        Some(IneligibleReason::AssignmentsPendingVerification { pending: 1 })
    );
    assert_eq!(verdict.progress.assignments.total, 1);

    storage
        .activity
        .append_submission(
            user,
            AssignmentId::new(1),
            SubmissionStatus::Graded,
            fixed_now(),
        )
        .await
        .unwrap();
    let verdict = exams.check_eligibility(user, COURSE).await.unwrap();
    assert!(verdict.eligible, "unexpected reason: {:?}", verdict.reason);
    assert_eq!(verdict.progress.assignments.percentage(), 100);

    let questions = exams.generate_exam(user, COURSE).await.unwrap();
    assert_eq!(questions.len(), 5);

    // Four of five right: 80%, grade A, certificate.
    let answers: Vec<u32> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| if i == 0 { 1 - q.correct_option } else { q.correct_option })
        .collect();
    let attempt = exams
        .submit_exam(user, COURSE, SubmittedExam::new(&questions, answers))
        .await
        .unwrap();
    assert_eq!(attempt.result.score, 80);
    assert!(attempt.result.passed);
    assert!(attempt.result.certificate_eligible);

    let best = exams.best_result(user, COURSE).await.unwrap().unwrap();
    assert_eq!(best.id, attempt.id);
    assert_eq!(exams.attempt_history(user, COURSE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn instructor_sees_everything_and_unpurchased_learner_sees_nothing() {
    let storage = Storage::in_memory();
    storage.courses.upsert_course(&build_course()).await.unwrap();
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let access = services.course_access();

    let instructor = Viewer::instructor(UserId::new(1));
    let contents = access.chapter_contents(&instructor, COURSE).await.unwrap();
    assert!(contents.iter().all(|c| c.access.reason == AccessReason::Instructor));
    assert!(contents[1].assignments.iter().all(|a| a.is_accessible));

    let visitor = Viewer::learner(UserId::new(2), false);
    let chapters = access.chapter_access(&visitor, COURSE).await.unwrap();
    assert!(chapters.iter().all(|c| c.reason == AccessReason::NotPurchased));
    assert!(
        access
            .next_chapter(&visitor, COURSE, ChapterId::new(1))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn disabled_exam_short_circuits_before_progress() {
    let storage = Storage::in_memory();
    storage
        .courses
        .upsert_course(&build_course().with_final_exam(false))
        .await
        .unwrap();
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));

    let verdict = services
        .exams()
        .check_eligibility(UserId::new(3), COURSE)
        .await
        .unwrap();
    assert_eq!(verdict.reason, Some(IneligibleReason::FinalExamDisabled));
    assert_eq!(verdict.progress.chapters.total, 2);

    let bank = build_course().exam_questions;
    let answers = bank.iter().map(|q| q.correct_option).collect();
    let err = services
        .exams()
        .submit_exam(UserId::new(3), COURSE, SubmittedExam::new(&bank, answers))
        .await
        .unwrap_err();
    assert!(matches!(err, ExamServiceError::Exam(ExamError::NotEnabled)));
    assert!(
        services
            .exams()
            .attempt_history(UserId::new(3), COURSE)
            .await
            .unwrap()
            .is_empty()
    );
}
