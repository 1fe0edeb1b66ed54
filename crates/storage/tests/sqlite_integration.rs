use chrono::Duration;
use lms_core::exam::ExamGate;
use lms_core::model::{
    Assignment, AssignmentId, Chapter, ChapterId, ChapterProgress, Course, CourseId, Difficulty,
    ExamQuestion, Grade, QuestionId, Quiz, QuizId, SubmissionStatus, UserId, VerificationStatus,
};
use lms_core::time::fixed_now;
use storage::repository::{
    CourseRepository, ExamAttemptRepository, LearnerActivityRepository, NewExamAttempt,
    ProgressRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_course() -> Course {
    let question = |id: u64, difficulty: Difficulty| {
        ExamQuestion::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["a".into(), "b".into(), "c".into()],
            1,
        )
        .with_difficulty(difficulty)
        .with_topic("basics")
    };

    Course::new(CourseId::new(1), "Rust Basics")
        .with_final_exam(true)
        .with_chapter(
            Chapter::new(ChapterId::new(20), "Ownership", 2)
                .with_quiz(Quiz::new(QuizId::new(200), "Borrowing quiz", 1))
                .with_assignment(Assignment::new(AssignmentId::new(2000), "Write a parser"))
                .with_assignment(Assignment::new(AssignmentId::new(2001), "Draft").unpublished()),
        )
        .with_chapter(Chapter::new(ChapterId::new(10), "Intro", 1).free())
        .with_chapter({
            let mut hidden = Chapter::new(ChapterId::new(30), "Hidden", 3);
            hidden.is_published = false;
            hidden
        })
        .with_question(question(1, Difficulty::Easy).with_explanation("because"))
        .with_question(question(2, Difficulty::Hard))
}

#[tokio::test]
async fn sqlite_roundtrip_builds_per_learner_snapshot() {
    let repo = connect("memdb_snapshot").await;
    repo.upsert_course(&build_course()).await.expect("upsert");

    let learner = UserId::new(7);
    let other = UserId::new(8);
    let now = fixed_now();

    repo.upsert_progress(learner, ChapterId::new(10), ChapterProgress::completed(now))
        .await
        .expect("progress");
    repo.append_quiz_attempt(learner, QuizId::new(200), 80.0, now)
        .await
        .expect("quiz attempt");
    repo.append_submission(other, AssignmentId::new(2000), SubmissionStatus::Submitted, now)
        .await
        .expect("submission");

    let course = repo
        .get_course_with_chapters(CourseId::new(1), learner)
        .await
        .expect("load")
        .expect("course exists");

    assert!(course.final_exam_enabled);
    let ids: Vec<_> = course.chapters.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![ChapterId::new(10), ChapterId::new(20)]);

    let intro = &course.chapters[0];
    assert!(intro.is_free);
    assert!(intro.is_completed());

    let ownership = &course.chapters[1];
    assert!(ownership.progress.is_none());
    assert_eq!(ownership.quizzes[0].attempts.len(), 1);
    assert_eq!(ownership.assignments.len(), 2);
    assert!(!ownership.assignments[0].has_submission());
    assert!(!ownership.assignments[1].is_published);

    assert_eq!(course.exam_questions.len(), 2);
    assert_eq!(course.exam_questions[0].options.len(), 3);
    assert_eq!(course.exam_questions[0].explanation.as_deref(), Some("because"));
    assert_eq!(course.exam_questions[1].difficulty, Difficulty::Hard);
}

#[tokio::test]
async fn sqlite_reupsert_drops_removed_structure() {
    let repo = connect("memdb_reupsert").await;
    repo.upsert_course(&build_course()).await.expect("first upsert");

    let learner = UserId::new(7);
    repo.upsert_progress(learner, ChapterId::new(10), ChapterProgress::completed(fixed_now()))
        .await
        .expect("progress");

    let trimmed = Course::new(CourseId::new(1), "Rust Basics")
        .with_final_exam(true)
        .with_chapter(
            Chapter::new(ChapterId::new(20), "Ownership", 1)
                .with_assignment(Assignment::new(AssignmentId::new(2000), "Write a parser")),
        );
    repo.upsert_course(&trimmed).await.expect("second upsert");

    let course = repo
        .get_course_with_chapters(CourseId::new(1), learner)
        .await
        .expect("load")
        .expect("course exists");
    assert_eq!(course.chapters.len(), 1);
    let chapter = &course.chapters[0];
    assert_eq!(chapter.id, ChapterId::new(20));
    assert!(chapter.quizzes.is_empty());
    let assignments: Vec<_> = chapter.assignments.iter().map(|a| a.id).collect();
    assert_eq!(assignments, vec![AssignmentId::new(2000)]);
    assert!(course.exam_questions.is_empty());

    let err = repo
        .append_quiz_attempt(learner, QuizId::new(200), 50.0, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    let err = repo
        .upsert_progress(learner, ChapterId::new(10), ChapterProgress::started())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_missing_targets_are_reported() {
    let repo = connect("memdb_missing").await;

    let missing = repo
        .get_course_with_chapters(CourseId::new(99), UserId::new(1))
        .await
        .expect("query");
    assert!(missing.is_none());

    let err = repo
        .upsert_progress(UserId::new(1), ChapterId::new(404), ChapterProgress::started())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .append_quiz_attempt(UserId::new(1), QuizId::new(404), 50.0, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .set_verification_status(AssignmentId::new(404), VerificationStatus::Verified)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_progress_upsert_overwrites_and_verification_persists() {
    let repo = connect("memdb_progress").await;
    repo.upsert_course(&build_course()).await.expect("upsert");

    let user = UserId::new(3);
    let chapter = ChapterId::new(20);
    repo.upsert_progress(user, chapter, ChapterProgress::started())
        .await
        .unwrap();
    assert_eq!(
        repo.get_progress(user, chapter).await.unwrap(),
        Some(ChapterProgress::started())
    );

    let done = ChapterProgress::completed(fixed_now());
    repo.upsert_progress(user, chapter, done).await.unwrap();
    assert_eq!(repo.get_progress(user, chapter).await.unwrap(), Some(done));

    repo.set_verification_status(AssignmentId::new(2000), VerificationStatus::Verified)
        .await
        .unwrap();
    repo.append_submission(user, AssignmentId::new(2000), SubmissionStatus::Graded, fixed_now())
        .await
        .unwrap();

    let course = repo
        .get_course_with_chapters(CourseId::new(1), user)
        .await
        .unwrap()
        .unwrap();
    assert!(course.chapters[1].assignments[0].is_completed());

    // Re-upserting the structure keeps learner data attached to the same ids.
    repo.upsert_course(&build_course()).await.unwrap();
    let course = repo
        .get_course_with_chapters(CourseId::new(1), user)
        .await
        .unwrap()
        .unwrap();
    assert!(course.chapters[1].assignments[0].has_submission());
}

#[tokio::test]
async fn sqlite_exam_attempts_roundtrip_newest_first() {
    let repo = connect("memdb_attempts").await;
    let course = build_course();
    repo.upsert_course(&course).await.unwrap();

    let user = UserId::new(5);
    let first = ExamGate::score_attempt(&[1, 0], &[1, 1]).unwrap();
    let second = ExamGate::score_attempt(&[1, 1], &[1, 1]).unwrap();

    let first_id = repo
        .save_exam_attempt(NewExamAttempt {
            user_id: user,
            course_id: course.id,
            questions: course.exam_questions.clone(),
            answers: vec![1, 0],
            result: first,
            completed_at: fixed_now(),
        })
        .await
        .unwrap();
    let second_id = repo
        .save_exam_attempt(NewExamAttempt {
            user_id: user,
            course_id: course.id,
            questions: course.exam_questions.clone(),
            answers: vec![1, 1],
            result: second,
            completed_at: fixed_now() + Duration::hours(1),
        })
        .await
        .unwrap();
    assert_ne!(first_id, second_id);

    let attempts = repo.list_exam_attempts(user, course.id).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].id, second_id);
    assert_eq!(attempts[0].result.grade, Grade::APlus);
    assert_eq!(attempts[0].questions, course.exam_questions);
    assert_eq!(attempts[1].answers, vec![1, 0]);
    assert_eq!(attempts[1].result.score, 50);

    let none = repo
        .list_exam_attempts(UserId::new(6), course.id)
        .await
        .unwrap();
    assert!(none.is_empty());
}
