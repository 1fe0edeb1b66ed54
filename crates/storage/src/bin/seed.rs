use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::{
    Assignment, AssignmentId, Chapter, ChapterId, ChapterProgress, Course, CourseId, Difficulty,
    ExamQuestion, QuestionId, Quiz, QuizId, SubmissionStatus, UserId, VerificationStatus,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    course_title: String,
    chapters: u32,
    learner: Option<UserId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidChapters { raw: String },
    InvalidLearner { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidChapters { raw } => {
                write!(f, "invalid --chapters value (expected 1 or more): {raw}")
            }
            ArgsError::InvalidLearner { raw } => write!(f, "invalid --learner value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:lms.sqlite3".into());
        let mut course_id = std::env::var("LMS_COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut course_title =
            std::env::var("LMS_COURSE_TITLE").unwrap_or_else(|_| "Rust Foundations".into());
        let mut chapters = std::env::var("LMS_CHAPTERS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);
        let mut learner = None;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    course_id = CourseId::new(parsed);
                }
                "--title" => {
                    course_title = require_value(&mut args, "--title")?;
                }
                "--chapters" => {
                    let value = require_value(&mut args, "--chapters")?;
                    chapters = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ArgsError::InvalidChapters { raw: value.clone() })?;
                }
                "--learner" => {
                    let value = require_value(&mut args, "--learner")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidLearner { raw: value.clone() })?;
                    learner = Some(parsed);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            course_title,
            chapters,
            learner,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:lms.sqlite3)");
    eprintln!("  --course-id <id>          Course id to upsert (default: 1)");
    eprintln!("  --title <text>            Course title (default: Rust Foundations)");
    eprintln!("  --chapters <n>            Number of chapters to create (default: 4)");
    eprintln!("  --learner <id>            Also record progress for this learner");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_COURSE_ID, LMS_COURSE_TITLE, LMS_CHAPTERS");
}

const TOPICS: [(&str, &str); 5] = [
    ("Ownership", "beginner"),
    ("Borrowing", "easy"),
    ("Traits", "medium"),
    ("Lifetimes", "advanced"),
    ("Async", "hard"),
];

/// Ids are derived from the course id so several seeded courses do not collide.
fn demo_course(args: &Args, now: DateTime<Utc>) -> Course {
    let base = args.course_id.value() * 1_000;
    let mut course = Course::new(args.course_id, args.course_title.clone()).with_final_exam(true);

    for n in 1..=args.chapters {
        let key = base + u64::from(n);
        let (topic, _) = TOPICS[(n as usize - 1) % TOPICS.len()];
        let mut chapter = Chapter::new(ChapterId::new(key), format!("{n}. {topic}"), n)
            .with_quiz(Quiz::new(QuizId::new(key), format!("{topic} check"), 1));
        if n == 1 {
            chapter = chapter.free();
        }
        if n % 2 == 0 {
            chapter = chapter.with_assignment(
                Assignment::new(AssignmentId::new(key), format!("{topic} exercise"))
                    .with_status(VerificationStatus::Verified)
                    .with_due_date(now + Duration::days(7 * i64::from(n))),
            );
        }
        course = course.with_chapter(chapter);
    }

    for (i, (topic, tag)) in TOPICS.iter().enumerate() {
        let idx = u64::try_from(i).unwrap_or_default();
        course = course.with_question(
            ExamQuestion::new(
                QuestionId::new(base + idx + 1),
                format!("Which statement about {topic} is correct?"),
                vec![
                    "The first option".into(),
                    "The second option".into(),
                    "The third option".into(),
                    "The fourth option".into(),
                ],
                u32::try_from(i % 4).unwrap_or_default(),
            )
            .with_difficulty(Difficulty::determine(tag))
            .with_topic(*topic),
        );
    }

    course
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let course = demo_course(&args, now);
    storage.courses.upsert_course(&course).await?;

    // The learner finishes the first chapter and tries its quiz.
    if let Some(learner) = args.learner
        && let Some(first) = course.chapters.first()
    {
        storage
            .progress
            .upsert_progress(learner, first.id, ChapterProgress::completed(now))
            .await?;
        for quiz in &first.quizzes {
            storage
                .activity
                .append_quiz_attempt(learner, quiz.id, 80.0, now)
                .await?;
        }
        if let Some(assignment) = course
            .chapters
            .iter()
            .flat_map(|chapter| chapter.assignments.iter())
            .next()
        {
            storage
                .activity
                .append_submission(learner, assignment.id, SubmissionStatus::Submitted, now)
                .await?;
        }
    }

    println!(
        "Seeded course {} with {} chapters and {} exam questions into {}",
        course.id,
        course.chapters.len(),
        course.exam_questions.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
