use lms_core::Clock;
use services::AppServices;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{AppConfig, Command, print_usage, prepare_sqlite_file};

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(filter)
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || matches!(argv[0].as_str(), "--help" | "-h") {
        print_usage();
        return Ok(());
    }

    let config = AppConfig::parse(argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(&config.log_filter);

    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config.db_url, Clock::default()).await?;
    tracing::debug!(command = ?config.command, course = %config.course_id, "dispatching");

    match config.command {
        Command::Access => print_access(&services, &config).await,
        Command::Eligibility => print_eligibility(&services, &config).await,
        Command::Best => print_best(&services, &config).await,
        Command::Complete => {
            let chapter = config.chapter_id.ok_or(config::ArgsError::MissingFlag {
                flag: "--chapter",
            })?;
            services
                .course_access()
                .complete_chapter(config.user_id, chapter)
                .await?;
            println!("chapter {chapter} completed for user {}", config.user_id);
            Ok(())
        }
    }
}

async fn print_access(
    services: &AppServices,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let access = services.course_access();
    let viewer = config.viewer();
    let chapters = access.chapter_contents(&viewer, config.course_id).await?;
    let progress = access.course_progress(viewer.user_id, config.course_id).await?;

    println!(
        "course {}: {}/{} chapters completed ({}%)",
        config.course_id, progress.completed_chapters, progress.total_chapters, progress.percentage
    );
    for chapter in &chapters {
        let a = &chapter.access;
        println!(
            "  [{}] {}. {} ({}){}",
            mark(a.is_accessible),
            a.position,
            a.title,
            a.reason,
            if chapter.is_fully_completed { ", done" } else { "" }
        );
        for quiz in &chapter.quizzes {
            println!(
                "      [{}] quiz {}{}",
                mark(quiz.is_accessible),
                quiz.title,
                if quiz.is_completed { ", attempted" } else { "" }
            );
        }
        for assignment in &chapter.assignments {
            let status = if assignment.is_completed {
                "completed"
            } else if assignment.is_awaiting_verification() {
                "awaiting verification"
            } else if assignment.is_late {
                "late"
            } else {
                assignment.verification_status.as_str()
            };
            println!(
                "      [{}] assignment {} ({status})",
                mark(assignment.is_accessible),
                assignment.title
            );
        }
    }
    Ok(())
}

async fn print_eligibility(
    services: &AppServices,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let verdict = services
        .exams()
        .check_eligibility(config.user_id, config.course_id)
        .await?;

    match verdict.reason {
        None => println!("eligible for the final exam"),
        Some(reason) => println!("not eligible: {reason}"),
    }
    let p = verdict.progress;
    println!(
        "  chapters    {}/{} ({}%)",
        p.chapters.completed,
        p.chapters.total,
        p.chapters.percentage()
    );
    println!(
        "  quizzes     {}/{} ({}%)",
        p.quizzes.completed,
        p.quizzes.total,
        p.quizzes.percentage()
    );
    println!(
        "  assignments {}/{} ({}%)",
        p.assignments.completed,
        p.assignments.total,
        p.assignments.percentage()
    );
    Ok(())
}

async fn print_best(
    services: &AppServices,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let exams = services.exams();
    let history = exams
        .attempt_history(config.user_id, config.course_id)
        .await?;
    let Some(best) = exams.best_result(config.user_id, config.course_id).await? else {
        println!("no exam attempts for course {}", config.course_id);
        return Ok(());
    };

    let r = best.result;
    println!(
        "best of {} attempt(s): {}% ({}/{}) grade {}, {}{}",
        history.len(),
        r.score,
        r.correct,
        r.total,
        r.grade,
        if r.passed { "passed" } else { "failed" },
        if r.certificate_eligible {
            ", certificate eligible"
        } else {
            ""
        }
    );
    println!("completed at {}", best.completed_at.to_rfc3339());
    Ok(())
}

fn mark(accessible: bool) -> char {
    if accessible { ' ' } else { 'x' }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
