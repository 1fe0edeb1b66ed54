use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            final_exam_enabled INTEGER NOT NULL DEFAULT 0 CHECK (final_exam_enabled IN (0, 1))
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS chapters (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            is_published INTEGER NOT NULL CHECK (is_published IN (0, 1)),
            is_free INTEGER NOT NULL CHECK (is_free IN (0, 1)),
            is_preview INTEGER NOT NULL CHECK (is_preview IN (0, 1)),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            chapter_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            score REAL NOT NULL,
            submitted_at TEXT NOT NULL,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS assignments (
            id INTEGER PRIMARY KEY,
            chapter_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            is_published INTEGER NOT NULL CHECK (is_published IN (0, 1)),
            due_date TEXT,
            verification_status TEXT NOT NULL
                CHECK (verification_status IN ('pending', 'verified', 'rejected')),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS assignment_submissions (
            id INTEGER PRIMARY KEY,
            assignment_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('submitted', 'graded')),
            submitted_at TEXT NOT NULL,
            FOREIGN KEY (assignment_id) REFERENCES assignments(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS chapter_progress (
            user_id INTEGER NOT NULL,
            chapter_id INTEGER NOT NULL,
            is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
            completed_at TEXT,
            PRIMARY KEY (user_id, chapter_id),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exam_questions (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            prompt TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_option INTEGER NOT NULL CHECK (correct_option >= 0),
            explanation TEXT,
            difficulty TEXT NOT NULL,
            topic TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exam_attempts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            questions TEXT NOT NULL,
            answers TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            correct INTEGER NOT NULL CHECK (correct >= 0),
            total INTEGER NOT NULL CHECK (total > 0),
            passed INTEGER NOT NULL CHECK (passed IN (0, 1)),
            grade TEXT NOT NULL,
            certificate_eligible INTEGER NOT NULL CHECK (certificate_eligible IN (0, 1)),
            completed_at TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_chapters_course_position
            ON chapters (course_id, is_published, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_quiz_user
            ON quiz_attempts (quiz_id, user_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_submissions_assignment_user
            ON assignment_submissions (assignment_id, user_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_exam_attempts_user_course_completed
            ON exam_attempts (user_id, course_id, completed_at);
    ",
];

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the course tree, learner activity tables, the exam question bank
/// and exam attempts.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1.iter().copied() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
