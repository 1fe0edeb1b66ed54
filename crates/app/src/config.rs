use std::fmt;
use std::path::{Path, PathBuf};

use lms_core::Viewer;
use lms_core::model::{ChapterId, CourseId, UserId};

pub const DEFAULT_DB_URL: &str = "sqlite://lms.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=info";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Chapter, quiz and assignment access for the viewer.
    Access,
    /// Final-exam eligibility with the progress breakdown.
    Eligibility,
    /// Best exam result and attempt count.
    Best,
    /// Mark a chapter completed for the user.
    Complete,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "access" => Some(Self::Access),
            "eligibility" => Some(Self::Eligibility),
            "best" => Some(Self::Best),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub command: Command,
    pub db_url: String,
    pub log_filter: String,
    pub course_id: CourseId,
    pub user_id: UserId,
    pub chapter_id: Option<ChapterId>,
    pub purchased: bool,
    pub instructor: bool,
}

impl AppConfig {
    #[must_use]
    pub fn viewer(&self) -> Viewer {
        if self.instructor {
            Viewer::instructor(self.user_id)
        } else {
            Viewer::learner(self.user_id, self.purchased)
        }
    }

    /// Build the configuration from environment defaults overridden by flags.
    ///
    /// `args` excludes the program name. `env` looks up environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown commands or flags and malformed values.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let first = args.next().ok_or(ArgsError::MissingFlag {
            flag: "<subcommand>",
        })?;
        let command = Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?;

        let mut db_url = env("LMS_DB_URL").map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let log_filter = env("LMS_LOG")
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
        let mut course_id = None;
        let mut user_id = None;
        let mut chapter_id = None;
        let mut purchased = false;
        let mut instructor = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--course" => {
                    course_id = Some(parse_id::<CourseId>(&mut args, "--course")?);
                }
                "--user" => {
                    user_id = Some(parse_id::<UserId>(&mut args, "--user")?);
                }
                "--chapter" => {
                    chapter_id = Some(parse_id::<ChapterId>(&mut args, "--chapter")?);
                }
                "--purchased" => purchased = true,
                "--instructor" => instructor = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Complete && chapter_id.is_none() {
            return Err(ArgsError::MissingFlag { flag: "--chapter" });
        }

        Ok(Self {
            command,
            db_url,
            log_filter,
            course_id: course_id.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
            user_id: user_id.ok_or(ArgsError::MissingFlag { flag: "--user" })?,
            chapter_id,
            purchased,
            instructor,
        })
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<T>()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> --course <id> --user <id> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  access          Chapter, quiz and assignment access");
    eprintln!("  eligibility     Final-exam eligibility");
    eprintln!("  best            Best final-exam result");
    eprintln!("  complete        Mark --chapter <id> completed");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --purchased           Viewer has purchased the course");
    eprintln!("  --instructor          Viewer is the course instructor");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, LMS_LOG (falls back to RUST_LOG, default {DEFAULT_LOG_FILTER})");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim();
    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directory for `sqlite://` URLs.
///
/// # Errors
///
/// Returns an error when the URL has no path or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "LMS_DB_URL" => Some("sqlite://from-env.sqlite3".to_string()),
            "LMS_LOG" => Some("debug".to_string()),
            _ => None,
        };
        let config = AppConfig::parse(
            args(&[
                "access",
                "--db",
                "sqlite::memory:",
                "--course",
                "3",
                "--user",
                "9",
                "--purchased",
            ]),
            env,
        )
        .unwrap();

        assert_eq!(config.command, Command::Access);
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.course_id, CourseId::new(3));
        assert_eq!(config.viewer(), Viewer::learner(UserId::new(9), true));
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = AppConfig::parse(
            args(&["eligibility", "--course", "1", "--user", "2", "--instructor"]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.viewer().is_instructor);
    }

    #[test]
    fn invalid_input_is_reported() {
        assert_eq!(
            AppConfig::parse(args(&["grade"]), no_env).unwrap_err(),
            ArgsError::UnknownCommand("grade".into())
        );
        assert_eq!(
            AppConfig::parse(args(&["best", "--course", "x"]), no_env).unwrap_err(),
            ArgsError::InvalidId {
                flag: "--course",
                raw: "x".into()
            }
        );
        assert_eq!(
            AppConfig::parse(args(&["best", "--course", "1"]), no_env).unwrap_err(),
            ArgsError::MissingFlag { flag: "--user" }
        );
        assert_eq!(
            AppConfig::parse(args(&["complete", "--course", "1", "--user", "1"]), no_env)
                .unwrap_err(),
            ArgsError::MissingFlag { flag: "--chapter" }
        );
        assert_eq!(
            AppConfig::parse(args(&["access", "--user"]), no_env).unwrap_err(),
            ArgsError::MissingValue { flag: "--user" }
        );
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/lms.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/lms.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite:file:mem?mode=memory".into()),
            "sqlite:file:mem?mode=memory"
        );
    }
}
