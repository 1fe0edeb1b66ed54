use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::course_access_service::CourseAccessService;
use crate::error::AppServicesError;
use crate::exam_service::ExamService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    course_access: Arc<CourseAccessService>,
    exams: Arc<ExamService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "storage ready");
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let course_access = Arc::new(CourseAccessService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
        ));
        let exams = Arc::new(ExamService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.exam_attempts),
        ));
        Self {
            course_access,
            exams,
        }
    }

    #[must_use]
    pub fn course_access(&self) -> Arc<CourseAccessService> {
        Arc::clone(&self.course_access)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }
}
