use std::sync::Arc;

use lms_core::access::{ChapterAccess, ChapterWithContent, CourseProgress};
use lms_core::model::{ChapterId, ChapterProgress, Course, CourseId, UserId};
use lms_core::{AccessEvaluator, Viewer};
use storage::repository::{CourseRepository, ProgressRepository};
use tracing::debug;

use crate::Clock;
use crate::error::CourseAccessError;

/// Loads a learner's course snapshot and evaluates chapter access on it.
#[derive(Clone)]
pub struct CourseAccessService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CourseAccessService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
        }
    }

    async fn load(&self, course_id: CourseId, user_id: UserId) -> Result<Course, CourseAccessError> {
        self.courses
            .get_course_with_chapters(course_id, user_id)
            .await?
            .ok_or(CourseAccessError::CourseNotFound(course_id))
    }

    /// Per-chapter access verdicts in course order.
    ///
    /// # Errors
    ///
    /// Returns `CourseAccessError::CourseNotFound` for an unknown course.
    /// Returns `CourseAccessError::Storage` if repository access fails.
    pub async fn chapter_access(
        &self,
        viewer: &Viewer,
        course_id: CourseId,
    ) -> Result<Vec<ChapterAccess>, CourseAccessError> {
        let course = self.load(course_id, viewer.user_id).await?;
        let chapters = AccessEvaluator::evaluate_chapters(viewer, &course);
        debug!(
            course = %course_id,
            user = %viewer.user_id,
            accessible = chapters.iter().filter(|c| c.is_accessible).count(),
            total = chapters.len(),
            "evaluated chapter access"
        );
        Ok(chapters)
    }

    /// Chapter verdicts plus quiz and assignment verdicts, using the service clock
    /// for assignment lateness.
    ///
    /// # Errors
    ///
    /// Returns `CourseAccessError::CourseNotFound` for an unknown course.
    /// Returns `CourseAccessError::Storage` if repository access fails.
    pub async fn chapter_contents(
        &self,
        viewer: &Viewer,
        course_id: CourseId,
    ) -> Result<Vec<ChapterWithContent>, CourseAccessError> {
        let course = self.load(course_id, viewer.user_id).await?;
        Ok(AccessEvaluator::evaluate_chapter_contents(
            viewer,
            &course,
            self.clock.now(),
        ))
    }

    /// Nearest accessible chapter after `current`, if any.
    ///
    /// # Errors
    ///
    /// Returns `CourseAccessError` if the course cannot be loaded.
    pub async fn next_chapter(
        &self,
        viewer: &Viewer,
        course_id: CourseId,
        current: ChapterId,
    ) -> Result<Option<ChapterAccess>, CourseAccessError> {
        let chapters = self.chapter_access(viewer, course_id).await?;
        Ok(AccessEvaluator::next_accessible_chapter(&chapters, current).cloned())
    }

    /// Nearest accessible chapter before `current`, if any.
    ///
    /// # Errors
    ///
    /// Returns `CourseAccessError` if the course cannot be loaded.
    pub async fn previous_chapter(
        &self,
        viewer: &Viewer,
        course_id: CourseId,
        current: ChapterId,
    ) -> Result<Option<ChapterAccess>, CourseAccessError> {
        let chapters = self.chapter_access(viewer, course_id).await?;
        Ok(AccessEvaluator::previous_accessible_chapter(&chapters, current).cloned())
    }

    /// # Errors
    ///
    /// Returns `CourseAccessError` if the course cannot be loaded.
    pub async fn course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, CourseAccessError> {
        let course = self.load(course_id, user_id).await?;
        Ok(AccessEvaluator::course_progress(&course))
    }

    /// # Errors
    ///
    /// Returns `CourseAccessError::Storage` if repository access fails.
    pub async fn chapter_progress(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<Option<ChapterProgress>, CourseAccessError> {
        Ok(self.progress.get_progress(user_id, chapter_id).await?)
    }

    /// Record that the learner finished a chapter at the current clock time.
    ///
    /// # Errors
    ///
    /// Returns `CourseAccessError::Storage` if the chapter is unknown or
    /// persistence fails.
    pub async fn complete_chapter(
        &self,
        user_id: UserId,
        chapter_id: ChapterId,
    ) -> Result<(), CourseAccessError> {
        self.progress
            .upsert_progress(user_id, chapter_id, ChapterProgress::completed(self.clock.now()))
            .await?;
        debug!(user = %user_id, chapter = %chapter_id, "chapter completed");
        Ok(())
    }
}
