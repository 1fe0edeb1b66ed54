use thiserror::Error;

use crate::exam::ExamError;
use crate::model::{CourseError, ParseIdError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
