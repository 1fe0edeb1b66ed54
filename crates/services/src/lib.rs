#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_access_service;
pub mod error;
pub mod exam_service;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use course_access_service::CourseAccessService;
pub use error::{AppServicesError, CourseAccessError, ExamServiceError};
pub use exam_service::{ExamService, SubmittedExam};
