#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod exam;
pub mod model;
pub mod time;

pub use access::{AccessEvaluator, Viewer};
pub use error::Error;
pub use exam::{ExamError, ExamGate};
pub use time::Clock;
