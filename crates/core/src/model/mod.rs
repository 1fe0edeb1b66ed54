mod course;
mod exam;
mod ids;

pub use ids::{
    AssignmentId, AttemptId, ChapterId, CourseId, ParseIdError, QuestionId, QuizId, UserId,
};

pub use course::{
    Assignment, Chapter, ChapterProgress, Course, CourseError, Quiz, QuizAttempt, Submission,
    SubmissionStatus, VerificationStatus,
};
pub use exam::{Difficulty, ExamAttempt, ExamQuestion, ExamResult, Grade};
