mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod session;
pub use session::{ActiveSessionRow, Session};

mod module;
pub use module::{Module, ModuleCreate, ModuleWithLessonsRow};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonWithStatusRow};

mod lesson_progress;
pub use lesson_progress::{LessonProgress, LessonStatusRow};

mod quiz_submission;
pub use quiz_submission::{
    QuizSubmission, QuizSubmissionRow, ScoreError, SubmissionStatus, validate_score,
};

mod notification;
pub use notification::{Notification, NotificationKind};

mod activity_log;
pub use activity_log::{ActivityAction, ActivityLogEntry};
