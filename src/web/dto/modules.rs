use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    DatabaseResult,
    entity::{ModuleWithLessonsRow, SubmissionStatus},
    progress::{LessonStatus, ProgressTotals, QuizState},
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonShort {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub has_quiz: bool,
    pub completed: bool,
    pub quiz_status: Option<SubmissionStatus>,
}

impl LessonShort {
    fn status(&self, module_id: Uuid) -> LessonStatus {
        let quiz = match (self.has_quiz, self.quiz_status) {
            (false, _) => QuizState::NotRequired,
            (true, None) => QuizState::NotSubmitted,
            (true, Some(SubmissionStatus::Pending)) => QuizState::Pending,
            (true, Some(SubmissionStatus::Approved)) => QuizState::Approved,
            (true, Some(SubmissionStatus::Rejected)) => QuizState::Rejected,
        };
        LessonStatus {
            lesson_id: self.id,
            module_id,
            completed: self.completed,
            quiz,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleWithLessons {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    /// Share of this module's lessons the caller has finished.
    pub percentage: i32,
    pub lessons: Vec<LessonShort>,
}

impl TryFrom<ModuleWithLessonsRow> for ModuleWithLessons {
    type Error = serde_json::Error;

    fn try_from(value: ModuleWithLessonsRow) -> Result<Self, Self::Error> {
        let lessons: Vec<LessonShort> = serde_json::from_value(value.lessons)?;
        let statuses: Vec<LessonStatus> = lessons.iter().map(|l| l.status(value.id)).collect();

        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            order_index: value.order_index,
            percentage: ProgressTotals::from_lessons(&statuses).percentage,
            lessons,
        })
    }
}

impl ModuleWithLessons {
    pub fn from_rows(rows: Vec<ModuleWithLessonsRow>) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(ModuleWithLessons::try_from)
            .collect::<Result<_, _>>()?)
    }
}
