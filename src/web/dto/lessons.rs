use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{LessonWithStatusRow, QuizSubmission};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub material_url: Option<String>,
    pub quiz_url: Option<String>,
    pub quiz_total_items: Option<i32>,
    pub completed: bool,
    /// The caller's own quiz submission for this lesson.
    pub submission: Option<QuizSubmission>,
}

impl LessonResponse {
    pub fn new(row: LessonWithStatusRow, submission: Option<QuizSubmission>) -> Self {
        Self {
            id: row.id,
            module_id: row.module_id,
            title: row.title,
            content: row.content,
            order_index: row.order_index,
            material_url: row.material_url,
            quiz_url: row.quiz_url,
            quiz_total_items: row.quiz_total_items,
            completed: row.completed,
            submission,
        }
    }
}

impl From<LessonWithStatusRow> for LessonResponse {
    fn from(row: LessonWithStatusRow) -> Self {
        Self::new(row, None)
    }
}
