use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    entity::UserEntity,
    progress::{LessonStatus, ModuleHeader, ModuleProgress, ProgressTotals, rollup_modules},
};

/// Full breakdown for one student.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StudentProgressResponse {
    pub student_id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(flatten)]
    pub totals: ProgressTotals,
    pub modules: Vec<ModuleProgress>,
}

impl StudentProgressResponse {
    pub fn new(student: &UserEntity, modules: &[ModuleHeader], lessons: &[LessonStatus]) -> Self {
        Self {
            student_id: student.id(),
            username: student.username().to_string(),
            full_name: student.full_name().to_string(),
            totals: ProgressTotals::from_lessons(lessons),
            modules: rollup_modules(modules, lessons),
        }
    }
}

/// One row of the teacher overview.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentProgressSummary {
    pub student_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: i32,
    pub quizzes_pending: i64,
}

impl StudentProgressSummary {
    pub fn new(student: &UserEntity, lessons: &[LessonStatus]) -> Self {
        let totals = ProgressTotals::from_lessons(lessons);
        Self {
            student_id: student.id(),
            username: student.username().to_string(),
            full_name: student.full_name().to_string(),
            total_lessons: totals.total_lessons,
            completed_lessons: totals.completed_lessons,
            percentage: totals.percentage,
            quizzes_pending: totals.quizzes_pending,
        }
    }
}
