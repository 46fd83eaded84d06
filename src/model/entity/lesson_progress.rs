use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::progress::{LessonStatus, QuizState};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct LessonProgress {
    id: Uuid,
    student_id: Uuid,
    lesson_id: Uuid,
    completed_at: DateTime<Utc>,
}

impl ResourceTyped for LessonProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::LessonProgress
    }
}

impl LessonProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn completed_at(&self) -> &DateTime<Utc> {
        &self.completed_at
    }

    /// Upserts the (student, lesson) pair. Marking twice keeps the first completion time.
    pub async fn mark_done(
        mm: &ModelManager,
        student_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lesson_progress (id, student_id, lesson_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, lesson_id)
            DO UPDATE SET completed_at = lesson_progress.completed_at
            RETURNING id, student_id, lesson_id, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(lesson_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }
}

// Utils

/// One lesson seen from one student, the input of the progress rollup.
#[derive(Debug, Clone, FromRow)]
pub struct LessonStatusRow {
    pub student_id: Uuid,
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub has_quiz: bool,
    pub completed: bool,
    pub quiz_status: Option<String>,
}

impl LessonStatusRow {
    pub fn into_status(self) -> (Uuid, LessonStatus) {
        let quiz = QuizState::new(self.has_quiz, self.quiz_status.as_deref());
        (
            self.student_id,
            LessonStatus {
                lesson_id: self.lesson_id,
                module_id: self.module_id,
                completed: self.completed,
                quiz,
            },
        )
    }

    pub async fn for_student(mm: &ModelManager, student_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                $1::uuid AS student_id,
                l.id AS lesson_id,
                l.module_id,
                (l.quiz_total_items IS NOT NULL) AS has_quiz,
                (lp.id IS NOT NULL) AS completed,
                qs.status AS quiz_status
            FROM lessons l
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id AND lp.student_id = $1
            LEFT JOIN quiz_submissions qs
                ON qs.lesson_id = l.id AND qs.student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    /// Every lesson seen from each of `student_ids`.
    pub async fn for_students(
        mm: &ModelManager,
        student_ids: &[Uuid],
    ) -> DatabaseResult<Vec<Self>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as(
            r#"
            SELECT
                u.id AS student_id,
                l.id AS lesson_id,
                l.module_id,
                (l.quiz_total_items IS NOT NULL) AS has_quiz,
                (lp.id IS NOT NULL) AS completed,
                qs.status AS quiz_status
            FROM users u
            CROSS JOIN lessons l
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id AND lp.student_id = u.id
            LEFT JOIN quiz_submissions qs
                ON qs.lesson_id = l.id AND qs.student_id = u.id
            WHERE u.id = ANY($1)
            "#,
        )
        .bind(student_ids)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}
