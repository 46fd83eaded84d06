use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    module_id: Uuid,
    title: String,
    content: String,
    order_index: i32,
    material_url: Option<String>,
    quiz_url: Option<String>,
    quiz_total_items: Option<i32>,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn module_id(&self) -> uuid::Uuid {
        self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn material_url(&self) -> Option<&str> {
        self.material_url.as_deref()
    }

    pub fn quiz_url(&self) -> Option<&str> {
        self.quiz_url.as_deref()
    }

    /// Number of quiz items, `None` when the lesson carries no quiz.
    pub fn quiz_total_items(&self) -> Option<i32> {
        self.quiz_total_items
    }

    pub fn has_quiz(&self) -> bool {
        self.quiz_total_items.is_some()
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub module_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order_index: Option<i32>,
    pub quiz_url: Option<String>,
    pub quiz_total_items: Option<i32>,
}

impl LessonCreate {
    /// Quiz item count has to be positive when a quiz is attached.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && self.quiz_total_items.is_none_or(|n| n > 0)
    }
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lessons (id, module_id, title, content, order_index, quiz_url, quiz_total_items)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.module_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(data.order_index.unwrap_or(0))
        .bind(&data.quiz_url)
        .bind(data.quiz_total_items)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query(
            r#"
            UPDATE lessons
            SET module_id = $1, title = $2, content = $3, order_index = $4, quiz_url = $5, quiz_total_items = $6
            WHERE id = $7
            "#,
        )
        .bind(data.module_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(order_index)
        .bind(&data.quiz_url)
        .bind(data.quiz_total_items)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.module_id = data.module_id;
        self.title = data.title;
        self.content = data.content;
        self.order_index = order_index;
        self.quiz_url = data.quiz_url;
        self.quiz_total_items = data.quiz_total_items;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM lessons ORDER BY module_id, order_index, title, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Lesson {
    pub async fn all_by_module(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        mid: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM lessons WHERE module_id = $1 ORDER BY order_index, title, id")
                .bind(mid)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn find_by_title(mm: &ModelManager, title: &str) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE title = $1 LIMIT 1")
            .bind(title)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn set_material_url(mut self, mm: &ModelManager, url: String) -> DatabaseResult<Self> {
        sqlx::query("UPDATE lessons SET material_url = $1 WHERE id = $2")
            .bind(&url)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.material_url = Some(url);
        Ok(self)
    }
}

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = Option<uuid::Uuid>;

    /// Lessons belong to whoever created their module.
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT created_by FROM modules WHERE id = $1")
                .bind(self.module_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(owner.flatten())
    }
}

// Utils

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonWithStatusRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub material_url: Option<String>,
    pub quiz_url: Option<String>,
    pub quiz_total_items: Option<i32>,
    pub completed: bool,
}

impl LessonWithStatusRow {
    pub async fn find_by_id(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                l.id,
                l.module_id,
                l.title,
                l.content,
                l.order_index,
                l.material_url,
                l.quiz_url,
                l.quiz_total_items,
                (lp.id IS NOT NULL) AS completed
            FROM lessons l
            LEFT JOIN lesson_progress lp
                ON l.id = lp.lesson_id AND lp.student_id = $2
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .bind(actor.user_id())
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }

    /// First lesson after `lesson_id` in listing order that the actor has not completed.
    pub async fn find_next_uncompleted(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                l.id,
                l.module_id,
                l.title,
                l.content,
                l.order_index,
                l.material_url,
                l.quiz_url,
                l.quiz_total_items,
                (lp.id IS NOT NULL) AS completed
            FROM lessons cur
            JOIN lessons l
                ON l.module_id = cur.module_id
                AND (l.order_index, l.title, l.id) > (cur.order_index, cur.title, cur.id)
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id
                AND lp.student_id = $2
            WHERE cur.id = $1
            AND lp.id IS NULL
            ORDER BY l.order_index, l.title, l.id
            LIMIT 1;
            "#,
        )
        .bind(lesson_id)
        .bind(actor.user_id())
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn create(title: &str, quiz_total_items: Option<i32>) -> LessonCreate {
        LessonCreate {
            module_id: Uuid::new_v4(),
            title: title.to_string(),
            content: String::new(),
            order_index: None,
            quiz_url: None,
            quiz_total_items,
        }
    }

    #[test]
    fn lesson_create_validation_test() {
        assert!(create("Variables", None).is_valid());
        assert!(create("Variables", Some(10)).is_valid());
        assert!(!create("Variables", Some(0)).is_valid());
        assert!(!create("Variables", Some(-3)).is_valid());
        assert!(!create("   ", None).is_valid());
    }
}
