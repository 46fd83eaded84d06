use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    QuizSubmitted,
    QuizApproved,
    QuizRejected,
    RoleChanged,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuizSubmitted => write!(f, "quiz_submitted"),
            Self::QuizApproved => write!(f, "quiz_approved"),
            Self::QuizRejected => write!(f, "quiz_rejected"),
            Self::RoleChanged => write!(f, "role_changed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Notification {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Notification {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Notification
    }
}

impl Notification {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub async fn notify(
        mm: &ModelManager,
        user_id: Uuid,
        kind: NotificationKind,
        message: &str,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, kind, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.to_string())
        .bind(message)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    /// Same message to several users in one statement.
    pub async fn notify_many(
        mm: &ModelManager,
        user_ids: &[Uuid],
        kind: NotificationKind,
        message: &str,
    ) -> DatabaseResult<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = user_ids.iter().map(|_| Uuid::new_v4()).collect();
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, message)
            SELECT id, user_id, $3, $4
            FROM UNNEST($1::uuid[], $2::uuid[]) AS t(id, user_id)
            "#,
        )
        .bind(&ids)
        .bind(user_ids)
        .bind(kind.to_string())
        .bind(message)
        .execute(mm.executor())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(row)
    }

    pub async fn list_for_user(
        mm: &ModelManager,
        user_id: Uuid,
        unread_only: bool,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn count_unread(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn mark_read(mut self, mm: &ModelManager) -> DatabaseResult<Self> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.is_read = true;
        Ok(self)
    }

    pub async fn mark_all_read(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(mm.executor())
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HasOwner for Notification {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
