use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::error::log_warn;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Page, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Signup,
    Signin,
    Signout,
    LessonCompleted,
    QuizSubmitted,
    QuizReviewed,
    ModuleCreated,
    ModuleUpdated,
    ModuleDeleted,
    LessonCreated,
    LessonUpdated,
    LessonDeleted,
    RoleChanged,
    UserUpdated,
    UserDeleted,
    FileUploaded,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Signin => "signin",
            Self::Signout => "signout",
            Self::LessonCompleted => "lesson_completed",
            Self::QuizSubmitted => "quiz_submitted",
            Self::QuizReviewed => "quiz_reviewed",
            Self::ModuleCreated => "module_created",
            Self::ModuleUpdated => "module_updated",
            Self::ModuleDeleted => "module_deleted",
            Self::LessonCreated => "lesson_created",
            Self::LessonUpdated => "lesson_updated",
            Self::LessonDeleted => "lesson_deleted",
            Self::RoleChanged => "role_changed",
            Self::UserUpdated => "user_updated",
            Self::UserDeleted => "user_deleted",
            Self::FileUploaded => "file_uploaded",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ActivityLogEntry {
    id: Uuid,
    user_id: Option<Uuid>,
    username: Option<String>,
    action: String,
    details: String,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for ActivityLogEntry {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::ActivityLog
    }
}

impl ActivityLogEntry {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub async fn insert(
        mm: &ModelManager,
        user_id: Option<Uuid>,
        action: ActivityAction,
        details: &str,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO activity_log (id, user_id, action, details) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action.as_str())
        .bind(details)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    /// Best effort: a failed insert is logged and swallowed, the caller's
    /// operation already happened.
    pub async fn record<S: AsRef<str>>(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        action: ActivityAction,
        details: S,
    ) {
        if let Err(e) = Self::insert(mm, actor.persisted_id(), action, details.as_ref()).await {
            log_warn(&e);
        }
    }

    pub async fn page(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Page<Self>> {
        let (limit, offset) = Page::<Self>::sanitize(limit, offset);

        let items = sqlx::query_as::<_, Self>(
            r#"
            SELECT a.id, a.user_id, u.username, a.action, a.details, a.created_at
            FROM activity_log a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset);

        let (items, total) = tokio::try_join!(
            items.fetch_all(mm.executor()),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity_log")
                .fetch_one(mm.executor()),
        )?;

        Ok(Page::new(items, total, limit, offset))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn action_names_test() {
        assert_eq!(ActivityAction::LessonCompleted.to_string(), "lesson_completed");
        assert_eq!(ActivityAction::QuizReviewed.as_str(), "quiz_reviewed");
        assert_eq!(ActivityAction::FileUploaded.as_str(), "file_uploaded");
    }
}
