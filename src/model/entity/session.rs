use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseResult, ModelManager, ResourceType, ResourceTyped};

/// Server side half of a sign-in. The JWT carries the session id so a session
/// can be revoked before the token expires.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Session {
    id: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// A live session joined with the current role of its owner.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSessionRow {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl ResourceTyped for Session {
    fn get_resource_type() -> ResourceType {
        ResourceType::Session
    }
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub async fn open(
        mm: &ModelManager,
        user_id: Uuid,
        ttl: chrono::Duration,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Utc::now() + ttl)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(row)
    }

    pub async fn revoke(mm: &ModelManager, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn cleanup_expired(mm: &ModelManager) -> DatabaseResult<u64> {
        let result = sqlx::query(r#"DELETE FROM sessions WHERE expires_at < now()"#)
            .execute(mm.executor())
            .await?;

        Ok(result.rows_affected())
    }
}

impl ActiveSessionRow {
    pub async fn find(mm: &ModelManager, session_id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT s.id AS session_id, s.user_id, u.role, s.expires_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.expires_at > now()
            "#,
        )
        .bind(session_id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}
