use crate::auth::hash_password;
use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    username: String,
    full_name: String,
    #[serde(skip)]
    password_hash: String,
    role: String,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub username: String,
    pub full_name: String,
    /// Ignored by `update`, passwords are only set on creation.
    pub password_hash: String,
    /// Ignored by `update`, see [`UserEntity::set_role`].
    pub role: UserRole,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Name shown in notifications, falls back to the username.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, full_name, password_hash, role)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.full_name)
        .bind(&data.password_hash)
        .bind(data.role.to_string())
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET username = $1, full_name = $2 WHERE id = $3")
            .bind(&data.username)
            .bind(&data.full_name)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.username = data.username;
        self.full_name = data.full_name;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
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
            "SELECT * FROM users ORDER BY created_at, username LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_username(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        username: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn list_by_role(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<crate::model::Page<Self>> {
        let (limit, offset) = crate::model::Page::<Self>::sanitize(limit, offset);
        let items = sqlx::query_as(
            "SELECT * FROM users WHERE role = $1 ORDER BY created_at, username LIMIT $2 OFFSET $3",
        )
        .bind(role.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total = Self::count_by_role(mm, role).await?;
        Ok(crate::model::Page::new(items, total, limit, offset))
    }

    pub async fn count_by_role(mm: &ModelManager, role: UserRole) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.to_string())
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    /// Ids of every user holding one of `roles`, used for notification fan-out.
    pub async fn ids_by_roles(mm: &ModelManager, roles: &[UserRole]) -> DatabaseResult<Vec<Uuid>> {
        let roles: Vec<String> = roles.iter().map(ToString::to_string).collect();
        let result = sqlx::query_scalar("SELECT id FROM users WHERE role = ANY($1)")
            .bind(&roles)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn set_role(mut self, mm: &ModelManager, role: UserRole) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.to_string())
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.role = role.to_string();
        Ok(self)
    }

    pub async fn set_avatar_url(mut self, mm: &ModelManager, url: String) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET avatar_url = $1 WHERE id = $2")
            .bind(&url)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.avatar_url = Some(url);
        Ok(self)
    }

    /// Creates the account unless a user with this name already exists.
    #[tracing::instrument(skip(mm, password))]
    pub async fn ensure(
        mm: &ModelManager,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> DatabaseResult<Self> {
        let admin = AuthenticatedUser::admin();
        if let Some(found) = Self::find_by_username(mm, &admin, username).await? {
            return Ok(found);
        }

        tracing::info!("creating bootstrap account `{}`", username);
        let created = Self::create(
            mm,
            &admin,
            UserEntityCreateUpdate {
                username: username.to_string(),
                full_name: String::new(),
                password_hash: hash_password(password)?,
                role,
            },
        )
        .await?;
        Ok(created)
    }
}
