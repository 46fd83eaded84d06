use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{model::entity::UserEntity, web::UserRole};

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupBody {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

impl SignupBody {
    /// Client facing reason the body is refused, if any.
    pub fn problem(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            Some("Username cannot be empty.")
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            Some("Password must be at least 4 characters long.")
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SigninBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserUpdateBody {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserRoleBody {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UserPageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub role: Option<UserRole>,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub user: UserEntity,
    pub expires_at: DateTime<Utc>,
}
