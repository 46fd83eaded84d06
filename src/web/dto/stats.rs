use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub students: i64,
    pub teachers: i64,
    pub admins: i64,
    pub modules: i64,
    pub lessons: i64,
    pub pending_submissions: i64,
}
