use serde::Deserialize;

use crate::model::entity::SubmissionStatus;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuizSubmitBody {
    pub score: i32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuizReviewBody {
    /// `approved` or `rejected`.
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    pub status: Option<SubmissionStatus>,
}
