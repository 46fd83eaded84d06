use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<&str> for SubmissionStatus {
    fn from(value: &str) -> Self {
        match value {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Reasons a self reported quiz score is refused before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("This lesson has no quiz.")]
    NoQuiz,
    #[error("Score cannot be negative.")]
    Negative,
    #[error("Score cannot be greater than total items ({total_items}).")]
    AboveTotal { total_items: i32 },
}

/// Checks `0 <= score <= total_items`; `total_items` is `None` for lessons without a quiz.
pub fn validate_score(score: i32, total_items: Option<i32>) -> Result<i32, ScoreError> {
    let total_items = total_items.ok_or(ScoreError::NoQuiz)?;
    if score < 0 {
        return Err(ScoreError::Negative);
    }
    if score > total_items {
        return Err(ScoreError::AboveTotal { total_items });
    }
    Ok(total_items)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizSubmission {
    id: Uuid,
    student_id: Uuid,
    lesson_id: Uuid,
    score: i32,
    total_items: i32,
    status: String,
    feedback: Option<String>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
}

impl ResourceTyped for QuizSubmission {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizSubmission
    }
}

impl QuizSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn total_items(&self) -> i32 {
        self.total_items
    }

    pub fn status(&self) -> SubmissionStatus {
        SubmissionStatus::from(self.status.as_str())
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn reviewed_by(&self) -> Option<Uuid> {
        self.reviewed_by
    }

    pub fn reviewed_at(&self) -> Option<&DateTime<Utc>> {
        self.reviewed_at.as_ref()
    }

    pub fn submitted_at(&self) -> &DateTime<Utc> {
        &self.submitted_at
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as("SELECT * FROM quiz_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(row)
    }

    pub async fn find_for(
        mm: &ModelManager,
        student_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            "SELECT * FROM quiz_submissions WHERE student_id = $1 AND lesson_id = $2",
        )
        .bind(student_id)
        .bind(lesson_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(row)
    }

    /// Stores a pending submission, replacing a pending or rejected one.
    /// Returns `None` when the student already has an approved submission.
    pub async fn submit(
        mm: &ModelManager,
        student_id: Uuid,
        lesson_id: Uuid,
        score: i32,
        total_items: i32,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO quiz_submissions (id, student_id, lesson_id, score, total_items, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (student_id, lesson_id) DO UPDATE
            SET score = EXCLUDED.score,
                total_items = EXCLUDED.total_items,
                status = 'pending',
                feedback = NULL,
                reviewed_by = NULL,
                reviewed_at = NULL,
                submitted_at = now()
            WHERE quiz_submissions.status <> 'approved'
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(lesson_id)
        .bind(score)
        .bind(total_items)
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }

    /// Approves or rejects a pending submission. Returns `None` if it was reviewed already.
    pub async fn review(
        &self,
        mm: &ModelManager,
        reviewer: &AuthenticatedUser,
        status: SubmissionStatus,
        feedback: Option<String>,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            UPDATE quiz_submissions
            SET status = $1, feedback = $2, reviewed_by = $3, reviewed_at = now()
            WHERE id = $4 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(status.to_string())
        .bind(feedback)
        .bind(reviewer.persisted_id())
        .bind(self.id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn count_by_status(
        mm: &ModelManager,
        status: SubmissionStatus,
    ) -> DatabaseResult<i64> {
        let result: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_submissions WHERE status = $1")
                .bind(status.to_string())
                .fetch_one(mm.executor())
                .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for QuizSubmission {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

// Utils

/// Submission joined with the names a reviewer needs to see.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizSubmissionRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_username: String,
    pub student_full_name: String,
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub module_id: Uuid,
    pub score: i32,
    pub total_items: i32,
    pub status: String,
    pub feedback: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl QuizSubmissionRow {
    /// Newest first. `student_id` narrows the listing to one student.
    pub async fn list(
        mm: &ModelManager,
        student_id: Option<Uuid>,
        status: Option<SubmissionStatus>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                qs.id,
                qs.student_id,
                u.username AS student_username,
                u.full_name AS student_full_name,
                qs.lesson_id,
                l.title AS lesson_title,
                l.module_id,
                qs.score,
                qs.total_items,
                qs.status,
                qs.feedback,
                qs.reviewed_at,
                qs.submitted_at
            FROM quiz_submissions qs
            JOIN users u ON u.id = qs.student_id
            JOIN lessons l ON l.id = qs.lesson_id
            WHERE ($1::uuid IS NULL OR qs.student_id = $1)
            AND ($2::text IS NULL OR qs.status = $2)
            ORDER BY qs.submitted_at DESC
            "#,
        )
        .bind(student_id)
        .bind(status.map(|s| s.to_string()))
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate_score_test() {
        assert_eq!(validate_score(7, Some(10)), Ok(10));
        assert_eq!(validate_score(0, Some(10)), Ok(10));
        assert_eq!(validate_score(10, Some(10)), Ok(10));
        assert_eq!(validate_score(5, None), Err(ScoreError::NoQuiz));
        assert_eq!(validate_score(-1, Some(10)), Err(ScoreError::Negative));
        assert_eq!(
            validate_score(11, Some(10)),
            Err(ScoreError::AboveTotal { total_items: 10 })
        );
    }

    #[test]
    fn score_error_message_test() {
        let err = validate_score(12, Some(10)).unwrap_err();
        assert_eq!(err.to_string(), "Score cannot be greater than total items (10).");
    }

    #[test]
    fn submission_status_test() {
        assert_eq!(SubmissionStatus::from("approved"), SubmissionStatus::Approved);
        assert_eq!(SubmissionStatus::from("rejected"), SubmissionStatus::Rejected);
        assert_eq!(SubmissionStatus::from("pending"), SubmissionStatus::Pending);
        assert_eq!(SubmissionStatus::Approved.to_string(), "approved");

        let parsed: SubmissionStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, SubmissionStatus::Rejected);
    }
}
