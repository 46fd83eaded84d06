use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    error::log_warn,
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{
            ActivityAction, ActivityLogEntry, Lesson, Notification, NotificationKind,
            QuizSubmission, QuizSubmissionRow, SubmissionStatus,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::submissions::{QuizReviewBody, SubmissionListQuery},
        error::ErrorResponse,
        middlewares,
        routes::modules::require_staff,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(submissions_list_handler))
        .route("/{id}", get(submissions_get_handler))
        .route("/{id}/review", put(submissions_review_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/submissions/",
    description = "Quiz submissions, newest first. Students only see their own",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Submissions", body = Vec<QuizSubmissionRow>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "submissions",
    security(
        ("cookie" = [])
    )
)]
async fn submissions_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let student = (!user.is_staff()).then_some(user.user_id());

    let rows = QuizSubmissionRow::list(state.pool(), student, query.status)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizSubmission::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/submissions/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the submission")
    ),
    responses(
        (status = 200, description = "Submission found", body = QuizSubmission),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your submission", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "submissions",
    security(
        ("cookie" = [])
    )
)]
async fn submissions_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = QuizSubmission::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizSubmission::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(QuizSubmission::get_resource_type()))?;

    // teachers review every submission, students only read their own
    if !user.is_staff() {
        check_access(state.pool(), user, &found, user.user_id())
            .await
            .map_err(|e| {
                WebError::resource_access_error(QuizSubmission::get_resource_type(), e)
            })?;
    }

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/submissions/{id}/review",
    description = "Approves or rejects a pending quiz submission and notifies the student",
    request_body = QuizReviewBody,
    params(
        ("id" = Uuid, Path, description = "ID of the submission")
    ),
    responses(
        (status = 200, description = "Submission reviewed", body = QuizSubmission),
        (status = 400, description = "Status must be approved or rejected", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only teachers and admins review", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
        (status = 409, description = "Submission was reviewed already", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "submissions",
    security(
        ("cookie" = [])
    )
)]
async fn submissions_review_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizReviewBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_staff(user, QuizSubmission::get_resource_type())?;

    let kind = match payload.status {
        SubmissionStatus::Approved => NotificationKind::QuizApproved,
        SubmissionStatus::Rejected => NotificationKind::QuizRejected,
        SubmissionStatus::Pending => {
            return Err(WebError::user_bad_request(
                "Review status must be approved or rejected.",
            ));
        }
    };

    let found = QuizSubmission::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizSubmission::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(QuizSubmission::get_resource_type()))?;

    let feedback = payload
        .feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let reviewed = found
        .review(state.pool(), user, payload.status, feedback)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizSubmission::get_resource_type(), e))?
        .ok_or_else(|| {
            WebError::resource_conflict(
                QuizSubmission::get_resource_type(),
                "submission was reviewed already.",
            )
        })?;

    let lesson_title = match Lesson::find_by_id(state.pool(), user, reviewed.lesson_id()).await {
        Ok(Some(lesson)) => lesson.title().to_string(),
        Ok(None) => String::from("a lesson"),
        Err(e) => {
            log_warn(&e);
            String::from("a lesson")
        }
    };

    let mut message = format!(
        "Your quiz for \"{}\" was {} ({}/{}).",
        lesson_title,
        reviewed.status(),
        reviewed.score(),
        reviewed.total_items()
    );
    if let Some(feedback) = reviewed.feedback() {
        message.push_str(&format!(" Feedback: {feedback}"));
    }

    if let Err(e) = Notification::notify(state.pool(), reviewed.student_id(), kind, &message).await
    {
        log_warn(&e);
    }

    ActivityLogEntry::record(
        state.pool(),
        user,
        ActivityAction::QuizReviewed,
        format!("{} {}: {}", reviewed.id(), reviewed.status(), lesson_title),
    )
    .await;

    Ok((StatusCode::OK, Json(reviewed)))
}
