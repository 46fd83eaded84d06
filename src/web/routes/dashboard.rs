use axum::{
    Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse,
    routing::get,
};

use crate::{
    model::{
        CrudRepository, ResourceType,
        entity::{Lesson, Module, QuizSubmission, SubmissionStatus, UserEntity},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult, dto::stats::StatsResponse,
        error::ErrorResponse, middlewares, routes::modules::require_staff,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(stats_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/stats/",
    description = "Headline counters for the staff dashboard",
    responses(
        (status = 200, description = "Counters", body = StatsResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only teachers and admins", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "stats",
    security(
        ("cookie" = [])
    )
)]
async fn stats_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_staff(user, ResourceType::User)?;

    let mm = state.pool();
    let (students, teachers, admins, modules, lessons, pending_submissions) = tokio::try_join!(
        UserEntity::count_by_role(mm, UserRole::Student),
        UserEntity::count_by_role(mm, UserRole::Teacher),
        UserEntity::count_by_role(mm, UserRole::Admin),
        Module::count(mm, user),
        Lesson::count(mm, user),
        QuizSubmission::count_by_status(mm, SubmissionStatus::Pending),
    )
    .map_err(|e| WebError::resource_fetch_error(ResourceType::User, e))?;

    Ok((
        StatusCode::OK,
        Json(StatsResponse {
            students,
            teachers,
            admins,
            modules,
            lessons,
            pending_submissions,
        }),
    ))
}
