use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};

use crate::{
    model::{Page, ResourceTyped, entity::ActivityLogEntry},
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult, error::ErrorResponse,
        middlewares, routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/page", get(activity_page_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/activity/page",
    description = "Activity log, newest first",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = Page<ActivityLogEntry>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "activity",
    security(
        ("cookie" = [])
    )
)]
async fn activity_page_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(ActivityLogEntry::get_resource_type()));
    }

    let entries = ActivityLogEntry::page(state.pool(), page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(ActivityLogEntry::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(entries)))
}
