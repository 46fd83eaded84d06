use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    model::{ResourceTyped, check_owner, entity::Notification},
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::notifications::{MarkedReadResponse, NotificationListQuery, UnreadCountResponse},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(notifications_list_handler))
        .route("/unread-count", get(notifications_unread_handler))
        .route("/read-all", post(notifications_read_all_handler))
        .route("/{id}/read", post(notifications_read_handler))
        .route("/{id}", delete(notifications_delete_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn own_notification(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Notification> {
    let found = Notification::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Notification::get_resource_type()))?;

    check_owner(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Notification::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/",
    description = "The caller's notifications, newest first",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "notifications",
    security(
        ("cookie" = [])
    )
)]
async fn notifications_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let items = Notification::list_for_user(state.pool(), user.user_id(), query.unread_only)
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "notifications",
    security(
        ("cookie" = [])
    )
)]
async fn notifications_unread_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let unread = Notification::count_unread(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(UnreadCountResponse { unread })))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "ID of the notification")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "notifications",
    security(
        ("cookie" = [])
    )
)]
async fn notifications_read_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = own_notification(&state, user, id).await?;

    let updated = found
        .mark_read(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses(
        (status = 200, description = "Every notification marked as read", body = MarkedReadResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "notifications",
    security(
        ("cookie" = [])
    )
)]
async fn notifications_read_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let updated = Notification::mark_all_read(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(MarkedReadResponse { updated })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the notification")
    ),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "notifications",
    security(
        ("cookie" = [])
    )
)]
async fn notifications_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = own_notification(&state, user, id).await?;

    found
        .delete(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Notification::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
