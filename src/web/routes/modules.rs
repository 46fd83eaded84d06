use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceType, ResourceTyped, check_access,
        entity::{
            ActivityAction, ActivityLogEntry, Lesson, Module, ModuleCreate, ModuleWithLessonsRow,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::modules::ModuleWithLessons, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(modules_list_handler).post(modules_create_handler))
        .route(
            "/{id}",
            get(modules_get_handler)
                .put(modules_update_handler)
                .delete(modules_delete_handler),
        )
        .route("/{id}/lessons", get(modules_lessons_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

pub(super) fn require_staff(user: &AuthenticatedUser, r#type: ResourceType) -> WebResult<()> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(WebError::resource_forbidden(r#type))
    }
}

/// Loads module `id` for modification: teachers may only touch modules they created.
pub(super) async fn editable_module(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Module> {
    require_staff(user, Module::get_resource_type())?;

    let found = Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;

    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::resource_access_error(Module::get_resource_type(), e))?;

    Ok(found)
}

fn validate(payload: &ModuleCreate) -> WebResult<()> {
    if payload.title.trim().is_empty() {
        return Err(WebError::user_bad_request("Module title cannot be empty."));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/",
    description = "List ALL modules objects with lessons. See success response body",
    responses(
        (status = 200, description = "Successfully collected modules", body = Vec<ModuleWithLessons>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rows = ModuleWithLessonsRow::fetch_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    let modules = ModuleWithLessons::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(modules)))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module with its lessons", body = ModuleWithLessons),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let row = ModuleWithLessonsRow::fetch_one(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;

    let module = ModuleWithLessons::try_from(row)
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e.into()))?;

    Ok((StatusCode::OK, Json(module)))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}/lessons",
    description = "Full lessons of a module ordered by `order_index`",
    params(
        ("id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Lessons of the module", body = Vec<Lesson>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_lessons_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let exists = Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .is_some();

    if !exists {
        return Err(WebError::resource_not_found(Module::get_resource_type()));
    }

    let lessons = Lesson::all_by_module(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(lessons)))
}

#[utoipa::path(
    post,
    path = "/api/v1/modules/",
    request_body = ModuleCreate,
    responses(
        (status = 200, description = "Module created", body = Module),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only teachers and admins manage modules", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ModuleCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_staff(user, Module::get_resource_type())?;
    validate(&payload)?;

    let created = Module::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::ModuleCreated, created.title())
        .await;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/modules/{id}",
    request_body = ModuleCreate,
    params(
        ("id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate(&payload)?;
    let found = editable_module(&state, user, id).await?;

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::ModuleUpdated, updated.title())
        .await;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/modules/{id}",
    description = "Deletes a module together with its lessons, progress and quiz submissions",
    params(
        ("id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module deleted"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "modules",
    security(
        ("cookie" = [])
    )
)]
async fn modules_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = editable_module(&state, user, id).await?;
    let title = found.title().to_string();

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::ModuleDeleted, title).await;
    Ok(StatusCode::OK)
}
