use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, Page, ResourceTyped,
        entity::{LessonProgress, LessonStatusRow, Module, UserEntity},
        progress::group_by_student,
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::progress::{StudentProgressResponse, StudentProgressSummary},
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, modules::require_staff},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(progress_get_handler))
        .route("/students", get(progress_students_handler))
        .route("/students/{id}", get(progress_student_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn student_progress(
    state: &AppState,
    actor: &AuthenticatedUser,
    student_id: Uuid,
) -> WebResult<StudentProgressResponse> {
    let (student, modules, rows) = tokio::try_join!(
        UserEntity::find_by_id(state.pool(), actor, student_id),
        Module::headers(state.pool()),
        LessonStatusRow::for_student(state.pool(), student_id),
    )
    .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    let student = student
        .filter(|s| s.role() == UserRole::Student)
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let lessons: Vec<_> = rows.into_iter().map(|r| r.into_status().1).collect();
    Ok(StudentProgressResponse::new(&student, &modules, &lessons))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/",
    description = "Get current student's progress, overall and per module",
    responses(
        (status = 200, description = "Progress found", body = StudentProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Only students have progress", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let res = student_progress(&state, user, user.user_id()).await?;
    Ok((StatusCode::OK, Json(res)))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/students",
    description = "Progress summary of every student",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Summaries", body = Page<StudentProgressSummary>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only teachers and admins", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_students_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_staff(user, LessonProgress::get_resource_type())?;

    let students =
        UserEntity::list_by_role(state.pool(), user, UserRole::Student, page.limit, page.offset)
            .await
            .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    let ids: Vec<Uuid> = students.items.iter().map(UserEntity::id).collect();
    let rows = LessonStatusRow::for_students(state.pool(), &ids)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    let by_student = group_by_student(rows.into_iter().map(LessonStatusRow::into_status));
    let items = students
        .items
        .iter()
        .map(|s| {
            let lessons = by_student.get(&s.id()).map(Vec::as_slice).unwrap_or_default();
            StudentProgressSummary::new(s, lessons)
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(Page::new(items, students.total, students.limit, students.offset)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/students/{id}",
    params(
        ("id" = Uuid, Path, description = "ID of the student")
    ),
    responses(
        (status = 200, description = "Progress found", body = StudentProgressResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Students only see their own progress", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_student_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_staff() && user.user_id() != id {
        return Err(WebError::resource_forbidden(
            LessonProgress::get_resource_type(),
        ));
    }

    let res = student_progress(&state, user, id).await?;
    Ok((StatusCode::OK, Json(res)))
}
