use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Router, extract::State, middleware, response::IntoResponse, routing::get};
use uuid::Uuid;

use crate::error::log_warn;
use crate::model::entity::{
    ActivityAction, ActivityLogEntry, Lesson, LessonCreate, LessonProgress, LessonWithStatusRow,
    Notification, NotificationKind, QuizSubmission, UserEntity, validate_score,
};
use crate::model::{CrudRepository, ResourceType, ResourceTyped, check_access};
use crate::storage::{self, Bucket};
use crate::web::dto::lessons::LessonResponse;
use crate::web::dto::submissions::QuizSubmitBody;
use crate::web::dto::uploads::{UploadForm, UploadedFile};
use crate::web::error::ErrorResponse;
use crate::web::routes::MULTIPART_OVERHEAD;
use crate::web::routes::modules::{editable_module, require_staff};
use crate::web::{
    AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult, middlewares,
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let upload_limit = state.store().max_object_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", post(lessons_create_handler))
        .route(
            "/{id}",
            get(lessons_get_handler)
                .put(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .route("/{id}/done", post(lessons_mark_done_handler))
        .route("/{id}/next", get(lessons_next_handler))
        .route("/{id}/quiz", put(lessons_submit_quiz_handler))
        .route(
            "/{id}/material",
            post(lessons_material_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_lesson(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))
}

/// Lesson `id` for modification, the caller must own its module unless admin.
async fn editable_lesson(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    require_staff(user, Lesson::get_resource_type())?;
    let found = find_lesson(state, user, id).await?;

    check_access(state.pool(), user, &found, Some(user.user_id()))
        .await
        .map_err(|e| WebError::resource_access_error(Lesson::get_resource_type(), e))?;

    Ok(found)
}

fn validate(payload: &LessonCreate) -> WebResult<()> {
    if !payload.is_valid() {
        return Err(WebError::user_bad_request(
            "Lesson title cannot be empty and quiz total items must be greater than zero.",
        ));
    }
    Ok(())
}

fn require_student(user: &AuthenticatedUser, r#type: ResourceType) -> WebResult<()> {
    if user.is_student() {
        Ok(())
    } else {
        Err(WebError::resource_forbidden(r#type))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Fetch comprehensive info about lesson including its content",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to get")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (row, submission) = tokio::try_join!(
        LessonWithStatusRow::find_by_id(state.pool(), user, id),
        QuizSubmission::find_for(state.pool(), user.user_id(), id),
    )
    .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    let row = row.ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    Ok((StatusCode::OK, Json(LessonResponse::new(row, submission))))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    request_body = LessonCreate,
    responses(
        (status = 200, description = "Lesson created", body = Lesson),
        (status = 400, description = "Title is empty or quiz items are not positive", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_create_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_staff(user, Lesson::get_resource_type())?;
    validate(&payload)?;
    editable_module(&state, user, payload.module_id).await?;

    let created = Lesson::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::LessonCreated, created.title())
        .await;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}",
    request_body = LessonCreate,
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to update")
    ),
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Title is empty or quiz items are not positive", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Lesson or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_update_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate(&payload)?;
    let found = editable_lesson(&state, user, id).await?;

    if found.module_id() != payload.module_id {
        // moving a lesson needs write access to the target module too
        editable_module(&state, user, payload.module_id).await?;
    }

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::LessonUpdated, updated.title())
        .await;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{lesson_id}",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to delete")
    ),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_delete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = editable_lesson(&state, user, id).await?;
    let title = found.title().to_string();

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::LessonDeleted, title).await;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/done",
    description = "Mark lesson as done. Marking twice keeps the first completion",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to mark")
    ),
    responses(
        (status = 200, description = "Lesson marked", body = LessonProgress),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only students track progress", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_mark_done_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_student(user, LessonProgress::get_resource_type())?;
    let lesson = find_lesson(&state, user, id).await?;

    let progress = LessonProgress::mark_done(state.pool(), user.user_id(), lesson.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    ActivityLogEntry::record(
        state.pool(),
        user,
        ActivityAction::LessonCompleted,
        lesson.title(),
    )
    .await;

    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}/next",
    description = "Next lesson of the same module the caller has not completed yet",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the current lesson")
    ),
    responses(
        (status = 200, description = "Next lesson", body = LessonResponse),
        (status = 404, description = "Lesson not found or nothing left in this module", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_next_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    find_lesson(&state, user, id).await?;

    let next = LessonWithStatusRow::find_next_uncompleted(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(next))))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}/quiz",
    description = "Reports the caller's quiz score, the submission waits for a teacher review",
    request_body = QuizSubmitBody,
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Submission stored as pending", body = QuizSubmission),
        (status = 400, description = "No quiz, negative score or score above total items", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Only students submit quizzes", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Quiz was approved already", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_submit_quiz_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<QuizSubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    require_student(user, QuizSubmission::get_resource_type())?;
    let lesson = find_lesson(&state, user, id).await?;

    let total_items = validate_score(payload.score, lesson.quiz_total_items())
        .map_err(|e| WebError::user_bad_request(e.to_string()))?;

    let submission = QuizSubmission::submit(
        state.pool(),
        user.user_id(),
        lesson.id(),
        payload.score,
        total_items,
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(QuizSubmission::get_resource_type(), e))?
    .ok_or_else(|| {
        WebError::resource_conflict(
            QuizSubmission::get_resource_type(),
            "quiz was approved already.",
        )
    })?;

    notify_reviewers(&state, user, &lesson, &submission).await;

    ActivityLogEntry::record(
        state.pool(),
        user,
        ActivityAction::QuizSubmitted,
        format!("{}: {}/{}", lesson.title(), submission.score(), submission.total_items()),
    )
    .await;

    Ok((StatusCode::OK, Json(submission)))
}

/// Tells every teacher and admin about a new submission. Failures are only logged.
async fn notify_reviewers(
    state: &AppState,
    user: &AuthenticatedUser,
    lesson: &Lesson,
    submission: &QuizSubmission,
) {
    let result = async {
        let student = UserEntity::find_by_id(state.pool(), user, user.user_id()).await?;
        let name = student
            .as_ref()
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| String::from("A student"));

        let message = format!(
            "{} submitted a quiz score of {}/{} for \"{}\".",
            name,
            submission.score(),
            submission.total_items(),
            lesson.title()
        );
        let reviewers =
            UserEntity::ids_by_roles(state.pool(), &[UserRole::Teacher, UserRole::Admin]).await?;
        Notification::notify_many(
            state.pool(),
            &reviewers,
            NotificationKind::QuizSubmitted,
            &message,
        )
        .await
    }
    .await;

    if let Err(e) = result {
        log_warn(&e);
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/material",
    description = "Uploads a file into the `lesson-materials` bucket and attaches it to the lesson",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Material stored", body = Lesson),
        (status = 400, description = "File is empty or too large", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your module", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_material_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    multipart: Multipart,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = editable_lesson(&state, user, id).await?;
    let file = UploadedFile::from_multipart(multipart).await?;
    let previous = found.material_url().map(str::to_string);

    let stored = storage::upload(
        state.store(),
        Bucket::LessonMaterials,
        user.user_id(),
        &file.file_name,
        &file.content_type,
        &file.bytes,
    )
    .await
    .map_err(WebError::storage_error)?;

    let updated = match found.set_material_url(state.pool(), stored.url.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Err(e) = state.store().delete(stored.bucket, &stored.key).await {
                log_warn(&e);
            }
            return Err(WebError::resource_fetch_error(Lesson::get_resource_type(), e));
        }
    };
    storage::discard_replaced(state.store(), Bucket::LessonMaterials, previous.as_deref()).await;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::FileUploaded, &stored.url).await;
    Ok((StatusCode::OK, Json(updated)))
}
