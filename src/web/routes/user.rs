use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, UserClaims, hash_password, verify_password},
    error::log_warn,
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{
            ActivityAction, ActivityLogEntry, Notification, NotificationKind, Session, UserEntity,
            UserEntityCreateUpdate,
        },
    },
    storage::{self, Bucket},
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::{
            account::{
                SessionResponse, SigninBody, SignupBody, UserPageQuery, UserRoleBody,
                UserUpdateBody,
            },
            uploads::{UploadForm, UploadedFile},
        },
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        routes::MULTIPART_OVERHEAD,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let upload_limit = state.store().max_object_bytes() + MULTIPART_OVERHEAD;

    let protected = Router::new()
        .route("/signout", post(user_signout_handler))
        .route("/verify", get(user_verify_handler))
        .route("/session", get(user_session_handler))
        .route("/me", get(user_me_handler))
        .route("/page", get(user_list_handler))
        .route(
            "/avatar",
            post(user_avatar_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/{id}",
            put(user_update_handler).delete(user_delete_handler),
        )
        .route("/{id}/role", put(user_role_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/signup", post(user_signup_handler))
        .route("/signin", post(user_signin_handler))
        .merge(protected)
        .with_state(state)
}

/// Opens a session row for `user` and hands its token to the client as the `SID` cookie.
async fn start_session(state: &AppState, cookies: &Cookies, user: &UserEntity) -> WebResult<Session> {
    let config = Config::get_or_init(false).await;
    let session = Session::open(state.pool(), user.id(), config.app().session_ttl())
        .await
        .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?;

    let claims = UserClaims {
        sub: user.id().to_string(),
        sid: session.id().to_string(),
        exp: session.expires_at().timestamp(),
    };
    let token = auth::generate_token(claims, config.app().jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);

    Ok(session)
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signup",
    request_body = SignupBody,
    description = "Creates a new student account and signs it in",
    responses(
        (status = 200, description = "User created successfully", body = UserEntity),
        (status = 400, description = "Username or password rejected", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account"
)]
async fn user_signup_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SignupBody>,
) -> WebResult<impl IntoResponse> {
    if let Some(problem) = payload.problem() {
        return Err(WebError::user_bad_request(problem));
    }

    let admin = AuthenticatedUser::admin();
    let username = payload.username.trim().to_string();
    let found = UserEntity::find_by_username(state.pool(), &admin, &username)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let payload = UserEntityCreateUpdate {
        username,
        full_name: payload.full_name.trim().to_string(),
        password_hash: hash,
        role: UserRole::Student,
    };

    let created = UserEntity::create(state.pool(), &admin, payload)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                WebError::registration_conflict()
            } else {
                WebError::resource_fetch_error(UserEntity::get_resource_type(), e)
            }
        })?;

    start_session(&state, &cookies, &created).await?;

    let actor = AuthenticatedUser::new(created.id(), created.role());
    ActivityLogEntry::record(state.pool(), &actor, ActivityAction::Signup, created.username())
        .await;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signin",
    description = "Authorizes user in the system",
    request_body = SigninBody,
    responses(
        (status = 200, description = "User signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn user_signin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SigninBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_username(state.pool(), &admin, payload.username.trim())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    start_session(&state, &cookies, &found).await?;

    let actor = AuthenticatedUser::new(found.id(), found.role());
    ActivityLogEntry::record(state.pool(), &actor, ActivityAction::Signin, "").await;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signout",
    description = "Revokes the current session and clears the cookie",
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_signout_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    if let Some(session_id) = user.session_id() {
        state.sessions().invalidate(&session_id);
        // the cookie is dropped either way
        if let Err(e) = Session::revoke(state.pool(), session_id).await {
            log_warn(&e);
        }
    }

    let mut cookie = Cookie::from(AUTH_TOKEN);
    cookie.set_path("/");
    cookies.remove(cookie);

    ActivityLogEntry::record(state.pool(), user, ActivityAction::Signout, "").await;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/verify",
    description = "Cheap check whether the cookie still carries a live session",
    responses(
        (status = 200, description = "Signed in"),
        (status = 401, description = "No live session"),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_verify_handler(ctx: RequestContext) -> WebResult<impl IntoResponse> {
    let user = ctx.maybe_user();

    if user.is_none() {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    Ok(StatusCode::OK)
}

async fn current_user(state: &AppState, user: &AuthenticatedUser) -> WebResult<UserEntity> {
    UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_required)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/session",
    description = "Current session with its expiry time, clients poll it to detect expiry",
    responses(
        (status = 200, description = "Session is live", body = SessionResponse),
        (status = 401, description = "No live session", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_session_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let session_id = user.session_id().ok_or_else(WebError::auth_required)?;

    let session = Session::find_by_id(state.pool(), session_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?
        .ok_or_else(WebError::auth_required)?;

    let found = current_user(&state, user).await?;

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            user: found,
            expires_at: *session.expires_at(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Current user", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = current_user(&state, user).await?;
    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    params(UserPageQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_list_handler(
    ctx: RequestContext,
    Query(page): Query<UserPageQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(UserEntity::get_resource_type()));
    }

    let users = match page.role {
        Some(role) => {
            UserEntity::list_by_role(state.pool(), user, role, page.limit, page.offset).await
        }
        None => UserEntity::page(state.pool(), user, page.limit, page.offset).await,
    }
    .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}

/// Loads user `id` and checks that the caller is that user or an admin.
async fn owned_user(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<UserEntity> {
    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(UserEntity::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}",
    request_body = UserUpdateBody,
    params(
        ("id" = Uuid, Path, description = "ID of the user to update")
    ),
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 400, description = "Username is empty", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You doesn't have enough permissions to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username is taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(WebError::user_bad_request("Username cannot be empty."));
    }

    let found = owned_user(&state, user, id).await?;

    let conflict = UserEntity::find_by_username(state.pool(), user, &username)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if conflict.is_some_and(|other| other.id() != found.id()) {
        return Err(WebError::registration_conflict());
    }

    let payload = UserEntityCreateUpdate {
        username,
        full_name: payload.full_name.trim().to_string(),
        password_hash: String::new(), // not in use
        role: found.role(),
    };

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    ActivityLogEntry::record(
        state.pool(),
        user,
        ActivityAction::UserUpdated,
        updated.username(),
    )
    .await;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{id}",
    description = "Deletes specified user",
    params(
        ("id" = Uuid, Path, description = "ID of the user to delete")
    ),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = owned_user(&state, user, id).await?;
    let username = found.username().to_string();

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    // sessions go with the row, cached copies have to follow
    state.forget_user_sessions(id);

    ActivityLogEntry::record(state.pool(), user, ActivityAction::UserDeleted, username).await;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}/role",
    request_body = UserRoleBody,
    description = "Changes the role of a user",
    params(
        ("id" = Uuid, Path, description = "ID of the user")
    ),
    responses(
        (status = 200, description = "Role changed", body = UserEntity),
        (status = 400, description = "Admins cannot change their own role", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserRoleBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(UserEntity::get_resource_type()));
    }
    if user.user_id() == id {
        return Err(WebError::user_bad_request("You cannot change your own role."));
    }

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let previous = found.role();
    let updated = found
        .set_role(state.pool(), payload.role)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    state.forget_user_sessions(id);

    if previous != payload.role {
        let message = format!("Your role was changed from {} to {}.", previous, payload.role);
        if let Err(e) =
            Notification::notify(state.pool(), id, NotificationKind::RoleChanged, &message).await
        {
            log_warn(&e);
        }
    }

    ActivityLogEntry::record(
        state.pool(),
        user,
        ActivityAction::RoleChanged,
        format!("{}: {} -> {}", updated.username(), previous, payload.role),
    )
    .await;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/avatar",
    description = "Uploads an image into the `avatars` bucket and makes it the caller's avatar",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = UserEntity),
        (status = 400, description = "File is empty, too large, or not an image", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_avatar_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = current_user(&state, user).await?;
    let file = UploadedFile::from_multipart(multipart).await?;
    let previous = found.avatar_url().map(str::to_string);

    let stored = storage::upload(
        state.store(),
        Bucket::Avatars,
        found.id(),
        &file.file_name,
        &file.content_type,
        &file.bytes,
    )
    .await
    .map_err(WebError::storage_error)?;

    let updated = match found.set_avatar_url(state.pool(), stored.url.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Err(e) = state.store().delete(stored.bucket, &stored.key).await {
                log_warn(&e);
            }
            return Err(WebError::resource_fetch_error(UserEntity::get_resource_type(), e));
        }
    };
    storage::discard_replaced(state.store(), Bucket::Avatars, previous.as_deref()).await;

    ActivityLogEntry::record(state.pool(), user, ActivityAction::FileUploaded, &stored.url).await;
    Ok((StatusCode::OK, Json(updated)))
}
