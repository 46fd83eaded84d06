use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    Config, auth,
    model::{ResourceTyped, entity::{ActiveSessionRow, Session}},
    web::{
        AppState, RequestContext, UserRole,
        context::AuthenticatedUser,
        error::{WebError, WebResult},
        state::CachedSession,
    },
};

pub static AUTH_TOKEN: &str = "SID";

/// Resolves the `SID` cookie into a [`RequestContext`]. Missing, expired or
/// revoked sessions produce an anonymous context, a token that cannot be
/// decoded is rejected.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let ctx = match cookies.get(AUTH_TOKEN) {
        Some(token) => resolve_context(&state, token.value()).await?,
        None => RequestContext::new(None),
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

async fn resolve_context(state: &AppState, token: &str) -> WebResult<RequestContext> {
    let key = Config::get_or_init(false).await.app().jwt();
    let claims = match auth::process_token(token, key) {
        Ok(data) => data.claims,
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            tracing::debug!("expired token, continuing anonymously");
            return Ok(RequestContext::new(None));
        }
        Err(e) => return Err(WebError::auth_cookie_invalid(AUTH_TOKEN, e.into())),
    };

    let user_id = claims
        .user_id()
        .map_err(|e| WebError::auth_cookie_invalid(AUTH_TOKEN, e))?;
    let session_id = claims
        .session_id()
        .map_err(|e| WebError::auth_cookie_invalid(AUTH_TOKEN, e))?;

    match load_session(state, session_id).await? {
        Some(session) if session.user_id == user_id => {
            let user = AuthenticatedUser::new(user_id, session.role).with_session(session_id);
            Ok(RequestContext::new(Some(user)))
        }
        _ => Ok(RequestContext::new(None)),
    }
}

async fn load_session(state: &AppState, session_id: Uuid) -> WebResult<Option<CachedSession>> {
    if let Some(cached) = state.sessions().get(&session_id) {
        if !cached.is_expired() {
            return Ok(Some(cached));
        }
        state.sessions().invalidate(&session_id);
    }

    let row = ActiveSessionRow::find(state.pool(), session_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?;

    Ok(row.map(|row| {
        let session = CachedSession {
            user_id: row.user_id,
            role: UserRole::from(row.role.as_str()),
            expires_at: row.expires_at,
        };
        state.sessions().insert(session_id, session.clone());
        session
    }))
}
