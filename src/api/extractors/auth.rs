use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, Extensions, HeaderMap},
};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::Span;

use crate::domain::models::security::{RequestMeta, SecurityEvent, SecurityEventKind};
use crate::domain::models::staff::StaffProfile;
use crate::domain::services::auth_service::ACCOUNT_DEACTIVATED;
use crate::domain::services::token_service::{TokenError, SESSION_COOKIE};
use crate::error::AppError;
use crate::state::AppState;
use super::meta::request_meta;

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to get access.";
pub const USER_GONE: &str = "The user belonging to this token no longer exists.";

/// The authenticated staff member. Attached to the request by the
/// `authenticate` middleware; resolves itself when used on an unguarded route.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub StaffProfile);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let meta = request_meta(&parts.headers, &parts.extensions, &parts.uri);
        let user = authenticate_request(state, &parts.headers, &parts.extensions, &meta).await?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Cookie first, then `Authorization: Bearer`.
fn session_token(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let from_cookie = extensions
        .get::<Cookies>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE))
        .map(|cookie| cookie.value().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

pub async fn authenticate_request(
    state: &AppState,
    headers: &HeaderMap,
    extensions: &Extensions,
    meta: &RequestMeta,
) -> Result<CurrentUser, AppError> {
    let Some(token) = session_token(headers, extensions) else {
        SecurityEvent::new(SecurityEventKind::MissingToken, meta).record();
        return Err(AppError::Unauthorized(NOT_LOGGED_IN.into()));
    };

    let claims = state.token_service.verify(&token).map_err(|e| {
        let kind = match e {
            TokenError::Expired => SecurityEventKind::ExpiredToken,
            _ => SecurityEventKind::InvalidToken,
        };
        SecurityEvent::new(kind, meta).context(json!({ "reason": e.to_string() })).record();
        AppError::Token(e)
    })?;

    let Some(user) = state.staff_repo.find_profile(&claims.sub).await? else {
        SecurityEvent::new(SecurityEventKind::UserNotFound, meta).user(&claims.sub).record();
        return Err(AppError::Unauthorized(USER_GONE.into()));
    };

    if !user.is_active {
        SecurityEvent::new(SecurityEventKind::AccountDeactivated, meta).user(&user.id).record();
        return Err(AppError::Unauthorized(ACCOUNT_DEACTIVATED.into()));
    }

    let span = Span::current();
    span.record("user_id", user.id.as_str());
    if let Some(company_id) = &user.company_id {
        span.record("company_id", company_id.as_str());
    }

    Ok(CurrentUser(user))
}
