use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::domain::services::access::OwnershipPolicy;
use crate::error::AppError;
use crate::state::AppState;
use super::auth::CurrentUser;
use super::meta::request_meta;

/// Resolves the caller's ownership tier. Handlers call `enforce` on the policy
/// once the resource is loaded, and use it to narrow list queries.
pub struct Ownership(pub OwnershipPolicy);

impl FromRequestParts<Arc<AppState>> for Ownership {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let meta = request_meta(&parts.headers, &parts.extensions, &parts.uri);

        OwnershipPolicy::for_user(&user)
            .map(Ownership)
            .map_err(|denial| denial.into_error(&meta, &user.id))
    }
}
