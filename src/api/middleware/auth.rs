use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::extractors::{auth::authenticate_request, meta::request_meta};
use crate::error::AppError;
use crate::state::AppState;

/// Rejects the request unless it carries a valid session for an active staff
/// member, and attaches that member as `CurrentUser`.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let meta = request_meta(req.headers(), req.extensions(), req.uri());
    let user = authenticate_request(&state, req.headers(), req.extensions(), &meta).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
