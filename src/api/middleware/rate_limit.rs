use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::extractors::{auth::CurrentUser, meta::request_meta};
use crate::domain::services::rate_limiter::SensitiveOpLimiter;
use crate::error::AppError;

/// Counts every call against the (client IP, user) pair, whatever its outcome.
pub async fn limit_sensitive_ops(
    State(limiter): State<Arc<SensitiveOpLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let meta = request_meta(req.headers(), req.extensions(), req.uri());
    let user_id = req.extensions().get::<CurrentUser>().map(|u| u.0.id.clone());

    limiter.check(&meta, user_id.as_deref())?;
    Ok(next.run(req).await)
}
