use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ErrorReport;
use crate::state::AppState;

const BODY_LIMIT: usize = 64 * 1024;

/// Gives every error response the same JSON shape: the development shape when
/// `APP_ENV=development`, and rewrites framework rejections (bad JSON, unknown
/// routes, wrong methods) that never went through `AppError`.
pub async fn normalize_errors(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let environment = state.config.environment;
    let (mut parts, body) = response.into_parts();

    let report = match parts.extensions.get::<ErrorReport>().cloned() {
        Some(_) if environment.is_production() => return Response::from_parts(parts, body),
        Some(report) => report,
        None => {
            let bytes = to_bytes(body, BODY_LIMIT).await.unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = match (text.is_empty(), status) {
                (false, _) => text,
                (true, StatusCode::NOT_FOUND) => format!("Can't find {} on this server.", path),
                (true, _) => status.canonical_reason().unwrap_or("Request failed").to_string(),
            };
            warn!(status = status.as_u16(), %message, "request rejected");

            ErrorReport {
                status,
                stack: message.clone(),
                message,
                operational: status.is_client_error(),
            }
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = Body::from(report.body(environment).to_string());
    parts.extensions.insert(report);

    Response::from_parts(parts, body)
}
