//! Role, company and branch scope checks, layered per route after `authenticate`.

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Path, Query, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::extractors::{
    auth::{CurrentUser, NOT_LOGGED_IN},
    meta::request_meta,
};
use crate::domain::models::staff::Role;
use crate::domain::services::access::{branch_target, check_branch, check_company, check_roles, Denial};
use crate::error::AppError;
use crate::state::AppState;

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Copy)]
pub struct RoleGate(pub &'static [Role]);

#[derive(Clone, Copy)]
pub struct CompanyGate {
    pub allow_superadmin: bool,
}

impl Default for CompanyGate {
    fn default() -> Self {
        Self { allow_superadmin: true }
    }
}

/// The company id `require_company` checked the caller against. Handlers that
/// take the company from the body build from this value.
#[derive(Clone, Debug)]
pub struct ScopedCompany(pub Option<String>);

#[derive(Clone)]
pub struct BranchGate {
    pub app: Arc<AppState>,
    pub allow_superadmin: bool,
    pub allow_company_admin: bool,
}

impl BranchGate {
    pub fn new(app: Arc<AppState>) -> Self {
        Self {
            app,
            allow_superadmin: true,
            allow_company_admin: true,
        }
    }
}

pub async fn require_roles(State(gate): State<RoleGate>, req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current_user(&req)?;

    check_roles(&user, gate.0).map_err(|denial| deny(denial, &req, &user.id))?;
    Ok(next.run(req).await)
}

pub async fn require_company(State(gate): State<CompanyGate>, req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current_user(&req)?;
    let (mut req, target) = scope_target(req, "company_id").await?;

    check_company(&user, target.as_deref(), gate.allow_superadmin).map_err(|denial| deny(denial, &req, &user.id))?;
    req.extensions_mut().insert(ScopedCompany(target));
    Ok(next.run(req).await)
}

pub async fn require_branch(State(gate): State<BranchGate>, req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current_user(&req)?;
    let (req, target) = scope_target(req, "branch_id").await?;

    let branch_id = branch_target(&user, target.as_deref(), gate.allow_superadmin)
        .map_err(|denial| deny(denial, &req, &user.id))?;

    if let Some(branch_id) = branch_id {
        let owner = gate.app.branch_repo.find_company_id(&branch_id).await?;
        check_branch(&user, &branch_id, owner.as_deref(), gate.allow_company_admin)
            .map_err(|denial| deny(denial, &req, &user.id))?;
    }

    Ok(next.run(req).await)
}

fn current_user(req: &Request) -> Result<CurrentUser, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(NOT_LOGGED_IN.into()))
}

fn deny(denial: Denial, req: &Request, user_id: &str) -> AppError {
    let meta = request_meta(req.headers(), req.extensions(), req.uri());
    denial.into_error(&meta, user_id)
}

/// Looks for `key` in the path parameters, the query string and a JSON body,
/// in that order. All places that name the key must agree. The body is
/// buffered and handed back intact for the handler.
async fn scope_target(req: Request, key: &str) -> Result<(Request, Option<String>), AppError> {
    let (mut parts, body) = req.into_parts();
    let mut found: Vec<String> = Vec::new();

    if let Ok(Path(params)) = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
        found.extend(non_empty(params.get(key).map(String::as_str)));
    }

    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
        found.extend(non_empty(params.get(key).map(String::as_str)));
    }

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let body = if is_json {
        let bytes = to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|_| AppError::Validation("Request body is too large or could not be read".into()))?;
        let from_body = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|v| non_empty(v.get(key).and_then(Value::as_str)));
        found.extend(from_body);
        Body::from(bytes)
    } else {
        body
    };

    let target = found.first().cloned();
    if found.iter().any(|id| Some(id) != target.as_ref()) {
        return Err(AppError::Validation(format!("Conflicting values for {} in the request", key)));
    }

    Ok((Request::from_parts(parts, body), target))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
