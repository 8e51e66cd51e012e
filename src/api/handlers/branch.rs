use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateBranchRequest, UpdateBranchRequest};
use crate::api::dtos::responses::{ApiResponse, MessageResponse};
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta};
use crate::api::middleware::gates::ScopedCompany;
use crate::domain::models::branch::Branch;
use crate::domain::models::permission::{Action, Module};
use crate::error::AppError;
use crate::state::AppState;

/// The branch lands in the company the gate authorized, never a different one
/// named elsewhere in the request.
pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Extension(ScopedCompany(scoped)): Extension<ScopedCompany>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Branch, Action::Create).await?;
    payload.validate()?;

    let company_id = scoped.ok_or_else(|| AppError::Validation("Company ID is required".into()))?;
    if state.company_repo.find_by_id(&company_id).await?.is_none() {
        return Err(AppError::NotFound("Company not found".into()));
    }

    let branch = Branch::new(
        company_id,
        payload.name.trim().to_string(),
        payload.city,
        payload.address,
        payload.mobile,
    );
    let created = state.branch_repo.create(&branch).await?;

    info!(branch_id = %created.id, company_id = %created.company_id, "Created branch");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn list_branches(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(company_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Branch, Action::Read).await?;
    let branches = state.branch_repo.list_by_company(&company_id).await?;
    Ok(Json(ApiResponse::ok(branches)))
}

pub async fn get_branch(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(branch_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Branch, Action::Read).await?;
    Ok(Json(ApiResponse::ok(load_branch(&state, &branch_id).await?)))
}

pub async fn update_branch(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(branch_id): Path<String>,
    Json(payload): Json<UpdateBranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Branch, Action::Update).await?;
    let mut branch = load_branch(&state, &branch_id).await?;

    if let Some(name) = payload.name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::Validation("Branch name cannot be empty".into()));
        }
        branch.name = name;
    }
    if payload.city.is_some() {
        branch.city = payload.city;
    }
    if payload.address.is_some() {
        branch.address = payload.address;
    }
    if payload.mobile.is_some() {
        branch.mobile = payload.mobile;
    }
    if let Some(is_active) = payload.is_active {
        branch.is_active = is_active;
    }
    branch.updated_at = Utc::now();

    let updated = state.branch_repo.update(&branch).await?;
    info!(branch_id = %updated.id, "Updated branch");
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn delete_branch(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(branch_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Branch, Action::Delete).await?;
    let branch = load_branch(&state, &branch_id).await?;
    state.branch_repo.delete(&branch.id).await?;

    info!(branch_id = %branch.id, "Deleted branch");
    Ok(Json(MessageResponse::new("Branch deleted")))
}

async fn load_branch(state: &AppState, branch_id: &str) -> Result<Branch, AppError> {
    state
        .branch_repo
        .find_by_id(branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".into()))
}
