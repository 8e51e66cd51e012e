use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateCompanyRequest, PageQuery, UpdateCompanyRequest};
use crate::api::dtos::responses::{ApiResponse, Paginated};
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta};
use crate::domain::models::company::Company;
use crate::domain::models::permission::{Action, Module};
use crate::domain::models::pagination::PageRequest;
use crate::domain::models::staff::Role;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Company, Action::Create).await?;
    payload.validate()?;

    let company = Company::new(
        payload.name.trim().to_string(),
        payload.email.map(|e| e.trim().to_lowercase()),
        payload.mobile,
        payload.address,
    );
    let created = state.company_repo.create(&company).await?;

    info!(company_id = %created.id, "Created company");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Company, Action::Read).await?;
    let page = state
        .company_repo
        .list(query.search.as_deref(), PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Json(Paginated::from(page)))
}

pub async fn get_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(company_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Company, Action::Read).await?;
    let company = state
        .company_repo
        .find_by_id(&company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))?;
    Ok(Json(ApiResponse::ok(company)))
}

pub async fn update_company(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(company_id): Path<String>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Company, Action::Update).await?;
    let mut company = state
        .company_repo
        .find_by_id(&company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))?;

    if let Some(name) = payload.name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::Validation("Company name cannot be empty".into()));
        }
        company.name = name;
    }
    if let Some(email) = payload.email {
        company.email = Some(email.trim().to_lowercase()).filter(|e| !e.is_empty());
    }
    if payload.mobile.is_some() {
        company.mobile = payload.mobile;
    }
    if payload.address.is_some() {
        company.address = payload.address;
    }
    if let Some(is_active) = payload.is_active {
        if user.role != Role::SuperAdmin {
            return Err(AppError::Forbidden("Only platform administrators can change company status".into()));
        }
        company.is_active = is_active;
    }
    company.updated_at = Utc::now();

    let updated = state.company_repo.update(&company).await?;
    info!(company_id = %updated.id, "Updated company");
    Ok(Json(ApiResponse::ok(updated)))
}
