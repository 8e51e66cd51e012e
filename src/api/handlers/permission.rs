use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::dtos::requests::ReplacePermissionsRequest;
use crate::api::dtos::responses::ApiResponse;
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta};
use crate::domain::models::permission::{Action, Module, PermissionRecord};
use crate::domain::models::staff::Role;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct RolePermissions {
    pub role: Role,
    pub permissions: Vec<PermissionRecord>,
}

pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Permission, Action::Read).await?;
    Ok(Json(ApiResponse::ok(state.permission_service.catalog().await?)))
}

pub async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    state.permission_service.ensure(&user, &meta, Module::Permission, Action::Read).await?;

    let permissions = state.permission_service.effective(role).await?;
    Ok(Json(ApiResponse::ok(RolePermissions { role, permissions })))
}

pub async fn replace_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
    Json(payload): Json<ReplacePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let permissions = state.permission_service.replace(role, &payload.permissions).await?;
    Ok(Json(ApiResponse::ok(RolePermissions { role, permissions })))
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.to_uppercase()
        .parse()
        .map_err(|e: crate::domain::models::staff::UnknownRole| AppError::Validation(e.to_string()))
}
