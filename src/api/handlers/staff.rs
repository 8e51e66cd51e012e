use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateStaffRequest, StaffListQuery, StaffStatusRequest, UpdateStaffRequest};
use crate::api::dtos::responses::{ApiResponse, MessageResponse, Paginated};
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta};
use crate::domain::models::pagination::PageRequest;
use crate::domain::models::permission::{Action, Module};
use crate::domain::models::staff::{NewStaff, Role, Staff, StaffFilter, StaffProfile};
use crate::domain::services::auth_service::{hash_password, validate_password};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(creator): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(company_id): Path<String>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&creator, &meta, Module::Staff, Action::Create).await?;
    payload.validate()?;
    validate_password(&payload.password)?;
    ensure_assignable(&creator, payload.role)?;

    if state.company_repo.find_by_id(&company_id).await?.is_none() {
        return Err(AppError::NotFound("Company not found".into()));
    }
    let branch_id = resolve_branch(&state, &company_id, payload.role, payload.branch_id).await?;

    let staff = Staff::new(NewStaff {
        company_id: Some(company_id),
        branch_id,
        name: payload.name.trim().to_string(),
        email: payload.email,
        mobile: payload.mobile,
        password_hash: hash_password(&payload.password)?,
        role: payload.role,
        is_verified: true,
    });
    let created = state.staff_repo.create(&staff).await?;

    info!(staff_id = %created.id, role = %created.role, created_by = %creator.id, "Created staff member");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(load_profile(&state, &created.id).await?))))
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(company_id): Path<String>,
    Query(query): Query<StaffListQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Staff, Action::Read).await?;
    let filter = StaffFilter {
        company_id,
        branch_id: query.branch_id.filter(|b| !b.is_empty()),
        role: query.role,
        search: query.search.filter(|s| !s.trim().is_empty()),
        sort_by: query.sort_by,
        order: query.order,
    };
    let page = state
        .staff_repo
        .list(&filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(Json(Paginated::from(page)))
}

pub async fn get_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path((company_id, staff_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Staff, Action::Read).await?;
    let staff = find_in_company(&state, &company_id, &staff_id).await?;
    Ok(Json(ApiResponse::ok(load_profile(&state, &staff.id).await?)))
}

pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(editor): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path((company_id, staff_id)): Path<(String, String)>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&editor, &meta, Module::Staff, Action::Update).await?;
    let mut staff = find_in_company(&state, &company_id, &staff_id).await?;
    if staff.id != editor.id {
        ensure_assignable(&editor, staff.role)?;
    }

    if let Some(name) = payload.name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        staff.name = name;
    }
    if payload.mobile.is_some() {
        staff.mobile = payload.mobile;
    }

    let role_changed = payload.role.is_some_and(|r| r != staff.role);
    if let Some(role) = payload.role.filter(|_| role_changed) {
        if staff.id == editor.id {
            return Err(AppError::Forbidden("You cannot change your own role".into()));
        }
        ensure_assignable(&editor, role)?;
        staff.role = role;
    }
    if payload.branch_id.is_some() || role_changed {
        let requested = payload.branch_id.or_else(|| staff.branch_id.clone());
        staff.branch_id = resolve_branch(&state, &company_id, staff.role, requested).await?;
    }
    staff.updated_at = Utc::now();

    state.staff_repo.update(&staff).await?;
    info!(staff_id = %staff.id, updated_by = %editor.id, "Updated staff member");
    Ok(Json(ApiResponse::ok(load_profile(&state, &staff.id).await?)))
}

pub async fn set_staff_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(editor): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path((company_id, staff_id)): Path<(String, String)>,
    Json(payload): Json<StaffStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&editor, &meta, Module::Staff, Action::Update).await?;
    if staff_id == editor.id {
        return Err(AppError::Validation("You cannot change the status of your own account".into()));
    }

    let staff = find_in_company(&state, &company_id, &staff_id).await?;
    ensure_assignable(&editor, staff.role)?;

    state.staff_repo.set_active(&staff.id, payload.is_active).await?;
    info!(staff_id = %staff.id, is_active = payload.is_active, updated_by = %editor.id, "Changed staff status");
    Ok(Json(ApiResponse::ok(load_profile(&state, &staff.id).await?)))
}

/// Removes the account for good. Staff who have filed leads stay on record and
/// can only be deactivated.
pub async fn delete_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(editor): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path((company_id, staff_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&editor, &meta, Module::Staff, Action::Delete).await?;
    if staff_id == editor.id {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }

    let staff = find_in_company(&state, &company_id, &staff_id).await?;
    ensure_assignable(&editor, staff.role)?;

    state.staff_repo.delete(&staff.id).await?;
    info!(staff_id = %staff.id, deleted_by = %editor.id, "Deleted staff member");
    Ok(Json(MessageResponse::new("Staff member deleted")))
}

pub async fn list_branch_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(branch_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Staff, Action::Read).await?;
    let staff = state.staff_repo.list_by_branch(&branch_id).await?;
    Ok(Json(ApiResponse::ok(staff)))
}

fn ensure_assignable(actor: &StaffProfile, role: Role) -> Result<(), AppError> {
    if actor.role.can_assign(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("You cannot manage staff with the {} role", role)))
    }
}

/// Branch-level roles need a branch, and any branch must belong to the company.
async fn resolve_branch(
    state: &AppState,
    company_id: &str,
    role: Role,
    branch_id: Option<String>,
) -> Result<Option<String>, AppError> {
    let branch_id = branch_id.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());

    match branch_id {
        None if role.is_company_level() => Ok(None),
        None => Err(AppError::Validation(format!("A branch is required for the {} role", role))),
        Some(id) => match state.branch_repo.find_company_id(&id).await? {
            Some(owner) if owner == company_id => Ok(Some(id)),
            Some(_) => Err(AppError::Validation("Branch does not belong to this company".into())),
            None => Err(AppError::NotFound("Branch not found".into())),
        },
    }
}

async fn find_in_company(state: &AppState, company_id: &str, staff_id: &str) -> Result<Staff, AppError> {
    state
        .staff_repo
        .find_in_company(company_id, staff_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".into()))
}

async fn load_profile(state: &AppState, staff_id: &str) -> Result<StaffProfile, AppError> {
    state
        .staff_repo
        .find_profile(staff_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".into()))
}
