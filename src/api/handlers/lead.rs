use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateLeadRequest, LeadListQuery, UpdateLeadRequest};
use crate::api::dtos::responses::{ApiResponse, MessageResponse, Paginated};
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta, ownership::Ownership};
use crate::domain::models::lead::{Lead, LeadFilter, NewLead};
use crate::domain::models::pagination::{Page, PageRequest};
use crate::domain::models::permission::{Action, Module};
use crate::domain::models::security::RequestMeta;
use crate::domain::models::staff::StaffProfile;
use crate::domain::services::access::{check_company, OwnershipPolicy};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Ownership(policy): Ownership,
    Json(payload): Json<CreateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Lead, Action::Create).await?;
    payload.validate()?;

    let company_id = own_company(&user)?;
    let branch_id = payload.branch_id.trim().to_string();
    let branch_company = state
        .branch_repo
        .find_company_id(&branch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".into()))?;
    check_company(&user, Some(branch_company.as_str()), false).map_err(|d| d.into_error(&meta, &user.id))?;

    let assigned_to = payload.assigned_to.filter(|a| !a.trim().is_empty());
    policy
        .enforce(&branch_id, assigned_to.as_deref())
        .map_err(|d| d.into_error(&meta, &user.id))?;
    if let Some(assignee) = &assigned_to {
        ensure_assignee(&state, &company_id, assignee).await?;
    }

    let lead = Lead::new(NewLead {
        company_id,
        branch_id,
        customer_name: payload.customer_name.trim().to_string(),
        email: payload.email.map(|e| e.trim().to_lowercase()),
        mobile: payload.mobile.trim().to_string(),
        address: payload.address,
        city: payload.city,
        service_type: payload.service_type,
        source: payload.source,
        notes: payload.notes,
        assigned_to,
        created_by: user.id.clone(),
    });
    let created = state.lead_repo.create(&lead).await?;

    info!(lead_id = %created.id, branch_id = %created.branch_id, "Created lead");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Ownership(policy): Ownership,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Lead, Action::Read).await?;

    let page = PageRequest::new(query.page, query.limit);
    let mut filter = LeadFilter {
        company_id: Some(own_company(&user)?),
        branch_id: query.branch_id.filter(|b| !b.is_empty()),
        assigned_to: query.assigned_to.filter(|a| !a.is_empty()),
        status: query.status,
        search: query.search.filter(|s| !s.trim().is_empty()),
        sort_by: query.sort_by,
        order: query.order,
    };

    // Narrow to what the caller may see; a conflicting explicit filter matches nothing.
    let visible = match policy {
        OwnershipPolicy::Unrestricted => true,
        OwnershipPolicy::SameBranch(branch) => narrow(&mut filter.branch_id, branch),
        OwnershipPolicy::AssignedTo(staff_id) => narrow(&mut filter.assigned_to, Some(staff_id)),
    };
    if !visible {
        return Ok(Json(Paginated::from(Page::<Lead>::new(Vec::new(), 0, page))));
    }

    let leads = state.lead_repo.list(&filter, page).await?;
    Ok(Json(Paginated::from(leads)))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Ownership(policy): Ownership,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Lead, Action::Read).await?;
    let lead = load_lead(&state, &user, &meta, &policy, &lead_id).await?;
    Ok(Json(ApiResponse::ok(lead)))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Ownership(policy): Ownership,
    Path(lead_id): Path<String>,
    Json(payload): Json<UpdateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Lead, Action::Update).await?;
    let mut lead = load_lead(&state, &user, &meta, &policy, &lead_id).await?;

    if let Some(name) = payload.customer_name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::Validation("Customer name cannot be empty".into()));
        }
        lead.customer_name = name;
    }
    if let Some(mobile) = payload.mobile.map(|m| m.trim().to_string()) {
        if mobile.is_empty() {
            return Err(AppError::Validation("Mobile cannot be empty".into()));
        }
        lead.mobile = mobile;
    }
    if let Some(email) = payload.email {
        lead.email = Some(email.trim().to_lowercase()).filter(|e| !e.is_empty());
    }
    if payload.address.is_some() {
        lead.address = payload.address;
    }
    if payload.city.is_some() {
        lead.city = payload.city;
    }
    if payload.service_type.is_some() {
        lead.service_type = payload.service_type;
    }
    if payload.source.is_some() {
        lead.source = payload.source;
    }
    if payload.notes.is_some() {
        lead.notes = payload.notes;
    }
    if let Some(status) = payload.status {
        lead.status = status;
    }
    if let Some(assignee) = payload.assigned_to.map(|a| a.trim().to_string()) {
        let assignee = Some(assignee).filter(|a| !a.is_empty());
        if assignee != lead.assigned_to {
            if matches!(policy, OwnershipPolicy::AssignedTo(_)) {
                return Err(AppError::Forbidden("You cannot reassign leads".into()));
            }
            if let Some(id) = &assignee {
                ensure_assignee(&state, &lead.company_id, id).await?;
            }
            lead.assigned_to = assignee;
        }
    }
    lead.updated_at = Utc::now();

    let updated = state.lead_repo.update(&lead).await?;
    info!(lead_id = %updated.id, updated_by = %user.id, "Updated lead");
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Ownership(policy): Ownership,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.ensure(&user, &meta, Module::Lead, Action::Delete).await?;
    let lead = load_lead(&state, &user, &meta, &policy, &lead_id).await?;

    state.lead_repo.delete(&lead.id).await?;
    info!(lead_id = %lead.id, deleted_by = %user.id, "Deleted lead");
    Ok(Json(MessageResponse::new("Lead deleted")))
}

/// Leads of other companies are reported as missing rather than forbidden.
async fn load_lead(
    state: &AppState,
    user: &StaffProfile,
    meta: &RequestMeta,
    policy: &OwnershipPolicy,
    lead_id: &str,
) -> Result<Lead, AppError> {
    let lead = state
        .lead_repo
        .find_by_id(lead_id)
        .await?
        .filter(|lead| user.company_id.as_deref() == Some(lead.company_id.as_str()))
        .ok_or_else(|| AppError::NotFound("Lead not found".into()))?;

    policy
        .enforce(&lead.branch_id, lead.assigned_to.as_deref())
        .map_err(|d| d.into_error(meta, &user.id))?;
    Ok(lead)
}

async fn ensure_assignee(state: &AppState, company_id: &str, staff_id: &str) -> Result<(), AppError> {
    match state.staff_repo.find_in_company(company_id, staff_id).await? {
        Some(staff) if staff.is_active => Ok(()),
        _ => Err(AppError::Validation("Assigned staff member was not found in this company".into())),
    }
}

fn own_company(user: &StaffProfile) -> Result<String, AppError> {
    user.company_id
        .clone()
        .ok_or_else(|| AppError::Forbidden("You do not belong to a company".into()))
}

/// Forces `slot` to `scope`. Returns false when nothing can match.
fn narrow(slot: &mut Option<String>, scope: Option<String>) -> bool {
    let Some(allowed) = scope else {
        return false;
    };
    if slot.as_deref().is_some_and(|requested| requested != allowed) {
        return false;
    }
    *slot = Some(allowed);
    true
}
