use crate::domain::models::lead::{LeadSortField, LeadStatus};
use crate::domain::models::pagination::SortOrder;
use crate::domain::models::staff::{Role, StaffSortField};
use crate::error::AppError;
use serde::Deserialize;

/// Collects field problems so the client sees all of them at once.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn required(&mut self, value: &str, label: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{} is required", label));
        }
    }

    fn email(&mut self, value: &str) {
        if !is_email(value) {
            self.0.push("Please provide a valid email".to_string());
        }
    }

    fn optional_email(&mut self, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.email(v);
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationErrors(self.0))
        }
    }
}

fn is_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && !value.contains(' ')
        }
        None => false,
    }
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub company_name: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut p = Problems::default();
        p.required(&self.company_name, "Company name");
        p.required(&self.name, "Name");
        p.email(&self.email);
        p.required(&self.password, "Password");
        p.finish()
    }
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation("Please provide email and password".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
}

impl CreateCompanyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut p = Problems::default();
        p.required(&self.name, "Company name");
        p.optional_email(self.email.as_deref());
        p.finish()
    }
}

#[derive(Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub mobile: Option<String>,
}

impl CreateBranchRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut p = Problems::default();
        p.required(&self.name, "Branch name");
        p.finish()
    }
}

#[derive(Deserialize)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub mobile: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl CreateStaffRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut p = Problems::default();
        p.required(&self.name, "Name");
        p.email(&self.email);
        p.required(&self.password, "Password");
        p.finish()
    }
}

#[derive(Deserialize)]
pub struct UpdateStaffRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<String>,
}

#[derive(Deserialize)]
pub struct StaffStatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct StaffListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub branch_id: Option<String>,
    pub role: Option<Role>,
    #[serde(default)]
    pub sort_by: StaffSortField,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Deserialize)]
pub struct CreateLeadRequest {
    pub branch_id: String,
    pub customer_name: String,
    pub email: Option<String>,
    pub mobile: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub service_type: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
}

impl CreateLeadRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut p = Problems::default();
        p.required(&self.branch_id, "Branch");
        p.required(&self.customer_name, "Customer name");
        p.required(&self.mobile, "Mobile");
        p.optional_email(self.email.as_deref());
        p.finish()
    }
}

#[derive(Deserialize)]
pub struct UpdateLeadRequest {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub service_type: Option<String>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct LeadListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub branch_id: Option<String>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub sort_by: LeadSortField,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Deserialize)]
pub struct ReplacePermissionsRequest {
    pub permissions: Vec<String>,
}
