use crate::domain::models::{
    branch::Branch, company::Company, lead::{Lead, LeadFilter}, otp::{OtpCode, OtpPurpose},
    pagination::{Page, PageRequest}, permission::PermissionRecord,
    staff::{Role, Staff, StaffFilter, StaffProfile}
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: &Company) -> Result<Company, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Company>, AppError>;
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Company>, AppError>;
    async fn update(&self, company: &Company) -> Result<Company, AppError>;
}

#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn create(&self, branch: &Branch) -> Result<Branch, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Branch>, AppError>;
    /// Owning company of a branch, used by the branch-scope gate.
    async fn find_company_id(&self, id: &str) -> Result<Option<String>, AppError>;
    async fn list_by_company(&self, company_id: &str) -> Result<Vec<Branch>, AppError>;
    async fn update(&self, branch: &Branch) -> Result<Branch, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn create(&self, staff: &Staff) -> Result<Staff, AppError>;
    /// Inserts a new company and its first staff member atomically.
    async fn create_with_company(&self, company: &Company, staff: &Staff) -> Result<Staff, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Staff>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>, AppError>;
    async fn find_profile(&self, id: &str) -> Result<Option<StaffProfile>, AppError>;
    async fn find_in_company(&self, company_id: &str, id: &str) -> Result<Option<Staff>, AppError>;
    async fn list(&self, filter: &StaffFilter, page: PageRequest) -> Result<Page<Staff>, AppError>;
    async fn list_by_branch(&self, branch_id: &str) -> Result<Vec<Staff>, AppError>;
    async fn update(&self, staff: &Staff) -> Result<Staff, AppError>;
    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError>;
    async fn mark_verified(&self, id: &str) -> Result<(), AppError>;
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError>;
    /// Unassigns the member's leads and removes the row. Fails with a conflict
    /// when leads they created still reference them.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create(&self, lead: &Lead) -> Result<Lead, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Lead>, AppError>;
    async fn list(&self, filter: &LeadFilter, page: PageRequest) -> Result<Page<Lead>, AppError>;
    async fn update(&self, lead: &Lead) -> Result<Lead, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn upsert_permission(&self, permission: &PermissionRecord) -> Result<(), AppError>;
    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, AppError>;
    async fn list_for_role(&self, role: Role) -> Result<Vec<PermissionRecord>, AppError>;
    async fn count_for_role(&self, role: Role) -> Result<i64, AppError>;
    async fn replace_for_role(&self, role: Role, permission_ids: &[String]) -> Result<(), AppError>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Replaces any existing code for the same (email, purpose).
    async fn upsert(&self, code: &OtpCode) -> Result<(), AppError>;
    async fn find(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpCode>, AppError>;
    async fn increment_attempts(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError>;
    async fn delete(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
