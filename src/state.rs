use std::sync::Arc;
use crate::domain::ports::{
    BranchRepository, CompanyRepository, EmailService, LeadRepository, OtpRepository,
    PermissionRepository, StaffRepository,
};
use crate::domain::services::{
    auth_service::AuthService, otp_service::OtpService, permissions::PermissionService,
    rate_limiter::SensitiveOpLimiter, token_service::TokenService,
};
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub company_repo: Arc<dyn CompanyRepository>,
    pub branch_repo: Arc<dyn BranchRepository>,
    pub staff_repo: Arc<dyn StaffRepository>,
    pub lead_repo: Arc<dyn LeadRepository>,
    pub permission_repo: Arc<dyn PermissionRepository>,
    pub otp_repo: Arc<dyn OtpRepository>,
    pub token_service: Arc<TokenService>,
    pub otp_service: Arc<OtpService>,
    pub auth_service: Arc<AuthService>,
    pub permission_service: Arc<PermissionService>,
    pub sensitive_limiter: Arc<SensitiveOpLimiter>,
    pub email_service: Arc<dyn EmailService>,
    pub templates: Arc<Tera>,
}
