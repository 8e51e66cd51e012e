use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde_json::json;
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{error, info};

use crate::domain::models::auth::NewAccount;
use crate::domain::models::company::Company;
use crate::domain::models::otp::OtpPurpose;
use crate::domain::models::security::{RequestMeta, SecurityEvent, SecurityEventKind};
use crate::domain::models::staff::{NewStaff, Role, Staff, StaffProfile};
use crate::domain::ports::{EmailService, StaffRepository};
use crate::domain::services::otp_service::OtpService;
use crate::domain::services::token_service::TokenService;
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";
pub const ACCOUNT_DEACTIVATED: &str = "Your account has been deactivated. Please contact support.";
pub const EMAIL_NOT_VERIFIED: &str = "Please verify your email before logging in.";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalWithMsg(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// A freshly issued session.
pub struct Session {
    pub token: String,
    pub user: StaffProfile,
}

pub struct AuthService {
    staff_repo: Arc<dyn StaffRepository>,
    otp: Arc<OtpService>,
    tokens: Arc<TokenService>,
    email: Arc<dyn EmailService>,
    templates: Arc<Tera>,
}

impl AuthService {
    pub fn new(
        staff_repo: Arc<dyn StaffRepository>,
            otp: Arc<OtpService>,
        tokens: Arc<TokenService>,
        email: Arc<dyn EmailService>,
        templates: Arc<Tera>,
    ) -> Self {
        Self { staff_repo, otp, tokens, email, templates }
    }

    /// Creates the company and its first ADMIN, then mails a verification code.
    pub async fn signup(&self, account: NewAccount) -> Result<Staff, AppError> {
        validate_password(&account.password)?;

        let email = account.email.trim().to_lowercase();
        if self.staff_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("An account with this email already exists".into()));
        }

        let company = Company::new(account.company_name, Some(email.clone()), account.mobile.clone(), None);
        let staff = Staff::new(NewStaff {
            company_id: Some(company.id.clone()),
            branch_id: None,
            name: account.name,
            email,
            mobile: account.mobile,
            password_hash: hash_password(&account.password)?,
            role: Role::Admin,
            is_verified: false,
        });
        let staff = self.staff_repo.create_with_company(&company, &staff).await?;

        info!(company_id = %company.id, staff_id = %staff.id, "Company signed up");
        self.send_code(&staff, OtpPurpose::Signup).await?;
        Ok(staff)
    }

    pub async fn verify_signup(&self, email: &str, code: &str, meta: &RequestMeta) -> Result<Session, AppError> {
        let email = email.trim().to_lowercase();
        let staff = self
            .staff_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Validation(super::otp_service::INVALID_OTP.to_string()))?;

        if let Err(e) = self.otp.verify(&email, OtpPurpose::Signup, code).await {
            SecurityEvent::new(SecurityEventKind::OtpFailed, meta)
                .user(&staff.id)
                .context(json!({ "purpose": OtpPurpose::Signup.as_str() }))
                .record();
            return Err(e);
        }

        self.staff_repo.mark_verified(&staff.id).await?;
        info!(staff_id = %staff.id, "Email verified");
        self.session_for(&staff.id).await
    }

    /// Silently does nothing for unknown or already verified addresses.
    pub async fn resend_signup_code(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        match self.staff_repo.find_by_email(&email).await? {
            Some(staff) if !staff.is_verified => self.send_code(&staff, OtpPurpose::Signup).await,
            _ => Ok(()),
        }
    }

    pub async fn login(&self, email: &str, password: &str, meta: &RequestMeta) -> Result<Session, AppError> {
        let email = email.trim().to_lowercase();
        let staff = match self.staff_repo.find_by_email(&email).await? {
            Some(staff) if verify_password(password, &staff.password_hash) => staff,
            _ => {
                SecurityEvent::new(SecurityEventKind::LoginFailed, meta)
                    .context(json!({ "email": email }))
                    .record();
                return Err(AppError::Unauthorized(INCORRECT_CREDENTIALS.into()));
            }
        };

        if !staff.is_active {
            SecurityEvent::new(SecurityEventKind::AccountDeactivated, meta).user(&staff.id).record();
            return Err(AppError::Unauthorized(ACCOUNT_DEACTIVATED.into()));
        }
        if !staff.is_verified {
            return Err(AppError::Forbidden(EMAIL_NOT_VERIFIED.into()));
        }

        info!(staff_id = %staff.id, "Staff logged in");
        self.session_for(&staff.id).await
    }

    /// Always succeeds so callers cannot probe which emails are registered.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        match self.staff_repo.find_by_email(&email).await? {
            Some(staff) if staff.is_active => self.send_code(&staff, OtpPurpose::PasswordReset).await,
            _ => Ok(()),
        }
    }

    pub async fn reset_password(&self, email: &str, code: &str, password: &str, meta: &RequestMeta) -> Result<(), AppError> {
        validate_password(password)?;

        let email = email.trim().to_lowercase();
        let staff = self
            .staff_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Validation(super::otp_service::INVALID_OTP.to_string()))?;

        if let Err(e) = self.otp.verify(&email, OtpPurpose::PasswordReset, code).await {
            SecurityEvent::new(SecurityEventKind::OtpFailed, meta)
                .user(&staff.id)
                .context(json!({ "purpose": OtpPurpose::PasswordReset.as_str() }))
                .record();
            return Err(e);
        }

        self.staff_repo.update_password(&staff.id, &hash_password(password)?).await?;
        // The reset code proved ownership of the mailbox.
        if !staff.is_verified {
            self.staff_repo.mark_verified(&staff.id).await?;
        }
        info!(staff_id = %staff.id, "Password reset");
        Ok(())
    }

    pub async fn change_password(&self, staff_id: &str, current: &str, new: &str) -> Result<Session, AppError> {
        let staff = self
            .staff_repo
            .find_by_id(staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff member not found".into()))?;

        if !verify_password(current, &staff.password_hash) {
            return Err(AppError::Unauthorized("Your current password is incorrect".into()));
        }
        validate_password(new)?;

        self.staff_repo.update_password(&staff.id, &hash_password(new)?).await?;
        info!(staff_id = %staff.id, "Password changed");
        self.session_for(&staff.id).await
    }

    /// Creates the platform SUPERADMIN on first start when credentials are configured.
    pub async fn ensure_superadmin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        if self.staff_repo.find_by_email(&email).await?.is_some() {
            return Ok(());
        }

        let staff = Staff::new(NewStaff {
            company_id: None,
            branch_id: None,
            name: "Super Admin".to_string(),
            email,
            mobile: None,
            password_hash: hash_password(password)?,
            role: Role::SuperAdmin,
            is_verified: true,
        });
        self.staff_repo.create(&staff).await?;
        info!(staff_id = %staff.id, "Bootstrapped SUPERADMIN account");
        Ok(())
    }

    async fn session_for(&self, staff_id: &str) -> Result<Session, AppError> {
        let user = self
            .staff_repo
            .find_profile(staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff member not found".into()))?;
        let token = self.tokens.issue(&user.id)?;
        Ok(Session { token, user })
    }

    async fn send_code(&self, staff: &Staff, purpose: OtpPurpose) -> Result<(), AppError> {
        let code = self.otp.issue(&staff.email, purpose).await?;

        let (template, subject) = match purpose {
            OtpPurpose::Signup => ("otp_signup.html", "Verify your email"),
            OtpPurpose::PasswordReset => ("otp_reset.html", "Reset your password"),
        };

        let mut context = Context::new();
        context.insert("name", &staff.name);
        context.insert("code", &code);
        context.insert("ttl_minutes", &self.otp.ttl_minutes());

        let body = self.templates.render(template, &context).map_err(|e| {
            error!("Template render error: {:?}", e);
            AppError::InternalWithMsg(format!("Template render error: {}", e))
        })?;

        // Delivery problems must not undo the account change; the user can ask again.
        if let Err(e) = self.email.send(&staff.email, subject, &body).await {
            error!(staff_id = %staff.id, error = ?e, "Failed to deliver one-time code");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_password_length_rule() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }
}
