use serde_json::Value;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    UserNotFound,
    AccountDeactivated,
    RoleDenied,
    CrossCompanyAccess,
    CrossCompanyBranchAccess,
    CrossBranchAccess,
    OwnershipDenied,
    PermissionDenied,
    RateLimitExceeded,
    LoginFailed,
    OtpFailed,
}

impl SecurityEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityEventKind::MissingToken => "missing_token",
            SecurityEventKind::InvalidToken => "invalid_token",
            SecurityEventKind::ExpiredToken => "expired_token",
            SecurityEventKind::UserNotFound => "user_not_found",
            SecurityEventKind::AccountDeactivated => "account_deactivated",
            SecurityEventKind::RoleDenied => "role_denied",
            SecurityEventKind::CrossCompanyAccess => "cross_company_access",
            SecurityEventKind::CrossCompanyBranchAccess => "cross_company_branch_access",
            SecurityEventKind::CrossBranchAccess => "cross_branch_access",
            SecurityEventKind::OwnershipDenied => "ownership_denied",
            SecurityEventKind::PermissionDenied => "permission_denied",
            SecurityEventKind::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEventKind::LoginFailed => "login_failed",
            SecurityEventKind::OtpFailed => "otp_failed",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request came from, as far as the audit trail cares.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: String,
    pub path: String,
}

#[derive(Debug)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub meta: RequestMeta,
    pub user_id: Option<String>,
    pub context: Value,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, meta: &RequestMeta) -> Self {
        Self {
            kind,
            meta: meta.clone(),
            user_id: None,
            context: Value::Null,
        }
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn record(self) {
        warn!(
            target: "security",
            event = %self.kind,
            ip = %self.meta.ip,
            user_agent = %self.meta.user_agent,
            path = %self.meta.path,
            user_id = self.user_id.as_deref().unwrap_or("-"),
            context = %self.context,
            "security event"
        );
    }
}
