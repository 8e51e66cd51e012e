//! Authorization decisions behind the role, company, branch and ownership gates.
//!
//! Everything here is a pure function of the caller's profile and the target
//! identifiers, so the HTTP layer only has to extract inputs, run one of these
//! and record the resulting security event.

use serde_json::{json, Value};

use crate::domain::models::security::{RequestMeta, SecurityEvent, SecurityEventKind};
use crate::domain::models::staff::{Role, StaffProfile};
use crate::error::AppError;

pub const ROLE_DENIED: &str = "You do not have permission to perform this action";
pub const COMPANY_ID_REQUIRED: &str = "Company ID is required";
pub const COMPANY_MISMATCH: &str = "Access denied. You can only access resources from your own company.";
pub const BRANCH_ID_REQUIRED: &str = "Branch ID is required";
pub const BRANCH_NOT_FOUND: &str = "Branch not found";
pub const BRANCH_OTHER_COMPANY: &str = "Access denied. Branch does not belong to your company.";
pub const BRANCH_MISMATCH: &str = "Access denied. You can only access resources from your own branch.";
pub const OWNERSHIP_DENIED: &str = "You do not have permission to access this resource";

/// A refused authorization check, with the audit event it should leave behind.
#[derive(Debug)]
pub struct Denial {
    pub error: AppError,
    pub event: Option<(SecurityEventKind, Value)>,
}

impl Denial {
    fn forbidden(message: &str, kind: SecurityEventKind, context: Value) -> Self {
        Self {
            error: AppError::Forbidden(message.to_string()),
            event: Some((kind, context)),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            error: AppError::Validation(message.to_string()),
            event: None,
        }
    }

    fn not_found(message: &str) -> Self {
        Self {
            error: AppError::NotFound(message.to_string()),
            event: None,
        }
    }

    /// Records the security event (if any) and hands back the client-facing error.
    pub fn into_error(self, meta: &RequestMeta, user_id: &str) -> AppError {
        if let Some((kind, context)) = self.event {
            SecurityEvent::new(kind, meta).user(user_id).context(context).record();
        }
        self.error
    }
}

pub fn check_roles(user: &StaffProfile, allowed: &[Role]) -> Result<(), Denial> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    let required: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
    Err(Denial::forbidden(
        ROLE_DENIED,
        SecurityEventKind::RoleDenied,
        json!({ "role": user.role, "required_roles": required }),
    ))
}

pub fn check_company(user: &StaffProfile, target: Option<&str>, allow_superadmin: bool) -> Result<(), Denial> {
    if allow_superadmin && user.role == Role::SuperAdmin {
        return Ok(());
    }

    let target = target.ok_or_else(|| Denial::bad_request(COMPANY_ID_REQUIRED))?;

    if user.company_id.as_deref() != Some(target) {
        return Err(Denial::forbidden(
            COMPANY_MISMATCH,
            SecurityEventKind::CrossCompanyAccess,
            json!({ "user_company_id": user.company_id, "requested_company_id": target }),
        ));
    }

    Ok(())
}

/// First half of the branch gate. `Ok(None)` means the SUPERADMIN bypass applies
/// and no lookup is needed.
pub fn branch_target(user: &StaffProfile, target: Option<&str>, allow_superadmin: bool) -> Result<Option<String>, Denial> {
    if allow_superadmin && user.role == Role::SuperAdmin {
        return Ok(None);
    }

    target
        .map(|t| Some(t.to_string()))
        .ok_or_else(|| Denial::bad_request(BRANCH_ID_REQUIRED))
}

/// Second half of the branch gate, once the branch's owning company is known
/// (`None` when the branch does not exist).
///
/// Tenant isolation is checked before the company-admin override, so an ADMIN
/// of another company is refused as well.
pub fn check_branch(
    user: &StaffProfile,
    branch_id: &str,
    branch_company_id: Option<&str>,
    allow_company_admin: bool,
) -> Result<(), Denial> {
    let branch_company_id = branch_company_id.ok_or_else(|| Denial::not_found(BRANCH_NOT_FOUND))?;

    if user.company_id.as_deref() != Some(branch_company_id) {
        return Err(Denial::forbidden(
            BRANCH_OTHER_COMPANY,
            SecurityEventKind::CrossCompanyBranchAccess,
            json!({
                "user_company_id": user.company_id,
                "branch_company_id": branch_company_id,
                "requested_branch_id": branch_id,
            }),
        ));
    }

    if allow_company_admin && user.role == Role::Admin {
        return Ok(());
    }

    if user.branch_id.as_deref() != Some(branch_id) {
        return Err(Denial::forbidden(
            BRANCH_MISMATCH,
            SecurityEventKind::CrossBranchAccess,
            json!({ "user_branch_id": user.branch_id, "requested_branch_id": branch_id }),
        ));
    }

    Ok(())
}

/// The deferred half of the ownership gate: decided from the caller's tier up
/// front, enforced by the handler once the resource is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipPolicy {
    Unrestricted,
    SameBranch(Option<String>),
    AssignedTo(String),
}

impl OwnershipPolicy {
    pub fn for_user(user: &StaffProfile) -> Result<Self, Denial> {
        match user.role {
            Role::Admin | Role::RegionalManager => Ok(OwnershipPolicy::Unrestricted),
            Role::AreaManager => Ok(OwnershipPolicy::SameBranch(user.branch_id.clone())),
            Role::Technician => Ok(OwnershipPolicy::AssignedTo(user.id.clone())),
            Role::SuperAdmin | Role::Supervisor | Role::SalesExecutive => Err(Denial::forbidden(
                OWNERSHIP_DENIED,
                SecurityEventKind::OwnershipDenied,
                json!({ "role": user.role }),
            )),
        }
    }

    /// `owner` is whichever field of the resource identifies its owner
    /// (for leads, `assigned_to`).
    pub fn permits(&self, resource_branch_id: &str, owner: Option<&str>) -> bool {
        match self {
            OwnershipPolicy::Unrestricted => true,
            OwnershipPolicy::SameBranch(branch) => branch.as_deref() == Some(resource_branch_id),
            OwnershipPolicy::AssignedTo(staff_id) => owner == Some(staff_id.as_str()),
        }
    }

    pub fn enforce(&self, resource_branch_id: &str, owner: Option<&str>) -> Result<(), Denial> {
        if self.permits(resource_branch_id, owner) {
            return Ok(());
        }

        let kind = match self {
            OwnershipPolicy::SameBranch(_) => SecurityEventKind::CrossBranchAccess,
            _ => SecurityEventKind::OwnershipDenied,
        };
        Err(Denial::forbidden(
            OWNERSHIP_DENIED,
            kind,
            json!({ "resource_branch_id": resource_branch_id, "resource_owner": owner }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: Role, company: Option<&str>, branch: Option<&str>) -> StaffProfile {
        StaffProfile {
            id: format!("{}-user", role.as_str().to_lowercase()),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            mobile: None,
            role,
            is_active: true,
            company_id: company.map(str::to_string),
            branch_id: branch.map(str::to_string),
            branch: None,
        }
    }

    #[test]
    fn test_role_allow_list() {
        let tech = staff(Role::Technician, Some("C1"), Some("B1"));
        assert!(check_roles(&tech, &[Role::Technician, Role::Admin]).is_ok());

        let denial = check_roles(&tech, &[Role::Admin]).unwrap_err();
        assert!(matches!(denial.error, AppError::Forbidden(ref m) if m == ROLE_DENIED));
        assert_eq!(denial.event.unwrap().0, SecurityEventKind::RoleDenied);
    }

    #[test]
    fn test_superadmin_passes_company_gate_for_any_target() {
        let root = staff(Role::SuperAdmin, None, None);
        assert!(check_company(&root, Some("C1"), true).is_ok());
        assert!(check_company(&root, None, true).is_ok());
    }

    #[test]
    fn test_company_gate_requires_target() {
        let admin = staff(Role::Admin, Some("C1"), None);
        let denial = check_company(&admin, None, true).unwrap_err();
        assert!(matches!(denial.error, AppError::Validation(ref m) if m == COMPANY_ID_REQUIRED));
        assert!(denial.event.is_none());
    }

    #[test]
    fn test_company_gate_rejects_other_company() {
        let admin = staff(Role::Admin, Some("C2"), None);
        let denial = check_company(&admin, Some("C1"), true).unwrap_err();
        assert!(matches!(denial.error, AppError::Forbidden(ref m) if m == COMPANY_MISMATCH));
        assert_eq!(denial.event.unwrap().0, SecurityEventKind::CrossCompanyAccess);

        assert!(check_company(&admin, Some("C2"), true).is_ok());
    }

    #[test]
    fn test_superadmin_bypass_can_be_disabled() {
        let root = staff(Role::SuperAdmin, None, None);
        assert!(check_company(&root, Some("C1"), false).is_err());
        assert!(matches!(branch_target(&root, Some("B1"), false), Ok(Some(_))));
        assert!(matches!(branch_target(&root, Some("B1"), true), Ok(None)));
    }

    #[test]
    fn test_branch_gate_missing_and_unknown_branch() {
        let manager = staff(Role::AreaManager, Some("C1"), Some("B1"));
        let denial = branch_target(&manager, None, true).unwrap_err();
        assert!(matches!(denial.error, AppError::Validation(_)));

        let denial = check_branch(&manager, "B9", None, true).unwrap_err();
        assert!(matches!(denial.error, AppError::NotFound(_)));
    }

    #[test]
    fn test_branch_gate_isolates_tenants_even_for_admins() {
        let admin = staff(Role::Admin, Some("C2"), Some("B2"));
        let denial = check_branch(&admin, "B1", Some("C1"), true).unwrap_err();
        assert!(matches!(denial.error, AppError::Forbidden(ref m) if m == BRANCH_OTHER_COMPANY));
        assert_eq!(denial.event.unwrap().0, SecurityEventKind::CrossCompanyBranchAccess);
    }

    #[test]
    fn test_admin_override_within_own_company() {
        let admin = staff(Role::Admin, Some("C1"), Some("B2"));
        assert!(check_branch(&admin, "B1", Some("C1"), true).is_ok());
        assert!(check_branch(&admin, "B1", Some("C1"), false).is_err());
    }

    #[test]
    fn test_non_admin_limited_to_own_branch() {
        let manager = staff(Role::RegionalManager, Some("C1"), Some("B2"));
        let denial = check_branch(&manager, "B1", Some("C1"), true).unwrap_err();
        assert!(matches!(denial.error, AppError::Forbidden(ref m) if m == BRANCH_MISMATCH));
        assert_eq!(denial.event.unwrap().0, SecurityEventKind::CrossBranchAccess);

        assert!(check_branch(&manager, "B2", Some("C1"), true).is_ok());
    }

    #[test]
    fn test_ownership_policy_by_tier() {
        let admin = staff(Role::Admin, Some("C1"), None);
        let rm = staff(Role::RegionalManager, Some("C1"), None);
        let am = staff(Role::AreaManager, Some("C1"), Some("B1"));
        let tech = staff(Role::Technician, Some("C1"), Some("B1"));

        assert_eq!(OwnershipPolicy::for_user(&admin).unwrap(), OwnershipPolicy::Unrestricted);
        assert_eq!(OwnershipPolicy::for_user(&rm).unwrap(), OwnershipPolicy::Unrestricted);
        assert_eq!(
            OwnershipPolicy::for_user(&am).unwrap(),
            OwnershipPolicy::SameBranch(Some("B1".to_string()))
        );
        assert_eq!(
            OwnershipPolicy::for_user(&tech).unwrap(),
            OwnershipPolicy::AssignedTo(tech.id.clone())
        );

        for role in [Role::SuperAdmin, Role::Supervisor, Role::SalesExecutive] {
            assert!(OwnershipPolicy::for_user(&staff(role, Some("C1"), Some("B1"))).is_err());
        }
    }

    #[test]
    fn test_ownership_policy_enforcement() {
        let same_branch = OwnershipPolicy::SameBranch(Some("B1".to_string()));
        assert!(same_branch.permits("B1", None));
        assert!(!same_branch.permits("B2", None));
        assert!(!OwnershipPolicy::SameBranch(None).permits("B1", None));

        let assigned = OwnershipPolicy::AssignedTo("T1".to_string());
        assert!(assigned.permits("B9", Some("T1")));
        assert!(!assigned.permits("B1", Some("T2")));
        assert!(!assigned.permits("B1", None));

        let denial = assigned.enforce("B1", Some("T2")).unwrap_err();
        assert!(matches!(denial.error, AppError::Forbidden(_)));
    }
}
