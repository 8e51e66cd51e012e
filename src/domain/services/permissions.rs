use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::domain::models::permission::{Action, Module, Permission, PermissionRecord};
use crate::domain::models::security::{RequestMeta, SecurityEvent, SecurityEventKind};
use crate::domain::models::staff::{Role, StaffProfile};
use crate::domain::ports::PermissionRepository;
use crate::error::AppError;

use Action::{Create, Delete, Read, Update};

/// Bindings a role starts with before anyone edits them.
pub fn default_permissions(role: Role) -> Vec<Permission> {
    let grants: &[(Module, &[Action])] = match role {
        Role::SuperAdmin => return Permission::catalog(),
        Role::Admin => &[
            (Module::Company, &[Read, Update]),
            (Module::Branch, &[Create, Read, Update, Delete]),
            (Module::Staff, &[Create, Read, Update, Delete]),
            (Module::Lead, &[Create, Read, Update, Delete]),
            (Module::Permission, &[Read]),
        ],
        Role::RegionalManager => &[
            (Module::Company, &[Read]),
            (Module::Branch, &[Read]),
            (Module::Staff, &[Create, Read, Update]),
            (Module::Lead, &[Create, Read, Update, Delete]),
        ],
        Role::AreaManager => &[
            (Module::Company, &[Read]),
            (Module::Branch, &[Read]),
            (Module::Staff, &[Read]),
            (Module::Lead, &[Create, Read, Update]),
        ],
        Role::Technician => &[
            (Module::Company, &[Read]),
            (Module::Branch, &[Read]),
            (Module::Lead, &[Read, Update]),
        ],
        Role::Supervisor | Role::SalesExecutive => &[(Module::Company, &[Read]), (Module::Branch, &[Read])],
    };

    grants
        .iter()
        .flat_map(|(module, actions)| actions.iter().map(move |action| Permission::new(*module, *action)))
        .collect()
}

pub struct PermissionService {
    repo: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    pub fn new(repo: Arc<dyn PermissionRepository>) -> Self {
        Self { repo }
    }

    /// Writes the catalog and gives every role without bindings its defaults.
    pub async fn seed(&self) -> Result<(), AppError> {
        for permission in Permission::catalog() {
            self.repo.upsert_permission(&PermissionRecord::from(permission)).await?;
        }

        for role in Role::ALL {
            if role == Role::SuperAdmin || self.repo.count_for_role(role).await? > 0 {
                continue;
            }
            let keys: Vec<String> = default_permissions(role).iter().map(Permission::key).collect();
            self.repo.replace_for_role(role, &keys).await?;
            info!(role = %role, count = keys.len(), "Seeded default permissions");
        }

        Ok(())
    }

    pub async fn catalog(&self) -> Result<Vec<PermissionRecord>, AppError> {
        self.repo.list_permissions().await
    }

    pub async fn effective(&self, role: Role) -> Result<Vec<PermissionRecord>, AppError> {
        if role == Role::SuperAdmin {
            return Ok(Permission::catalog().into_iter().map(PermissionRecord::from).collect());
        }
        self.repo.list_for_role(role).await
    }

    pub async fn has(&self, role: Role, permission: Permission) -> Result<bool, AppError> {
        if role == Role::SuperAdmin {
            return Ok(true);
        }
        let key = permission.key();
        Ok(self.repo.list_for_role(role).await?.iter().any(|p| p.id == key))
    }

    pub async fn ensure(
        &self,
        user: &StaffProfile,
        meta: &RequestMeta,
        module: Module,
        action: Action,
    ) -> Result<(), AppError> {
        let permission = Permission::new(module, action);
        if self.has(user.role, permission).await? {
            return Ok(());
        }

        SecurityEvent::new(SecurityEventKind::PermissionDenied, meta)
            .user(&user.id)
            .context(json!({ "role": user.role, "permission": permission.key() }))
            .record();
        Err(AppError::Forbidden("You do not have permission to perform this action".to_string()))
    }

    pub async fn replace(&self, role: Role, keys: &[String]) -> Result<Vec<PermissionRecord>, AppError> {
        if role == Role::SuperAdmin {
            return Err(AppError::Validation("SUPERADMIN permissions cannot be modified".to_string()));
        }

        let mut unknown = Vec::new();
        let mut normalized: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            match key.parse::<Permission>() {
                Ok(p) if !normalized.contains(&p.key()) => normalized.push(p.key()),
                Ok(_) => {}
                Err(e) => unknown.push(e.to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(AppError::ValidationErrors(unknown));
        }

        self.repo.replace_for_role(role, &normalized).await?;
        info!(role = %role, count = normalized.len(), "Replaced role permissions");
        self.repo.list_for_role(role).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superadmin_defaults_to_whole_catalog() {
        assert_eq!(default_permissions(Role::SuperAdmin), Permission::catalog());
    }

    #[test]
    fn test_lead_access_by_role() {
        let lead = |role, action| default_permissions(role).contains(&Permission::new(Module::Lead, action));

        assert!(lead(Role::Admin, Delete));
        assert!(lead(Role::RegionalManager, Delete));
        assert!(lead(Role::AreaManager, Create));
        assert!(!lead(Role::AreaManager, Delete));
        assert!(lead(Role::Technician, Update));
        assert!(!lead(Role::Technician, Create));
        assert!(!lead(Role::Supervisor, Read));
        assert!(!lead(Role::SalesExecutive, Read));
    }

    #[test]
    fn test_every_role_reads_its_company() {
        for role in Role::ALL {
            assert!(default_permissions(role).contains(&Permission::new(Module::Company, Read)), "{}", role);
        }
    }

    #[test]
    fn test_only_superadmin_edits_permissions_by_default() {
        for role in Role::ALL {
            let edits = default_permissions(role).contains(&Permission::new(Module::Permission, Update));
            assert_eq!(edits, role == Role::SuperAdmin, "{}", role);
        }
    }
}
