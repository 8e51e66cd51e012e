use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Company,
    Branch,
    Staff,
    Lead,
    Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Module {
    pub const ALL: [Module; 5] = [Module::Company, Module::Branch, Module::Staff, Module::Lead, Module::Permission];

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Company => "COMPANY",
            Module::Branch => "BRANCH",
            Module::Staff => "STAFF",
            Module::Lead => "LEAD",
            Module::Permission => "PERMISSION",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Module::Company => "companies",
            Module::Branch => "branches",
            Module::Staff => "staff members",
            Module::Lead => "leads",
            Module::Permission => "role permissions",
        }
    }
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Read => "READ",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Read => "View",
            Action::Update => "Edit",
            Action::Delete => "Delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub module: Module,
    pub action: Action,
}

#[derive(Error, Debug)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl Permission {
    pub const fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }

    /// Stable identifier, e.g. `LEAD:READ`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.module.as_str(), self.action.as_str())
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.action.verb(), self.module.noun())
    }

    pub fn catalog() -> Vec<Permission> {
        Module::ALL
            .into_iter()
            .flat_map(|module| Action::ALL.into_iter().map(move |action| Permission::new(module, action)))
            .collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module.as_str(), self.action.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::catalog()
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PermissionRecord {
    pub id: String,
    pub module: String,
    pub action: String,
    pub description: String,
}

impl From<Permission> for PermissionRecord {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.key(),
            module: permission.module.as_str().to_string(),
            action: permission.action.as_str().to_string(),
            description: permission.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_pair() {
        let catalog = Permission::catalog();
        assert_eq!(catalog.len(), Module::ALL.len() * Action::ALL.len());
        assert!(catalog.contains(&Permission::new(Module::Lead, Action::Delete)));
    }

    #[test]
    fn test_permission_keys_parse_back() {
        let p = Permission::new(Module::Staff, Action::Update);
        assert_eq!(p.key(), "STAFF:UPDATE");
        assert_eq!("STAFF:UPDATE".parse::<Permission>().unwrap(), p);
        assert_eq!(p.description(), "Edit staff members");
        assert!("STAFF:ARCHIVE".parse::<Permission>().is_err());
    }
}
