use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::branch::BranchSummary;
use super::pagination::SortOrder;

pub const STAFF_HAS_LEADS: &str = "This staff member has created leads and cannot be deleted. Deactivate them instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[serde(rename = "SUPERADMIN")]
    SuperAdmin,
    Admin,
    RegionalManager,
    AreaManager,
    Technician,
    Supervisor,
    SalesExecutive,
}

#[derive(Error, Debug)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::RegionalManager,
        Role::AreaManager,
        Role::Technician,
        Role::Supervisor,
        Role::SalesExecutive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPERADMIN",
            Role::Admin => "ADMIN",
            Role::RegionalManager => "REGIONAL_MANAGER",
            Role::AreaManager => "AREA_MANAGER",
            Role::Technician => "TECHNICIAN",
            Role::Supervisor => "SUPERVISOR",
            Role::SalesExecutive => "SALES_EXECUTIVE",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::Admin => 80,
            Role::RegionalManager => 60,
            Role::AreaManager => 40,
            Role::Supervisor => 30,
            Role::SalesExecutive => 20,
            Role::Technician => 20,
        }
    }

    /// Company-level roles may exist without a branch.
    pub fn is_company_level(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::RegionalManager)
    }

    /// Nobody creates a SUPERADMIN; ADMIN may create peers, everyone else only lower tiers.
    pub fn can_assign(self, target: Role) -> bool {
        match (self, target) {
            (_, Role::SuperAdmin) => false,
            (Role::SuperAdmin, _) | (Role::Admin, _) => true,
            (creator, target) => creator.rank() > target.rank(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Staff {
    pub id: String,
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewStaff {
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
}

impl Staff {
    pub fn new(params: NewStaff) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            company_id: params.company_id,
            branch_id: params.branch_id,
            name: params.name,
            email: params.email.trim().to_lowercase(),
            mobile: params.mobile,
            password_hash: params.password_hash,
            role: params.role,
            is_active: true,
            is_verified: params.is_verified,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The non-sensitive view of a staff member attached to authenticated requests.
#[derive(Debug, Serialize, Clone)]
pub struct StaffProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub branch: Option<BranchSummary>,
}

#[derive(Debug, FromRow)]
pub struct StaffProfileRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub branch_name: Option<String>,
    pub branch_city: Option<String>,
}

impl From<StaffProfileRow> for StaffProfile {
    fn from(row: StaffProfileRow) -> Self {
        let branch = match (&row.branch_id, row.branch_name) {
            (Some(id), Some(name)) => Some(BranchSummary {
                id: id.clone(),
                name,
                city: row.branch_city,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            role: row.role,
            is_active: row.is_active,
            company_id: row.company_id,
            branch_id: row.branch_id,
            branch,
        }
    }
}

impl From<&Staff> for StaffProfile {
    fn from(staff: &Staff) -> Self {
        Self {
            id: staff.id.clone(),
            name: staff.name.clone(),
            email: staff.email.clone(),
            mobile: staff.mobile.clone(),
            role: staff.role,
            is_active: staff.is_active,
            company_id: staff.company_id.clone(),
            branch_id: staff.branch_id.clone(),
            branch: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaffSortField {
    #[default]
    CreatedAt,
    Name,
    Email,
    Role,
}

impl StaffSortField {
    pub fn column(self) -> &'static str {
        match self {
            StaffSortField::CreatedAt => "created_at",
            StaffSortField::Name => "name",
            StaffSortField::Email => "email",
            StaffSortField::Role => "role",
        }
    }
}

#[derive(Debug, Default)]
pub struct StaffFilter {
    pub company_id: String,
    pub branch_id: Option<String>,
    pub role: Option<Role>,
    pub search: Option<String>,
    pub sort_by: StaffSortField,
    pub order: SortOrder,
}
