use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::pagination::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Quoted,
    Won,
    Lost,
}

#[derive(Error, Debug)]
#[error("unknown lead status: {0}")]
pub struct UnknownLeadStatus(pub String);

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::Quoted => "QUOTED",
            LeadStatus::Won => "WON",
            LeadStatus::Lost => "LOST",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownLeadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(LeadStatus::New),
            "CONTACTED" => Ok(LeadStatus::Contacted),
            "QUOTED" => Ok(LeadStatus::Quoted),
            "WON" => Ok(LeadStatus::Won),
            "LOST" => Ok(LeadStatus::Lost),
            other => Err(UnknownLeadStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for LeadStatus {
    type Error = UnknownLeadStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Lead {
    pub id: String,
    pub company_id: String,
    pub branch_id: String,
    pub customer_name: String,
    pub email: Option<String>,
    pub mobile: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub service_type: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewLead {
    pub company_id: String,
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
    pub created_by: String,
}

impl Lead {
    pub fn new(params: NewLead) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            company_id: params.company_id,
            branch_id: params.branch_id,
            customer_name: params.customer_name,
            email: params.email,
            mobile: params.mobile,
            address: params.address,
            city: params.city,
            service_type: params.service_type,
            status: LeadStatus::New,
            source: params.source,
            notes: params.notes,
            assigned_to: params.assigned_to,
            created_by: params.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    CustomerName,
    Status,
}

impl LeadSortField {
    pub fn column(self) -> &'static str {
        match self {
            LeadSortField::CreatedAt => "created_at",
            LeadSortField::UpdatedAt => "updated_at",
            LeadSortField::CustomerName => "customer_name",
            LeadSortField::Status => "status",
        }
    }
}

/// Narrowing applied to lead listings; `company_id` is `None` only for SUPERADMIN-wide queries.
#[derive(Debug, Default, Clone)]
pub struct LeadFilter {
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<LeadStatus>,
    pub search: Option<String>,
    pub sort_by: LeadSortField,
    pub order: SortOrder,
}
