use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Branch {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub mobile: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(company_id: String, name: String, city: Option<String>, address: Option<String>, mobile: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            company_id,
            name,
            city,
            address,
            mobile,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BranchSummary {
    pub id: String,
    pub name: String,
    pub city: Option<String>,
}
