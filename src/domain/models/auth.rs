use serde::{Deserialize, Serialize};

use super::staff::StaffProfile;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: StaffProfile,
}

/// A self-service signup: a new company together with its first ADMIN.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub company_name: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password: String,
}
