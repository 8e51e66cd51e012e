use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

#[derive(Error, Debug)]
#[error("unknown otp purpose: {0}")]
pub struct UnknownOtpPurpose(pub String);

impl OtpPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpPurpose::Signup => "SIGNUP",
            OtpPurpose::PasswordReset => "PASSWORD_RESET",
        }
    }
}

impl FromStr for OtpPurpose {
    type Err = UnknownOtpPurpose;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIGNUP" => Ok(OtpPurpose::Signup),
            "PASSWORD_RESET" => Ok(OtpPurpose::PasswordReset),
            other => Err(UnknownOtpPurpose(other.to_string())),
        }
    }
}

impl TryFrom<String> for OtpPurpose {
    type Error = UnknownOtpPurpose;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, FromRow, Clone)]
pub struct OtpCode {
    pub email: String,
    #[sqlx(try_from = "String")]
    pub purpose: OtpPurpose,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
