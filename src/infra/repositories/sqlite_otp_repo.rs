use crate::domain::{
    models::otp::{OtpCode, OtpPurpose},
    ports::OtpRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteOtpRepo {
    pool: SqlitePool,
}

impl SqliteOtpRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for SqliteOtpRepo {
    async fn upsert(&self, code: &OtpCode) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO otp_codes (email, purpose, code_hash, attempts, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(email, purpose) DO UPDATE SET code_hash = excluded.code_hash, attempts = excluded.attempts, \
             expires_at = excluded.expires_at, created_at = excluded.created_at"
        )
            .bind(&code.email)
            .bind(code.purpose.as_str())
            .bind(&code.code_hash)
            .bind(code.attempts)
            .bind(code.expires_at)
            .bind(code.created_at)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn find(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpCode>, AppError> {
        sqlx::query_as::<_, OtpCode>("SELECT * FROM otp_codes WHERE email = ? AND purpose = ?")
            .bind(email)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn increment_attempts(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
        sqlx::query("UPDATE otp_codes SET attempts = attempts + 1 WHERE email = ? AND purpose = ?")
            .bind(email)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
        sqlx::query("DELETE FROM otp_codes WHERE email = ? AND purpose = ?")
            .bind(email)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
