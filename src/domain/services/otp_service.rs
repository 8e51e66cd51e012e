use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

use crate::domain::models::otp::{OtpCode, OtpPurpose};
use crate::domain::ports::OtpRepository;
use crate::error::AppError;

pub const MAX_OTP_ATTEMPTS: i32 = 5;
pub const INVALID_OTP: &str = "Invalid or expired OTP";

/// One-time codes for email verification and password resets.
/// Only a SHA-256 digest of each code is stored.
pub struct OtpService {
    repo: Arc<dyn OtpRepository>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(repo: Arc<dyn OtpRepository>, ttl_minutes: i64) -> Self {
        Self {
            repo,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }

    /// Issues a fresh code, replacing any outstanding one, and returns it in clear.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<String, AppError> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let now = Utc::now();

        self.repo
            .upsert(&OtpCode {
                email: email.to_string(),
                purpose,
                code_hash: hash_code(&code),
                attempts: 0,
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await?;

        info!(purpose = purpose.as_str(), "Issued one-time code");
        Ok(code)
    }

    /// Consumes the code on success. A wrong guess burns one attempt; the code is
    /// dropped once it expires or runs out of attempts.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), AppError> {
        let invalid = || AppError::Validation(INVALID_OTP.to_string());

        let stored = self.repo.find(email, purpose).await?.ok_or_else(invalid)?;

        if stored.expires_at <= Utc::now() || stored.attempts >= MAX_OTP_ATTEMPTS {
            self.repo.delete(email, purpose).await?;
            return Err(invalid());
        }

        if stored.code_hash != hash_code(code.trim()) {
            if stored.attempts + 1 >= MAX_OTP_ATTEMPTS {
                self.repo.delete(email, purpose).await?;
            } else {
                self.repo.increment_attempts(email, purpose).await?;
            }
            return Err(invalid());
        }

        self.repo.delete(email, purpose).await
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.repo.delete_expired(Utc::now()).await
    }
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryOtpRepo {
        codes: Mutex<HashMap<(String, &'static str), OtpCode>>,
    }

    #[async_trait]
    impl OtpRepository for MemoryOtpRepo {
        async fn upsert(&self, code: &OtpCode) -> Result<(), AppError> {
            self.codes.lock().unwrap().insert((code.email.clone(), code.purpose.as_str()), code.clone());
            Ok(())
        }

        async fn find(&self, email: &str, purpose: OtpPurpose) -> Result<Option<OtpCode>, AppError> {
            Ok(self.codes.lock().unwrap().get(&(email.to_string(), purpose.as_str())).cloned())
        }

        async fn increment_attempts(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
            if let Some(code) = self.codes.lock().unwrap().get_mut(&(email.to_string(), purpose.as_str())) {
                code.attempts += 1;
            }
            Ok(())
        }

        async fn delete(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
            self.codes.lock().unwrap().remove(&(email.to_string(), purpose.as_str()));
            Ok(())
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
            let mut codes = self.codes.lock().unwrap();
            let before = codes.len();
            codes.retain(|_, c| c.expires_at > now);
            Ok((before - codes.len()) as u64)
        }
    }

    fn service() -> (OtpService, Arc<MemoryOtpRepo>) {
        let repo = Arc::new(MemoryOtpRepo::default());
        (OtpService::new(repo.clone(), 10), repo)
    }

    #[tokio::test]
    async fn test_issue_then_verify_consumes_code() {
        let (otp, repo) = service();
        let code = otp.issue("a@example.com", OtpPurpose::Signup).await.unwrap();
        assert_eq!(code.len(), 6);

        let stored = repo.find("a@example.com", OtpPurpose::Signup).await.unwrap().unwrap();
        assert_ne!(stored.code_hash, code);

        otp.verify("a@example.com", OtpPurpose::Signup, &code).await.unwrap();
        assert!(otp.verify("a@example.com", OtpPurpose::Signup, &code).await.is_err());
    }

    #[tokio::test]
    async fn test_codes_are_scoped_by_purpose() {
        let (otp, _) = service();
        let code = otp.issue("a@example.com", OtpPurpose::Signup).await.unwrap();
        assert!(otp.verify("a@example.com", OtpPurpose::PasswordReset, &code).await.is_err());
    }

    #[tokio::test]
    async fn test_code_invalidated_after_max_wrong_attempts() {
        let (otp, repo) = service();
        let code = otp.issue("a@example.com", OtpPurpose::Signup).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_OTP_ATTEMPTS {
            assert!(otp.verify("a@example.com", OtpPurpose::Signup, wrong).await.is_err());
        }

        assert!(repo.find("a@example.com", OtpPurpose::Signup).await.unwrap().is_none());
        assert!(otp.verify("a@example.com", OtpPurpose::Signup, &code).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let (otp, repo) = service();
        let code = otp.issue("a@example.com", OtpPurpose::PasswordReset).await.unwrap();
        {
            let mut codes = repo.codes.lock().unwrap();
            for c in codes.values_mut() {
                c.expires_at = Utc::now() - Duration::minutes(1);
            }
        }

        let err = otp.verify("a@example.com", OtpPurpose::PasswordReset, &code).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == INVALID_OTP));
        assert_eq!(otp.purge_expired().await.unwrap(), 0);
    }
}
