use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use thiserror::Error;
use tower_cookies::cookie::SameSite;
use tower_cookies::Cookie;

use crate::config::Config;
use crate::domain::models::auth::Claims;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies stateless HS256 session tokens and builds the session cookie.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expires_in: Duration,
    cookie_max_age: time::Duration,
    secure_cookies: bool,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expires_in: config.jwt_expires_in,
            cookie_max_age: time::Duration::days(config.jwt_cookie_expires_in_days),
            secure_cookies: config.environment.is_production(),
        }
    }

    pub fn issue(&self, staff_id: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        self.sign(staff_id, now, now + self.expires_in.as_secs() as i64)
    }

    fn sign(&self, staff_id: &str, issued_at: i64, expires_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: staff_id.to_string(),
            aud: self.audience.clone(),
            exp: expires_at.max(0) as usize,
            iat: issued_at.max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(self.cookie_max_age)
            .build()
    }

    /// An already-expired replacement for the session cookie.
    pub fn expired_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}
