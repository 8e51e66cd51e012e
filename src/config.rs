use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub jwt_cookie_expires_in_days: i64,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub otp_ttl_minutes: i64,
    pub sensitive_op_max_attempts: u32,
    pub sensitive_op_window: Duration,
    pub superadmin_email: Option<String>,
    pub superadmin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = match env::var("APP_ENV").unwrap_or_default().to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        };

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                value: "secret shorter than 32 characters".to_string(),
            });
        }

        let jwt_expires_raw = env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string());
        let jwt_expires_in = parse_duration(&jwt_expires_raw).ok_or(ConfigError::Invalid {
            name: "JWT_EXPIRES_IN",
            value: jwt_expires_raw.clone(),
        })?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            port: parse_var("PORT", 3000)?,
            environment,
            jwt_secret,
            jwt_expires_in,
            jwt_cookie_expires_in_days: parse_var("JWT_COOKIE_EXPIRES_IN", 7)?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "pestops-api".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pestops-client".to_string()),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_default(),
            otp_ttl_minutes: parse_var("OTP_TTL_MINUTES", 10)?,
            sensitive_op_max_attempts: parse_var("SENSITIVE_OP_MAX_ATTEMPTS", 5)?,
            sensitive_op_window: Duration::from_secs(parse_var("SENSITIVE_OP_WINDOW_SECS", 900)?),
            superadmin_email: env::var("SUPERADMIN_EMAIL").ok().filter(|v| !v.is_empty()),
            superadmin_password: env::var("SUPERADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Parses `7d`, `12h`, `30m`, `45s` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 60 * 60,
        "d" => value * 60 * 60 * 24,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_duration("12h"), Some(Duration::from_secs(12 * 3_600)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("3600"), Some(Duration::from_secs(3_600)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("d"), None);
        assert_eq!(parse_duration("10w"), None);
        assert_eq!(parse_duration("1.5h"), None);
    }
}
