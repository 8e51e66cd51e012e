pub mod access;
pub mod auth_service;
pub mod otp_service;
pub mod permissions;
pub mod rate_limiter;
pub mod token_service;
