pub mod auth;
pub mod errors;
pub mod gates;
pub mod rate_limit;
