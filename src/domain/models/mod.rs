pub mod auth;
pub mod branch;
pub mod company;
pub mod lead;
pub mod otp;
pub mod pagination;
pub mod permission;
pub mod security;
pub mod staff;
