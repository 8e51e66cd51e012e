pub mod auth;
pub mod branch;
pub mod company;
pub mod health;
pub mod lead;
pub mod permission;
pub mod staff;
