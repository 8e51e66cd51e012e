pub mod sqlite_branch_repo;
pub mod sqlite_company_repo;
pub mod sqlite_lead_repo;
pub mod sqlite_otp_repo;
pub mod sqlite_permission_repo;
pub mod sqlite_staff_repo;

pub mod postgres_branch_repo;
pub mod postgres_company_repo;
pub mod postgres_lead_repo;
pub mod postgres_otp_repo;
pub mod postgres_permission_repo;
pub mod postgres_staff_repo;
