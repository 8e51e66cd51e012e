use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use crate::domain::ports::{
    BranchRepository, CompanyRepository, EmailService, LeadRepository, OtpRepository,
    PermissionRepository, StaffRepository,
};
use crate::domain::services::{
    auth_service::AuthService,
    otp_service::OtpService,
    permissions::PermissionService,
    rate_limiter::{InMemoryAttemptStore, SensitiveOpLimiter},
    token_service::TokenService,
};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::repositories::{
    postgres_branch_repo::PostgresBranchRepo, postgres_company_repo::PostgresCompanyRepo,
    postgres_lead_repo::PostgresLeadRepo, postgres_otp_repo::PostgresOtpRepo,
    postgres_permission_repo::PostgresPermissionRepo, postgres_staff_repo::PostgresStaffRepo,
    sqlite_branch_repo::SqliteBranchRepo, sqlite_company_repo::SqliteCompanyRepo,
    sqlite_lead_repo::SqliteLeadRepo, sqlite_otp_repo::SqliteOtpRepo,
    sqlite_permission_repo::SqlitePermissionRepo, sqlite_staff_repo::SqliteStaffRepo,
};

/// One repository per aggregate, all backed by the same pool.
pub struct Repositories {
    pub company: Arc<dyn CompanyRepository>,
    pub branch: Arc<dyn BranchRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub lead: Arc<dyn LeadRepository>,
    pub permission: Arc<dyn PermissionRepository>,
    pub otp: Arc<dyn OtpRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            company: Arc::new(SqliteCompanyRepo::new(pool.clone())),
            branch: Arc::new(SqliteBranchRepo::new(pool.clone())),
            staff: Arc::new(SqliteStaffRepo::new(pool.clone())),
            lead: Arc::new(SqliteLeadRepo::new(pool.clone())),
            permission: Arc::new(SqlitePermissionRepo::new(pool.clone())),
            otp: Arc::new(SqliteOtpRepo::new(pool)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            company: Arc::new(PostgresCompanyRepo::new(pool.clone())),
            branch: Arc::new(PostgresBranchRepo::new(pool.clone())),
            staff: Arc::new(PostgresStaffRepo::new(pool.clone())),
            lead: Arc::new(PostgresLeadRepo::new(pool.clone())),
            permission: Arc::new(PostgresPermissionRepo::new(pool.clone())),
            otp: Arc::new(PostgresOtpRepo::new(pool)),
        }
    }
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let database_url = &config.database_url;
    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));

    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");
        Repositories::postgres(connect_postgres(database_url).await?)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");
        Repositories::sqlite(connect_sqlite(database_url).await?)
    };

    build_state(config, repos, email_service).await
}

/// Wires services on top of the given repositories and seeds the permission catalog.
pub async fn build_state(
    config: &Config,
    repos: Repositories,
    email_service: Arc<dyn EmailService>,
) -> Result<AppState, AppError> {
    let templates = Arc::new(load_templates()?);

    let token_service = Arc::new(TokenService::new(config));
    let otp_service = Arc::new(OtpService::new(repos.otp.clone(), config.otp_ttl_minutes));
    let auth_service = Arc::new(AuthService::new(
        repos.staff.clone(),
        otp_service.clone(),
        token_service.clone(),
        email_service.clone(),
        templates.clone(),
    ));
    let permission_service = Arc::new(PermissionService::new(repos.permission.clone()));
    let sensitive_limiter = Arc::new(SensitiveOpLimiter::new(
        Arc::new(InMemoryAttemptStore::new()),
        config.sensitive_op_max_attempts,
        config.sensitive_op_window,
    ));

    permission_service.seed().await?;

    match (&config.superadmin_email, &config.superadmin_password) {
        (Some(email), Some(password)) => auth_service.ensure_superadmin(email, password).await?,
        (Some(_), None) | (None, Some(_)) => {
            warn!("SUPERADMIN_EMAIL and SUPERADMIN_PASSWORD must both be set; skipping superadmin bootstrap")
        }
        (None, None) => {}
    }

    Ok(AppState {
        config: config.clone(),
        company_repo: repos.company,
        branch_repo: repos.branch,
        staff_repo: repos.staff,
        lead_repo: repos.lead,
        permission_repo: repos.permission,
        otp_repo: repos.otp,
        token_service,
        otp_service,
        auth_service,
        permission_service,
        sensitive_limiter,
        email_service,
        templates,
    })
}

pub fn load_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("otp_signup.html", include_str!("../templates/otp_signup.html")),
        ("otp_reset.html", include_str!("../templates/otp_reset.html")),
    ])
    .map_err(|e| AppError::InternalWithMsg(format!("Failed to load email templates: {}", e)))?;
    Ok(tera)
}

pub async fn connect_postgres(database_url: &str) -> Result<PgPool, AppError> {
    let opts: PgConnectOptions = database_url.parse()?;
    let opts = opts.log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/postgres")
        .run(&pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))?;
    Ok(pool)
}

pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/sqlite")
        .run(&pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))?;
    Ok(pool)
}
