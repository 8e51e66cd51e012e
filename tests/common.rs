use pestops_backend::{
    api::router::create_router,
    config::{Config, Environment},
    domain::models::{branch::Branch, company::Company, staff::{NewStaff, Role, Staff}},
    domain::ports::EmailService,
    domain::services::auth_service::hash_password,
    error::AppError,
    infra::factory::{build_state, connect_sqlite, Repositories},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Passw0rd!234";
pub const SUPERADMIN_EMAIL: &str = "root@pestops.test";
pub const SUPERADMIN_PASSWORD: &str = "RootPassw0rd!";

#[derive(Clone, Debug)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

impl MockEmailService {
    /// The six digit code from the latest mail sent to `recipient`.
    pub fn last_code_for(&self, recipient: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let mail = sent.iter().rev().find(|m| m.recipient == recipient)?;
        extract_code(&mail.html_body)
    }

    pub fn count_for(&self, recipient: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| m.recipient == recipient).count()
    }
}

fn extract_code(html: &str) -> Option<String> {
    let bytes = html.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        match (b.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s == 6 {
                    return Some(html[s..i].to_string());
                }
                start = None;
            }
            _ => {}
        }
    }
    None
}

pub fn test_config(db_url: &str) -> Config {
    Config {
        database_url: db_url.to_string(),
        port: 0,
        environment: Environment::Production,
        jwt_secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        jwt_expires_in: Duration::from_secs(3600),
        jwt_cookie_expires_in_days: 1,
        jwt_issuer: "pestops-test".to_string(),
        jwt_audience: "pestops-test-clients".to_string(),
        mail_service_url: "http://localhost".to_string(),
        mail_service_token: "token".to_string(),
        otp_ttl_minutes: 10,
        sensitive_op_max_attempts: 100,
        sensitive_op_window: Duration::from_secs(900),
        superadmin_email: Some(SUPERADMIN_EMAIL.to_string()),
        superadmin_password: Some(SUPERADMIN_PASSWORD.to_string()),
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub mailer: Arc<MockEmailService>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let mut config = test_config(&db_url);
        adjust(&mut config);

        let pool = connect_sqlite(&db_url).await.expect("Failed to connect to test db");
        let mailer = Arc::new(MockEmailService::default());

        let state = build_state(&config, Repositories::sqlite(pool.clone()), mailer.clone())
            .await
            .expect("Failed to build test state");
        let state = Arc::new(state);
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            mailer,
        }
    }

    pub async fn seed_company(&self, name: &str) -> Company {
        let company = Company::new(name.to_string(), None, None, None);
        self.state.company_repo.create(&company).await.unwrap()
    }

    pub async fn seed_branch(&self, company_id: &str, name: &str) -> Branch {
        let branch = Branch::new(company_id.to_string(), name.to_string(), Some("Pune".to_string()), None, None);
        self.state.branch_repo.create(&branch).await.unwrap()
    }

    pub async fn seed_staff(&self, company_id: Option<&str>, branch_id: Option<&str>, role: Role, email: &str) -> Staff {
        let staff = Staff::new(NewStaff {
            company_id: company_id.map(str::to_string),
            branch_id: branch_id.map(str::to_string),
            name: format!("{} member", role),
            email: email.to_string(),
            mobile: None,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role,
            is_verified: true,
        });
        self.state.staff_repo.create(&staff).await.unwrap()
    }

    /// Logs in and returns the bearer token from the response body.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .send(json_request("POST", "/api/v1/auth/login", None, serde_json::json!({
                "email": email,
                "password": password,
            })))
            .await;

        if response.status() != StatusCode::OK {
            let status = response.status();
            panic!("Login failed in test helper: status {}, body {:?}", status, parse_body(response).await);
        }

        let body = parse_body(response).await;
        body["data"]["token"].as_str().expect("No token in login response").to_string()
    }

    pub async fn login_superadmin(&self) -> String {
        self.login(SUPERADMIN_EMAIL, SUPERADMIN_PASSWORD).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(json_request("POST", uri, Some(token), body)).await
    }

    pub async fn patch_json(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(json_request("PATCH", uri, Some(token), body)).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(json_request("PUT", uri, Some(token), body)).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn parse_body(response: Response) -> Value {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        panic!("Response body is empty. Status: {}", status);
    }
    match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => panic!("Failed to parse JSON: {:?}. Status: {}. Body: {:?}", e, status, String::from_utf8_lossy(&bytes)),
    }
}
