mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::TestApp;
use pestops_backend::{
    background::sweep,
    domain::models::{otp::{OtpCode, OtpPurpose}, security::RequestMeta},
};
use std::time::Duration;

#[tokio::test]
async fn test_sweep_drops_expired_codes_and_windows() {
    let app = TestApp::with_config(|c| c.sensitive_op_window = Duration::from_millis(10)).await;

    let stale = OtpCode {
        email: "stale@acme.test".to_string(),
        purpose: OtpPurpose::Signup,
        code_hash: "00".to_string(),
        attempts: 0,
        expires_at: Utc::now() - ChronoDuration::minutes(1),
        created_at: Utc::now() - ChronoDuration::minutes(11),
    };
    app.state.otp_repo.upsert(&stale).await.unwrap();
    let live_code = app.state.otp_service.issue("live@acme.test", OtpPurpose::PasswordReset).await.unwrap();

    let meta = RequestMeta {
        ip: "10.1.1.1".to_string(),
        user_agent: "test".to_string(),
        path: "/api/v1/auth/forgot-password".to_string(),
    };
    app.state.sensitive_limiter.check(&meta, None).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    sweep(&app.state).await;

    assert!(app.state.otp_repo.find("stale@acme.test", OtpPurpose::Signup).await.unwrap().is_none());
    assert!(app.state.otp_repo.find("live@acme.test", OtpPurpose::PasswordReset).await.unwrap().is_some());
    assert_eq!(app.state.sensitive_limiter.store().purge_expired(std::time::Instant::now()), 0);

    app.state.otp_service.verify("live@acme.test", OtpPurpose::PasswordReset, &live_code).await.unwrap();
}
