mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use common::{json_request, parse_body, TestApp, TEST_PASSWORD};
use jsonwebtoken::{encode, EncodingKey, Header};
use pestops_backend::domain::models::{
    auth::Claims,
    company::Company,
    staff::{NewStaff, Role, Staff},
};
use pestops_backend::domain::services::auth_service::hash_password;
use serde_json::json;

fn signup_payload(email: &str) -> serde_json::Value {
    json!({
        "company_name": "Bug Busters",
        "name": "Asha Patil",
        "email": email,
        "mobile": "9800000000",
        "password": TEST_PASSWORD,
    })
}

#[tokio::test]
async fn test_signup_verify_and_login() {
    let app = TestApp::new().await;
    let email = "owner@bugbusters.test";

    let res = app.send(json_request("POST", "/api/v1/auth/signup", None, signup_payload(email))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = parse_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], email);
    let company_id = body["data"]["company_id"].as_str().unwrap().to_string();

    // Unverified accounts cannot log in yet
    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({
        "email": email, "password": TEST_PASSWORD
    }))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let code = app.mailer.last_code_for(email).expect("No verification code mailed");

    let res = app.send(json_request("POST", "/api/v1/auth/verify-otp", None, json!({
        "email": email, "otp": "000000"
    }))).await;
    if code != "000000" {
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_body(res).await["message"], "Invalid or expired OTP");
    }

    let res = app.send(json_request("POST", "/api/v1/auth/verify-otp", None, json!({
        "email": email, "otp": code
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("jwt="));
    assert!(cookie.contains("HttpOnly"));
    let body = parse_body(res).await;
    assert_eq!(body["data"]["user"]["role"], "ADMIN");
    assert_eq!(body["data"]["user"]["company_id"], company_id.as_str());

    // Code is single use
    let res = app.send(json_request("POST", "/api/v1/auth/verify-otp", None, json!({
        "email": email, "otp": code
    }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let token = app.login(email, TEST_PASSWORD).await;
    let res = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = parse_body(res).await;
    assert_eq!(me["data"]["email"], email);
    assert!(me["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let app = TestApp::new().await;

    let res = app.send(json_request("POST", "/api/v1/auth/signup", None, signup_payload("dup@pest.test"))).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app.send(json_request("POST", "/api/v1/auth/signup", None, signup_payload("DUP@pest.test"))).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_signup_insert_leaves_no_company() {
    let app = TestApp::new().await;
    let existing = app.seed_company("Acme Pest").await;
    app.seed_staff(Some(&existing.id), None, Role::Admin, "taken@acme.test").await;

    // Same insert a racing signup would make once both passed the email lookup
    let company = Company::new("Late Arrival".to_string(), None, None, None);
    let staff = Staff::new(NewStaff {
        company_id: Some(company.id.clone()),
        branch_id: None,
        name: "Late Owner".to_string(),
        email: "taken@acme.test".to_string(),
        mobile: None,
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        role: Role::Admin,
        is_verified: false,
    });
    let err = app.state.staff_repo.create_with_company(&company, &staff).await.unwrap_err();
    assert_eq!(err.classify().0, StatusCode::CONFLICT);

    assert!(app.state.company_repo.find_by_id(&company.id).await.unwrap().is_none());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies").fetch_one(&app.pool).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_signup_validation_collects_errors() {
    let app = TestApp::new().await;

    let res = app.send(json_request("POST", "/api/v1/auth/signup", None, json!({
        "company_name": "",
        "name": "",
        "email": "not-an-email",
        "password": "short",
    }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid input data."));
}

#[tokio::test]
async fn test_wrong_credentials_are_rejected_uniformly() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;

    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({
        "email": "admin@acme.test", "password": "wrong-password"
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = parse_body(res).await;

    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({
        "email": "nobody@acme.test", "password": "wrong-password"
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = parse_body(res).await;

    assert_eq!(wrong_password["message"], unknown_email["message"]);

    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({ "email": "", "password": "" }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_invalid_and_expired_tokens() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    let admin = app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;

    let res = app.send(Request::builder().uri("/api/v1/auth/me").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_body(res).await["message"], "You are not logged in. Please log in to get access.");

    let res = app.get("/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_body(res).await["message"], "Invalid token. Please log in again.");

    let config = &app.state.config;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        iss: config.jwt_issuer.clone(),
        sub: admin.id.clone(),
        aud: config.jwt_audience.clone(),
        exp: now - 3600,
        iat: now - 7200,
    };
    let expired = encode(&Header::default(), &claims, &EncodingKey::from_secret(config.jwt_secret.as_bytes())).unwrap();
    let res = app.get("/api/v1/auth/me", &expired).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(parse_body(res).await["message"].as_str().unwrap().contains("expired"));

    let foreign = Claims {
        iss: "someone-else".to_string(),
        exp: now + 3600,
        ..claims
    };
    let foreign = encode(&Header::default(), &foreign, &EncodingKey::from_secret(config.jwt_secret.as_bytes())).unwrap();
    let res = app.get("/api/v1/auth/me", &foreign).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_session_and_logout() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;
    let token = app.login("admin@acme.test", TEST_PASSWORD).await;

    let res = app.send(
        Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("jwt={}", token))
            .body(Body::empty())
            .unwrap(),
    ).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send(Request::builder().method("POST").uri("/api/v1/auth/logout").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("jwt=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_deactivated_and_deleted_users_lose_access() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    let tech = app.seed_staff(Some(&company.id), None, Role::Admin, "tech@acme.test").await;
    let token = app.login("tech@acme.test", TEST_PASSWORD).await;

    app.state.staff_repo.set_active(&tech.id, false).await.unwrap();
    let res = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({
        "email": "tech@acme.test", "password": TEST_PASSWORD
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    sqlx::query("DELETE FROM staff WHERE id = ?").bind(&tech.id).execute(&app.pool).await.unwrap();
    let res = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_body(res).await["message"], "The user belonging to this token no longer exists.");
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;

    // Unknown addresses get the same answer and no mail
    let res = app.send(json_request("POST", "/api/v1/auth/forgot-password", None, json!({ "email": "ghost@acme.test" }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.mailer.count_for("ghost@acme.test"), 0);

    let res = app.send(json_request("POST", "/api/v1/auth/forgot-password", None, json!({ "email": "admin@acme.test" }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let code = app.mailer.last_code_for("admin@acme.test").expect("No reset code mailed");

    let res = app.send(json_request("POST", "/api/v1/auth/reset-password", None, json!({
        "email": "admin@acme.test", "otp": code, "password": "short"
    }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.send(json_request("POST", "/api/v1/auth/reset-password", None, json!({
        "email": "admin@acme.test", "otp": code, "password": "BrandNewPass1"
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send(json_request("POST", "/api/v1/auth/login", None, json!({
        "email": "admin@acme.test", "password": TEST_PASSWORD
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    app.login("admin@acme.test", "BrandNewPass1").await;
}

#[tokio::test]
async fn test_change_password_requires_current() {
    let app = TestApp::new().await;
    let company = app.seed_company("Acme Pest").await;
    app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;
    let token = app.login("admin@acme.test", TEST_PASSWORD).await;

    let res = app.patch_json("/api/v1/auth/password", &token, json!({
        "current_password": "not-it",
        "new_password": "AnotherPass99"
    })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.patch_json("/api/v1/auth/password", &token, json!({
        "current_password": TEST_PASSWORD,
        "new_password": "AnotherPass99"
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(parse_body(res).await["data"]["token"].is_string());

    app.login("admin@acme.test", "AnotherPass99").await;
}

#[tokio::test]
async fn test_superadmin_is_bootstrapped() {
    let app = TestApp::new().await;
    let token = app.login_superadmin().await;

    let res = app.get("/api/v1/auth/me", &token).await;
    let body = parse_body(res).await;
    assert_eq!(body["data"]["role"], "SUPERADMIN");
    assert!(body["data"]["company_id"].is_null());
}
