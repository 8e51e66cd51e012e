use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::dtos::requests::{
    ChangePasswordRequest, EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, VerifyOtpRequest,
};
use crate::api::dtos::responses::{ApiResponse, MessageResponse, SignupResponse};
use crate::api::extractors::{auth::CurrentUser, meta::ClientMeta};
use crate::domain::models::auth::{AuthResponse, NewAccount};
use crate::domain::services::auth_service::Session;
use crate::error::AppError;
use crate::state::AppState;

const CODE_SENT: &str = "If an account exists for this email, a code has been sent.";

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let staff = state
        .auth_service
        .signup(NewAccount {
            company_name: payload.company_name.trim().to_string(),
            name: payload.name.trim().to_string(),
            email: payload.email,
            mobile: payload.mobile,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SignupResponse {
            staff_id: staff.id,
            company_id: staff.company_id,
            email: staff.email,
        })),
    ))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth_service.verify_signup(&payload.email, &payload.otp, &meta).await?;
    Ok(start_session(&state, &cookies, session))
}

pub async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.resend_signup_code(&payload.email).await?;
    Ok(Json(MessageResponse::new(CODE_SENT)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let session = state.auth_service.login(&payload.email, &payload.password, &meta).await?;
    Ok(start_session(&state, &cookies, session))
}

pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> impl IntoResponse {
    cookies.add(state.token_service.expired_cookie());
    info!("Session cookie cleared");
    Json(MessageResponse::new("Logged out"))
}

pub async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::ok(user))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse::new(CODE_SENT)))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .reset_password(&payload.email, &payload.otp, &payload.password, &meta)
        .await?;
    Ok(Json(MessageResponse::new("Password has been reset. Please log in.")))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth_service
        .change_password(&user.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(start_session(&state, &cookies, session))
}

fn start_session(state: &AppState, cookies: &Cookies, session: Session) -> Json<ApiResponse<AuthResponse>> {
    cookies.add(state.token_service.session_cookie(session.token.clone()));
    Json(ApiResponse::ok(AuthResponse {
        token: session.token,
        user: session.user,
    }))
}
