use axum::{
    body::Body,
    extract::Request,
    http::Uri,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{auth, branch, company, health, lead, permission, staff};
use crate::api::middleware::{
    auth::authenticate,
    errors::normalize_errors,
    gates::{require_branch, require_company, require_roles, BranchGate, CompanyGate, RoleGate},
    rate_limit::limit_sensitive_ops,
};
use crate::domain::models::staff::Role;
use crate::error::AppError;
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

const SUPERADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub fn create_router(state: Arc<AppState>) -> Router {
    let limiter = state.sensitive_limiter.clone();

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/auth/signup", post(auth::signup))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))

        // Sensitive, throttled per client
        .route("/api/v1/auth/verify-otp", post(auth::verify_otp)
            .layer(from_fn_with_state(limiter.clone(), limit_sensitive_ops)))
        .route("/api/v1/auth/resend-otp", post(auth::resend_otp)
            .layer(from_fn_with_state(limiter.clone(), limit_sensitive_ops)))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password)
            .layer(from_fn_with_state(limiter.clone(), limit_sensitive_ops)))
        .route("/api/v1/auth/reset-password", post(auth::reset_password)
            .layer(from_fn_with_state(limiter.clone(), limit_sensitive_ops)));

    let protected = Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/password", patch(auth::change_password)
            .layer(from_fn_with_state(limiter.clone(), limit_sensitive_ops)))

        // Companies; per-module permissions are checked in the handlers
        .route("/api/v1/companies", post(company::create_company).get(company::list_companies)
            .layer(from_fn_with_state(RoleGate(SUPERADMIN_ONLY), require_roles)))
        .route("/api/v1/companies/{company_id}", get(company::get_company).patch(company::update_company)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))

        // Branches
        .route("/api/v1/branches", post(branch::create_branch)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))
        .route("/api/v1/companies/{company_id}/branches", get(branch::list_branches)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))
        .route("/api/v1/branches/{branch_id}", get(branch::get_branch).patch(branch::update_branch).delete(branch::delete_branch)
            .layer(from_fn_with_state(BranchGate::new(state.clone()), require_branch)))
        .route("/api/v1/branches/{branch_id}/staff", get(staff::list_branch_staff)
            .layer(from_fn_with_state(BranchGate::new(state.clone()), require_branch)))

        // Staff
        .route("/api/v1/companies/{company_id}/staff", get(staff::list_staff).post(staff::create_staff)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))
        .route("/api/v1/companies/{company_id}/staff/{staff_id}", get(staff::get_staff).patch(staff::update_staff).delete(staff::delete_staff)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))
        .route("/api/v1/companies/{company_id}/staff/{staff_id}/status", patch(staff::set_staff_status)
            .layer(from_fn_with_state(CompanyGate::default(), require_company)))

        // Leads: permission and ownership are checked per handler
        .route("/api/v1/leads", post(lead::create_lead).get(lead::list_leads))
        .route("/api/v1/leads/{lead_id}", get(lead::get_lead).patch(lead::update_lead).delete(lead::delete_lead))

        // Permissions
        .route("/api/v1/permissions", get(permission::list_permissions))
        .route("/api/v1/permissions/roles/{role}", get(permission::get_role_permissions)
            .merge(put(permission::replace_role_permissions)
                .layer(from_fn_with_state(RoleGate(SUPERADMIN_ONLY), require_roles))))

        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), normalize_errors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        company_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Can't find {} on this server.", uri.path()))
}
