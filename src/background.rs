use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, Instrument};
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drops expired OTP codes and closed rate-limit windows.
pub async fn start_maintenance_worker(state: Arc<AppState>) {
    info!("Starting maintenance worker...");

    loop {
        sweep(&state).instrument(info_span!("maintenance_sweep")).await;
        sleep(SWEEP_INTERVAL).await;
    }
}

pub async fn sweep(state: &AppState) {
    match state.otp_service.purge_expired().await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Purged expired OTP codes"),
        Err(e) => error!("Failed to purge expired OTP codes: {:?}", e),
    }

    let windows = state.sensitive_limiter.store().purge_expired(Instant::now());
    if windows > 0 {
        debug!(windows, "Dropped closed rate-limit windows");
    }
}
