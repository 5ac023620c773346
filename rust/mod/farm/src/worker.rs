use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::FarmService;

/// Configuration for the background alert sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to look for stale alerts (seconds).
    pub interval_secs: u64,
    /// Active alerts triggered longer ago than this are resolved.
    pub stale_after_hours: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            stale_after_hours: 24,
        }
    }
}

/// Start the stale-alert sweep loop.
///
/// Returns a CancellationToken that stops the loop when cancelled.
pub fn start(svc: Arc<FarmService>, config: SweepConfig) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let interval = Duration::from_secs(config.interval_secs.max(1));
    let hours = config.stale_after_hours;

    tokio::spawn(async move {
        info!("alert sweep started (interval={interval:?}, stale_after={hours}h)");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("alert sweep stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    debug!("alert sweep scan");
                    let svc = Arc::clone(&svc);
                    let result = tokio::task::spawn_blocking(move || svc.auto_resolve_stale(hours)).await;
                    match result {
                        Ok(Ok(0)) => {}
                        Ok(Ok(n)) => info!("alert sweep: resolved {n} stale alerts"),
                        Ok(Err(e)) => error!("alert sweep error: {e}"),
                        Err(e) => error!("alert sweep task failed: {e}"),
                    }
                }
            }
        }
    });

    cancel
}
