//! Expiry sweep background task.
//!
//! Lazy expiration only notices a lapsed ban when the principal is read. The
//! sweep walks the expiry index on an interval and lifts lapsed bans of
//! principals nobody looks at.

use crate::config::SweepConfig;
use crate::manager::BanManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Spawn the expiry sweep if the configuration enables it.
pub fn spawn_from_config(manager: Arc<BanManager>, config: &SweepConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        debug!("Expiry sweep disabled");
        return None;
    }
    Some(spawn_expiry_sweeper(
        manager,
        config.interval(),
        config.batch_size,
    ))
}

/// Spawn the expiry sweep background task.
///
/// Each tick lifts at most `batch_size` lapsed bans. Errors are logged and the
/// task keeps running until aborted.
pub fn spawn_expiry_sweeper(
    manager: Arc<BanManager>,
    interval: Duration,
    batch_size: usize,
) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), batch_size, "Starting expiry sweep");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);

        loop {
            interval.tick().await;
            match manager.sweep_expired(batch_size).await {
                Ok(lifted) if !lifted.is_empty() => {
                    debug!(count = lifted.len(), "Expiry sweep lifted bans");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, code = e.error_code(), "Expiry sweep failed");
                }
            }
        }
    })
}
