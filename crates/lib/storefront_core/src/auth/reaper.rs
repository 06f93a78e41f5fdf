//! Background purge of expired revocation records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::AuthError;
use super::revocation::RevocationStore;

/// Default purge interval: 1 hour.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Run one purge pass against `store`.
pub async fn purge_once(store: &dyn RevocationStore, now: DateTime<Utc>) -> Result<u64, AuthError> {
    let deleted = store.purge_expired(now).await?;
    if deleted > 0 {
        info!(deleted, "cleaned up expired revocation records");
    } else {
        debug!("no expired revocation records");
    }
    Ok(deleted)
}

/// Periodic purge task. Purges once immediately, then every `interval`.
///
/// A failed pass is logged and the next tick tries again.
pub struct Reaper {
    store: Arc<dyn RevocationStore>,
    interval: Duration,
}

impl Reaper {
    pub fn new(store: Arc<dyn RevocationStore>, interval: Duration) -> Self {
        Self {
            store,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Spawn the loop on the current runtime; it exits when `ct` is cancelled.
    pub fn spawn(self, ct: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "revocation reaper started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ct.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = purge_once(self.store.as_ref(), Utc::now()).await {
                            error!(error = %e, "error cleaning up revocation records");
                        }
                    }
                }
            }
            info!("revocation reaper stopped");
        })
    }
}
