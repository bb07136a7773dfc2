use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::metrics::PRUNED_TIMESTAMPS;
use crate::registry::KeyRegistry;

// Prune worker - drops usage timestamps no requested window can see
pub async fn prune_worker(registry: Arc<KeyRegistry>, every: Duration) {
    let mut interval = interval(every);

    info!("Prune worker started (interval: {:?})", every);

    loop {
        interval.tick().await;

        match registry.prune_expired() {
            Ok(0) => {}
            Ok(removed) => {
                PRUNED_TIMESTAMPS.inc_by(removed as f64);
                debug!("Pruned {} expired usage timestamps", removed);
            }
            // torn down or not yet loaded, try again next tick
            Err(e) => debug!("Skipping prune: {}", e),
        }
    }
}
