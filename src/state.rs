//! Shared application state handed to the router.
//!
//! Replaces ambient globals with one owned instance of each core component;
//! handlers receive a cheap `Clone` of this handle via axum state.

use std::sync::Arc;

use crate::config::Config;
use crate::fabric::DistributionFabric;
use crate::inbox::AlertInbox;
use crate::store::ReadingStore;

// ---

#[derive(Clone)]
pub struct AppState {
    // ---
    pub store: Arc<ReadingStore>,
    pub fabric: Arc<DistributionFabric>,
    pub inbox: Arc<AlertInbox>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // ---
        AppState {
            store: Arc::new(ReadingStore::new(
                config.retention_days,
                config.max_readings_per_city,
            )),
            fabric: Arc::new(DistributionFabric::new(config.subscriber_queue_capacity)),
            inbox: Arc::new(AlertInbox::new(config.default_thresholds.clone())),
            config,
        }
    }
}
