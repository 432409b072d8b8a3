use sightline_core::InferenceResult;
use sightline_core::metrics::{MetricsAggregator, SharedAggregator};
use sightline_core::vision::ModelBackend;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::room::RoomManager;

/// Everything handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomManager,
    pub metrics: SharedAggregator,
    pub detector: ModelBackend,
    pub latest: Arc<RwLock<Option<InferenceResult>>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_detector(config, ModelBackend::default())
    }

    pub fn with_detector(config: ServerConfig, detector: ModelBackend) -> Self {
        let metrics = SharedAggregator::new(MetricsAggregator::new(config.metrics_capacity));

        Self {
            rooms: RoomManager::new(),
            metrics,
            detector,
            latest: Arc::new(RwLock::new(None)),
            config: Arc::new(config),
        }
    }
}
