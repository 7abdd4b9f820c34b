use campus_placement::config::PlacementConfig;
use campus_placement::placement::{InMemoryPlacementRepository, PlacementService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryPlacementService = PlacementService<InMemoryPlacementRepository>;

/// Fresh in-process store behind the placement service; state lives as long as the process.
pub(crate) fn in_memory_service(config: PlacementConfig) -> Arc<MemoryPlacementService> {
    Arc::new(PlacementService::new(
        Arc::new(InMemoryPlacementRepository::default()),
        config,
    ))
}
