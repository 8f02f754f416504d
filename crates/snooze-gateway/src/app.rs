use axum::{routing::get, Router};
use snooze_core::config::SnoozeConfig;
use snooze_queue::JobQueue;
use snooze_scheduler::SchedulerService;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: SnoozeConfig,
    pub scheduler: SchedulerService,
    /// Direct queue handle for the read-only dashboard introspection.
    pub queue: JobQueue,
}

impl AppState {
    pub fn new(config: SnoozeConfig, scheduler: SchedulerService, queue: JobQueue) -> Self {
        Self {
            config,
            scheduler,
            queue,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::dashboard::dashboard_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/add-job", get(crate::http::jobs::add_job_handler))
        .route("/delete-job", get(crate::http::jobs::delete_job_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
