use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use vigil_core::{ShutdownCoordinator, ShutdownReason};
use vigil_model::WorkerBudget;
use vigil_prometheus::PrometheusMetrics;

/// Per-process request budget; reaching it asks the process to stop so the
/// arbiter can replace it.
pub(crate) struct RequestBudget {
    limit: u64,
    served: AtomicU64,
    coordinator: Arc<ShutdownCoordinator>,
}

impl RequestBudget {
    pub(crate) fn new(limit: u64, coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self {
            limit,
            served: AtomicU64::new(0),
            coordinator,
        }
    }

    pub(crate) fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    fn record(&self) {
        let served = self.served.fetch_add(1, Ordering::Relaxed) + 1;
        if served == self.limit {
            info!(served, limit = self.limit, "max requests reached; recycling");
            self.coordinator.trigger(ShutdownReason::Requested);
        }
    }
}

async fn count_requests(
    State(budget): State<Arc<RequestBudget>>,
    req: Request,
    next: Next,
) -> Response {
    budget.record();
    next.run(req).await
}

/// GET /metrics
async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Wrap the application routes with the per-process serving stack.
///
/// Layers, outermost first: tracing, connection limit, request timeout
/// (answers 408), request budget.
pub(crate) fn serving_stack(
    app: Router,
    budget: &WorkerBudget,
    recycle: Option<Arc<RequestBudget>>,
    metrics: Option<PrometheusMetrics>,
) -> Router {
    let mut router = app;

    if let Some(metrics) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(metrics),
        );
    }
    if let Some(recycle) = recycle {
        router = router.layer(middleware::from_fn_with_state(recycle, count_requests));
    }

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            budget.timeout(),
        ))
        .layer(GlobalConcurrencyLimitLayer::new(budget.worker_connections))
        .layer(TraceLayer::new_for_http())
}
