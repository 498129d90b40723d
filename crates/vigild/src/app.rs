use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};
use tracing::{debug, info};

use vigil_core::{WorkFn, WorkRef};
use vigil_server::{AppError, Application};

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Demo application: health and version routes plus a progress counter
/// advanced by the coordinated periodic task.
#[derive(Debug, Default)]
pub struct ProgressApp {
    progress: Arc<AtomicU64>,
}

impl ProgressApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Application for ProgressApp {
    fn name(&self) -> &str {
        NAME
    }

    async fn initialize(&self) -> Result<(), AppError> {
        info!(app = NAME, version = VERSION, "application initialized");
        Ok(())
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .route("/version", get(version))
            .route("/progress", get(progress))
            .with_state(Arc::clone(&self.progress))
    }

    fn work_unit(&self) -> WorkRef {
        let progress = Arc::clone(&self.progress);
        WorkFn::arc("update_progress", move || {
            let progress = Arc::clone(&progress);
            async move {
                let step = progress.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(step, "progress advanced");
                Ok(())
            }
        })
    }
}

async fn version() -> Json<Value> {
    Json(json!({ "name": NAME, "version": VERSION }))
}

/// Progress as seen by this process.
async fn progress(State(progress): State<Arc<AtomicU64>>) -> Json<Value> {
    Json(json!({ "progress": progress.load(Ordering::Relaxed) }))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn work_unit_advances_progress() {
        let app = ProgressApp::new();
        let work = app.work_unit();
        work.run().await.unwrap();
        work.run().await.unwrap();
        assert_eq!(app.progress(), 2);
    }

    #[tokio::test]
    async fn version_route_reports_package() {
        let app = ProgressApp::new();
        let res = app
            .router()
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(res.status().is_success());

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "vigild");
        assert_eq!(json["version"], VERSION);
    }
}
