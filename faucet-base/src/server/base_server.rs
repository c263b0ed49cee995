use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use derive_new::new;
use eyre::WrapErr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info_span, Instrument};

use crate::CoreMetrics;

/// A server that serves agent-specific routes
#[derive(new, Debug)]
pub struct Server {
    listen_port: u16,
    core_metrics: Arc<CoreMetrics>,
}

impl Server {
    /// Run an HTTP server serving agent-specific different routes
    ///
    /// routes:
    ///  - metrics - serving OpenMetrics format reports on `/metrics`
    ///     (this is compatible with Prometheus, which ought to be configured to scrape this endpoint)
    ///  - custom_routes - additional routes to be served by the server as per the specific agent
    pub fn run_with_custom_router(self: Arc<Self>, router: Router) -> JoinHandle<eyre::Result<()>> {
        let port = self.listen_port;
        tracing::info!(port, "starting server on 0.0.0.0");

        let app = self.router().merge(router);

        tokio::spawn(
            async move {
                let url = format!("0.0.0.0:{}", port);
                let listener = tokio::net::TcpListener::bind(&url)
                    .await
                    .wrap_err_with(|| format!("Failed to bind to {url}"))?;
                axum::serve(listener, app)
                    .await
                    .wrap_err("Failed to start server")
            }
            .instrument(info_span!("agent::server")),
        )
    }

    /// The routes served by every agent
    pub fn router(&self) -> Router {
        let core_metrics = self.core_metrics.clone();
        Router::new().route("/metrics", get(move || Self::gather_metrics(core_metrics)))
    }

    /// Gather available metrics into an encoded (plaintext, OpenMetrics format)
    /// report.
    async fn gather_metrics(core_metrics: Arc<CoreMetrics>) -> impl IntoResponse {
        tracing::debug!("Traversing route for /metrics endpoint for serving Prometheus metrics");
        match core_metrics.gather().map(String::from_utf8) {
            Ok(Ok(metrics)) => (StatusCode::OK, metrics),
            Ok(Err(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".into(),
            ),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to gather metrics".into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use prometheus::{Counter, Registry};
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::test_metrics;

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let registry = Registry::new();
        let counter = Counter::new("expected_metric_content", "test123").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc();

        let server = Server::new(0, Arc::new(test_metrics(registry).unwrap()));

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("expected_metric_content"));
        assert!(body.contains("faucet_start_time_seconds"));
    }
}
