//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the conversion endpoints
//! - Put every endpoint except `/health` behind the admission gate
//! - Wire up middleware (body limit, timeout, request ID, tracing, metrics)
//! - Run the tracker maintenance task alongside the listener
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::ConversionBackend;
use crate::config::{AuthConfig, GateConfig};
use crate::gate::AdmissionGate;
use crate::http::handlers;
use crate::http::middleware::{admission_middleware, request_metrics};
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::uploads::SecurityValidator;

/// Room for multipart boundaries and text fields on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub validator: Arc<SecurityValidator>,
    pub backend: Arc<dyn ConversionBackend>,
    pub auth: AuthConfig,
}

/// HTTP front door for the conversion service.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: Arc<AdmissionGate>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and converter.
    pub fn new(config: GateConfig, backend: Arc<dyn ConversionBackend>) -> Self {
        let gate = Arc::new(AdmissionGate::new(&config));
        Self::with_gate(config, gate, backend)
    }

    /// Create a server around an existing gate (e.g. one driven by a manual clock).
    pub fn with_gate(
        config: GateConfig,
        gate: Arc<AdmissionGate>,
        backend: Arc<dyn ConversionBackend>,
    ) -> Self {
        let state = AppState {
            gate: gate.clone(),
            validator: Arc::new(SecurityValidator::new(config.uploads.clone())),
            backend,
            auth: config.auth.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            gate,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        let body_limit = config
            .uploads
            .max_aggregate_bytes
            .saturating_add(MULTIPART_OVERHEAD_BYTES);

        // Admission wraps the body limit so oversize requests are still
        // rate limited and authenticated before being turned away.
        let protected = Router::new()
            .route("/pdf/split", post(handlers::split_pdf))
            .route("/pdf/merge", post(handlers::merge_pdfs))
            .route("/pdf/extract-pages", post(handlers::extract_pages))
            .route("/pdf/info", post(handlers::pdf_info))
            .route("/pdf/convert-to-image", post(handlers::pdf_to_images))
            .route("/pdf/add-password", post(handlers::add_password))
            .route("/pdf/remove-password", post(handlers::remove_password))
            .route("/pdf/convert-to-ofx", post(handlers::pdf_to_ofx))
            .route("/pdf/extract-text", post(handlers::extract_text))
            .route("/image/to-pdf", post(handlers::images_to_pdf))
            .route("/image/convert", post(handlers::convert_image))
            .route("/image/compress", post(handlers::compress_image))
            .route("/image/compress/info", post(handlers::compress_image_info))
            .route("/audio/transcribe", post(handlers::transcribe))
            .route("/video/cut", post(handlers::cut_video))
            .route_layer(RequestBodyLimitLayer::new(body_limit))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(protected)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(request_metrics))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            header = %self.config.auth.header_name,
            "HTTP server starting"
        );

        let sweeper = tokio::spawn(run_maintenance(
            self.gate.clone(),
            Duration::from_secs(self.config.maintenance.sweep_interval_secs),
            shutdown.resubscribe(),
        ));

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }
}

/// Periodically evict idle clients from both trackers.
async fn run_maintenance(
    gate: Arc<AdmissionGate>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = gate.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle clients");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
