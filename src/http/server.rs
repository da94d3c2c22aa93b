//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Hold shared application state
//! - Build the Axum router: API routes, tenant pipeline, ambient layers
//! - Apply hot-reloaded configuration
//! - Serve until shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::Request,
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::auth::{TokenCodec, TokenError};
use crate::billing::{PaymentProvider, TierCache};
use crate::config::PlatformConfig;
use crate::http::pipeline;
use crate::observability::metrics;
use crate::security::SlidingWindowLimiter;
use crate::store::{CounterStore, Persistence};
use crate::tasks::TaskQueue;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers and pipeline stages.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ArcSwap<PlatformConfig>>,
    pub tokens: Arc<TokenCodec>,
    pub persistence: Arc<dyn Persistence>,
    pub limiter: SlidingWindowLimiter,
    pub tiers: TierCache,
    pub payments: Arc<dyn PaymentProvider>,
    pub tasks: TaskQueue,
}

impl AppState {
    pub fn new(
        config: PlatformConfig,
        persistence: Arc<dyn Persistence>,
        counters: Arc<dyn CounterStore>,
        payments: Arc<dyn PaymentProvider>,
        tasks: TaskQueue,
    ) -> Result<Self, TokenError> {
        let tokens = TokenCodec::from_config(&config.auth)?;
        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            tokens: Arc::new(tokens),
            persistence,
            limiter: SlidingWindowLimiter::new(counters),
            tiers: TierCache::new(),
            payments,
            tasks,
        })
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<PlatformConfig> {
        self.config.load_full()
    }

    /// Swap in reloadable sections of `update`. Quotas and feature flags
    /// take effect on the next request; everything else needs a restart.
    pub fn apply_reload(&self, update: PlatformConfig) {
        let current = self.config.load_full();
        let mut next = (*current).clone();
        next.rate_limit = update.rate_limit;
        next.features = update.features;

        tracing::info!(
            rate_limit_enabled = next.rate_limit.enabled,
            signup = next.features.signup,
            billing = next.features.billing,
            audit_logs = next.features.audit_logs,
            "Runtime configuration reloaded"
        );
        self.config.store(Arc::new(next));
    }
}

/// HTTP server for the platform API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Fully layered router, ready to serve.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config();
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        pipeline::apply(api::routes(), &state)
            .layer(middleware::from_fn(track_request))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
            .with_state(state)
    }

    /// Serve on `listener` until `shutdown` resolves. Configuration updates
    /// arriving on `config_updates` are applied as they come.
    pub async fn run<F>(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<PlatformConfig>,
        shutdown: F,
    ) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(update) = config_updates.recv().await {
                state.apply_reload(update);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_request(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let response = next.run(req).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
