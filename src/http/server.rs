//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with order and operator handlers
//! - Wire up middleware (request ID, tracing, timeout, rate limiting)
//! - Build shared state (limiter, breakers, downstream client)
//! - Run breaker monitors for the lifetime of the server
//! - Serve until shutdown, then drain

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::OrderServiceConfig;
use crate::downstream::{Downstream, HttpDownstream};
use crate::http::orders::create_order;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::observability::events::spawn_breaker_monitors;
use crate::orchestrator::{DependencyBreakers, OrderOrchestrator};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OrderOrchestrator>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn breakers(&self) -> &DependencyBreakers {
        self.orchestrator.breakers()
    }
}

/// HTTP server for the order service.
pub struct HttpServer {
    router: Router,
    config: OrderServiceConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server that calls the configured downstream services over HTTP.
    pub fn new(config: OrderServiceConfig) -> Self {
        let downstream = Arc::new(HttpDownstream::new(&config.downstream));
        Self::with_downstream(config, downstream)
    }

    /// Create a server with a custom downstream implementation.
    pub fn with_downstream(config: OrderServiceConfig, downstream: Arc<dyn Downstream>) -> Self {
        let breakers = Arc::new(DependencyBreakers::new(&config.circuit_breaker));
        let state = AppState {
            orchestrator: Arc::new(OrderOrchestrator::new(breakers, downstream)),
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &OrderServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/orders", post(create_order))
            .merge(admin::routes());

        if config.rate_limit.enabled {
            router = router.layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request.headers()),
                    )
                }))
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
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
            rate_limit = self.config.rate_limit.limit,
            window_secs = self.config.rate_limit.window_secs,
            "HTTP server starting"
        );

        let monitors = Shutdown::new();
        let monitor_handles = spawn_breaker_monitors(self.state.breakers(), &monitors);

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await;

        monitors.trigger();
        for handle in monitor_handles {
            let _ = handle.await;
        }

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &OrderServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
