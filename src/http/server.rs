//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the demo API router (`/ping`, `/whoami`)
//! - Wire up middleware (trace, panic recovery, access log, timeout)
//! - Serve a router on a listener until shutdown is signalled

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::access_log::AccessLogger;
use crate::config::ApiConfig;
use crate::http::middleware::access_log_middleware;
use crate::observability::metrics;

/// Wrap every route of `router` in the access-log interceptor.
pub fn with_access_log<S>(router: Router<S>, logger: Arc<AccessLogger>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(logger, access_log_middleware))
}

/// Answer handler panics with a 500 instead of dropping the connection.
///
/// Install outside the access-log layer: a panicking request unwinds past
/// it and gets no access line.
pub fn with_panic_recovery<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(CatchPanicLayer::custom(handle_panic))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "Catch panic");
    metrics::record_panic();
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

/// Build information returned by `/whoami`.
#[derive(Debug, Serialize)]
pub struct Whoami {
    pub name: &'static str,
    pub version: &'static str,
}

/// An axum router bound to one listener.
pub struct HttpServer {
    name: &'static str,
    router: Router,
}

impl HttpServer {
    /// The public API server.
    pub fn api(config: &ApiConfig, logger: Arc<AccessLogger>) -> Self {
        Self {
            name: "api",
            router: Self::build_api_router(config, logger),
        }
    }

    /// Any pre-built router, e.g. the admin API.
    pub fn new(name: &'static str, router: Router) -> Self {
        Self { name, router }
    }

    /// Routes and middleware of the public API.
    ///
    /// The access-log layer sits outside the timeout so timed-out requests
    /// are logged with their 408, and inside panic recovery.
    #[allow(deprecated)]
    pub fn build_api_router(config: &ApiConfig, logger: Arc<AccessLogger>) -> Router {
        let router = Router::new()
            .route("/ping", get(ping))
            .route("/whoami", get(whoami))
            .fallback(not_found)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));

        with_panic_recovery(with_access_log(router, logger)).layer(TraceLayer::new_for_http())
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until a value arrives on `shutdown`, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(server = self.name, address = %addr, "HTTP server starting");

        // ConnectInfo feeds the remote address into access lines.
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(server = self.name, "HTTP server stopped");
        Ok(())
    }
}

async fn ping() -> &'static str {
    "pong"
}

pub async fn whoami() -> Json<Whoami> {
    Json(Whoami {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
