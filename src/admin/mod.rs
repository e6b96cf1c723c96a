//! Admin API: runtime control of the access logger.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::access_log::AccessLogger;
use crate::http::server::{not_found, whoami};
use crate::http::{with_access_log, with_panic_recovery};

/// Bearer-authenticated admin routes. Admin traffic is access-logged too.
pub fn setup_admin_router(logger: Arc<AccessLogger>, api_key: &str) -> Router {
    let routes = Router::new()
        .route("/admin/status", get(get_status))
        .route("/access_log/status", get(get_access_log_status))
        .route("/access_log/status/{status}", post(set_access_log_status))
        .route(
            "/access_log/slow_request_log/threshold/{duration}",
            post(set_slow_request_threshold),
        )
        .route("/whoami", get(whoami))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::<str>::from(api_key),
            admin_auth_middleware,
        ))
        .with_state(logger.clone());

    with_panic_recovery(with_access_log(routes, logger))
}
