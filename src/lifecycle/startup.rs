//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the access logger from configuration
//! - Keep its policy in sync with configuration reloads
//!
//! # Design Decisions
//! - Fail fast: a bad pattern or unopenable sink is fatal at startup
//! - Reloads only touch the policy; pattern and sink changes need a restart

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::access_log::{append_file, AccessLogError, AccessLogger, LogSink};
use crate::config::{AccessLogConfig, ServerConfig, SinkTarget};

/// Open the configured sink, compile the pattern and apply the policy.
pub fn build_logger(config: &AccessLogConfig) -> Result<Arc<AccessLogger>, AccessLogError> {
    let sink = open_sink(&config.sink_target()).map_err(AccessLogError::Sink)?;
    let logger = AccessLogger::new(config.pattern_source(), sink)?;
    apply_policy(&logger, config);

    tracing::info!(
        local_ip = logger.local_ip(),
        sink = %config.sink,
        enabled = logger.is_enabled(),
        threshold_ms = threshold_ms(config),
        "Access logger ready"
    );
    Ok(Arc::new(logger))
}

pub fn open_sink(target: &SinkTarget) -> io::Result<Box<dyn LogSink>> {
    Ok(match target {
        SinkTarget::Stdout => Box::new(io::stdout()),
        SinkTarget::Stderr => Box::new(io::stderr()),
        SinkTarget::File(path) => Box::new(append_file(path)?),
    })
}

/// Copy `enabled` and the slow-request threshold onto a running logger.
pub fn apply_policy(logger: &AccessLogger, config: &AccessLogConfig) {
    if config.enabled {
        logger.enable();
    } else {
        logger.disable();
    }
    logger.set_slow_request_threshold(config.slow_request_threshold());
}

fn threshold_ms(config: &AccessLogConfig) -> u64 {
    u64::try_from(config.slow_request_threshold().as_millis()).unwrap_or(u64::MAX)
}

/// Apply each reloaded configuration's access-log policy until the channel
/// closes.
pub async fn follow_reloads(
    logger: Arc<AccessLogger>,
    mut current: AccessLogConfig,
    mut updates: mpsc::UnboundedReceiver<ServerConfig>,
) {
    while let Some(config) = updates.recv().await {
        let next = config.access_log;
        if next.pattern != current.pattern || next.sink != current.sink {
            tracing::warn!("Access log pattern/sink changes require a restart; ignoring them");
        }
        apply_policy(&logger, &next);
        tracing::info!(
            enabled = next.enabled,
            threshold_ms = threshold_ms(&next),
            "Access log policy reloaded"
        );
        current = next;
    }
}
