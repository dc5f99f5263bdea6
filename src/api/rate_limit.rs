//! Per-client token bucket in front of the API

use std::time::Duration;

use governor::middleware::NoOpMiddleware;
use tower_governor::{
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};

use crate::config::RateLimitConfig;

/// Limiter keyed by client IP (forwarding headers first, then the peer address).
///
/// `GovernorLayer` borrows its configuration, so the limiter lives for the
/// whole process.
pub type RateLimiter = &'static GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

/// How often idle buckets are dropped from the limiter
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the limiter described by `config`, or `None` when rate limiting is off
pub fn build(config: &RateLimitConfig) -> Option<RateLimiter> {
    if !config.enabled {
        return None;
    }

    let Some(period) = config.replenish_period() else {
        tracing::warn!(?config, "Rate limit configuration cannot produce a bucket, limiter disabled");
        return None;
    };

    let limiter = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(config.capacity)
        .key_extractor(SmartIpKeyExtractor)
        .finish()?;

    tracing::info!(
        capacity = config.capacity,
        refill_tokens = config.refill_tokens,
        refill_interval_secs = config.refill_interval_secs,
        "Rate limiting enabled"
    );

    Some(Box::leak(Box::new(limiter)))
}

pub fn layer(limiter: RateLimiter) -> GovernorLayer<'static, SmartIpKeyExtractor, NoOpMiddleware> {
    GovernorLayer { config: limiter }
}

/// Periodically forget clients whose bucket is full again
pub fn spawn_cleanup(limiter: RateLimiter) {
    let store = limiter.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            tracing::debug!(tracked_clients = store.len(), "Pruning rate limiter state");
            store.retain_recent();
        }
    });
}
