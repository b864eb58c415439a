use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the cache layer emits.
///
/// Safe to call repeatedly; only the first call reaches the recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tagcache_hit_total",
            Unit::Count,
            "Total number of view lookups served from the store, by view kind."
        );
        describe_counter!(
            "tagcache_miss_total",
            Unit::Count,
            "Total number of view lookups that had to call the producer, by view kind."
        );
        describe_histogram!(
            "tagcache_populate_ms",
            Unit::Milliseconds,
            "Producer latency on cache misses in milliseconds, by view kind."
        );
        describe_counter!(
            "tagcache_flush_total",
            Unit::Count,
            "Total number of instance-tag flushes issued by destroy."
        );
        describe_counter!(
            "tagcache_forget_total",
            Unit::Count,
            "Total number of canonical single-entity keys forgotten by destroy."
        );
        describe_counter!(
            "tagcache_store_evict_total",
            Unit::Count,
            "Total number of in-memory store evictions due to capacity."
        );
    });
}
