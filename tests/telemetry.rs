use tagcache::config::{LogFormat, LoggingSettings};
use tagcache::infra::error::InfraError;
use tagcache::infra::telemetry;
use tracing::level_filters::LevelFilter;

#[test]
fn subscriber_installs_once() {
    let logging = LoggingSettings {
        level: LevelFilter::DEBUG,
        format: LogFormat::Json,
    };

    telemetry::init(&logging).expect("first install succeeds");

    let err = telemetry::init(&LoggingSettings::default()).expect_err("second install fails");
    assert!(matches!(err, InfraError::Telemetry(_)));
}
