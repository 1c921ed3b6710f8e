/*!
 * Configuration Tests
 */

use fast_dump::core::limits::{ENV_ALLOW_DATA_LOSS, ENV_MAX_PERCENT_LOCAL, ENV_SAMPLING_IDLE_MS};
use fast_dump::{
    ConfigError, DumpConfig, FastDump, HostBackend, MemorySink, PipelineError, StaticBudget,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = DumpConfig::default();

    assert!(config.write_to_file);
    assert!(!config.write_to_trace);
    assert!(config.inform_on_error);
    assert!(config.allow_data_loss);
    assert_eq!(config.max_percent_shared, 75);
    assert_eq!(config.max_percent_local, 0);
    assert_eq!(config.sampling_active(), Duration::ZERO);
    assert_eq!(config.sampling_idle(), Duration::ZERO);
}

#[test]
fn test_json_partial_document() {
    let config = DumpConfig::from_json(
        r#"{"write_to_trace": true, "max_percent_local": 20, "sampling_active_ms": 100}"#,
    )
    .unwrap();

    assert!(config.write_to_file);
    assert!(config.write_to_trace);
    assert_eq!(config.max_percent_local, 20);
    assert_eq!(config.sampling_active(), Duration::from_millis(100));
}

#[test]
fn test_json_rejects_bad_percent() {
    let err = DumpConfig::from_json(r#"{"max_percent_shared": 150}"#).unwrap_err();
    assert_eq!(
        err,
        ConfigError::PercentOutOfRange {
            key: "max_percent_shared".into(),
            value: 150,
        }
    );
}

#[test]
fn test_json_malformed() {
    assert!(matches!(
        DumpConfig::from_json("{not json"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
#[serial]
fn test_env_overrides() {
    std::env::set_var(ENV_ALLOW_DATA_LOSS, "false");
    std::env::set_var(ENV_MAX_PERCENT_LOCAL, "40");
    std::env::set_var(ENV_SAMPLING_IDLE_MS, "250");

    let config = DumpConfig::from_env();

    std::env::remove_var(ENV_ALLOW_DATA_LOSS);
    std::env::remove_var(ENV_MAX_PERCENT_LOCAL);
    std::env::remove_var(ENV_SAMPLING_IDLE_MS);

    let config = config.unwrap();
    assert!(!config.allow_data_loss);
    assert_eq!(config.max_percent_local, 40);
    assert_eq!(config.sampling_idle(), Duration::from_millis(250));
}

#[test]
#[serial]
fn test_env_invalid_bool() {
    std::env::set_var(ENV_ALLOW_DATA_LOSS, "sometimes");
    let result = DumpConfig::from_env();
    std::env::remove_var(ENV_ALLOW_DATA_LOSS);

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_builder_requires_collaborators() {
    let result = FastDump::builder()
        .with_sink(Arc::new(MemorySink::new()))
        .with_budget(Arc::new(StaticBudget::new(1024, 0)))
        .build();

    assert!(matches!(
        result,
        Err(PipelineError::MissingCollaborator(_))
    ));
}

#[test]
fn test_builder_rejects_bad_percent() {
    let result = FastDump::builder()
        .with_backend(Arc::new(HostBackend::new()))
        .with_sink(Arc::new(MemorySink::new()))
        .with_budget(Arc::new(StaticBudget::new(1024, 0)))
        .with_config(DumpConfig::default().with_tier_percents(75, 101))
        .build();

    assert!(matches!(
        result,
        Err(PipelineError::Config(ConfigError::PercentOutOfRange { .. }))
    ));
}

#[test]
fn test_local_tier_takes_overflow() {
    let backend = Arc::new(HostBackend::new());
    let dump = FastDump::builder()
        .with_backend(backend.clone())
        .with_sink(Arc::new(MemorySink::new()))
        .with_budget(Arc::new(StaticBudget::new(100, 1000)))
        .with_config(
            DumpConfig::default()
                .with_tier_percents(100, 10)
                .with_allow_data_loss(true),
        )
        .build()
        .unwrap();

    let a = backend.create_buffer(vec![0; 80]);
    let b = backend.create_buffer(vec![0; 60]);
    dump.submit(a, "a", 0, 0);
    dump.submit(b, "b", 0, 0);
    assert!(dump.wait_idle_timeout(Duration::from_secs(10)));

    let stats = dump.stats();
    assert_eq!(stats.pool.buffers, 2);
    assert_eq!(stats.pool.used_bytes(), 140);
    assert_eq!(stats.dropped, 0);
}
