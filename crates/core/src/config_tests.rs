// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use yare::parameterized;

#[test]
fn empty_document_yields_defaults() {
    let settings = Settings::from_toml_str("").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.lock.retry_interval, Duration::from_millis(100));
    assert_eq!(settings.transport.stream, "kvl:wake");
}

#[test]
fn durations_parse_as_humantime() {
    let settings = Settings::from_toml_str(
        r#"
        [lock]
        retry_interval = "250ms"
        wake_fallback = "2s"

        [watchdog]
        safety_margin = "40ms"

        [transport]
        stream = "jobs:wake"
        block_timeout = "500ms"
        batch_size = 4
        "#,
    )
    .unwrap();

    assert_eq!(settings.lock.retry_interval, Duration::from_millis(250));
    assert_eq!(settings.lock.wake_fallback, Duration::from_secs(2));
    assert_eq!(settings.watchdog.safety_margin, Duration::from_millis(40));
    // Unset fields keep their defaults
    assert_eq!(settings.watchdog.recovery_delay, Duration::from_millis(20));
    assert_eq!(settings.transport.stream, "jobs:wake");
    assert_eq!(settings.transport.block_timeout, Duration::from_millis(500));
    assert_eq!(settings.transport.batch_size, 4);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Settings::from_toml_str("[lock]\nretry = \"1s\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[parameterized(
    zero_retry = { "[lock]\nretry_interval = \"0s\"", "lock.retry_interval" },
    zero_fallback = { "[lock]\nwake_fallback = \"0s\"", "lock.wake_fallback" },
    zero_recovery = { "[watchdog]\nrecovery_delay = \"0s\"", "watchdog.recovery_delay" },
    zero_block = { "[transport]\nblock_timeout = \"0s\"", "transport.block_timeout" },
    zero_batch = { "[transport]\nbatch_size = 0", "transport.batch_size" },
    zero_max_len = { "[transport]\nmax_len = 0", "transport.max_len" },
    empty_stream = { "[transport]\nstream = \"\"", "transport.stream" },
    empty_url = { "[store]\nurl = \" \"", "store.url" },
)]
fn invalid_values_fail_validation(text: &str, expected_field: &str) {
    match Settings::from_toml_str(text) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("expected invalid {expected_field}, got {other:?}"),
    }
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[store]\nurl = \"memory://\"").unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.store.url, "memory://");
}

#[test]
fn load_reports_missing_file() {
    let err = Settings::load(Path::new("/nonexistent/kvl.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("/nonexistent/kvl.toml"));
}

#[test]
fn builders_override_single_fields() {
    let lock = LockConfig::default().with_retry_interval(Duration::from_millis(5));
    assert_eq!(lock.retry_interval, Duration::from_millis(5));
    assert_eq!(lock.wake_fallback, Duration::from_secs(5));

    let transport = TransportConfig::new("s").with_batch_size(2).with_max_len(64);
    assert_eq!(transport.stream, "s");
    assert_eq!(transport.batch_size, 2);
    assert_eq!(transport.max_len, 64);
}
