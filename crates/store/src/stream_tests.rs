// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_and_displays_redis_ids() {
    let id: StreamId = "1700000000000-3".parse().unwrap();
    assert_eq!(id, StreamId::new(1_700_000_000_000, 3));
    assert_eq!(id.to_string(), "1700000000000-3");
}

#[test]
fn rejects_malformed_ids() {
    for raw in ["", "12", "a-1", "1-b", "1-2-3"] {
        assert!(
            matches!(raw.parse::<StreamId>(), Err(StoreError::InvalidStreamId(_))),
            "{raw} should be rejected"
        );
    }
}

#[test]
fn ids_order_by_millis_then_sequence() {
    assert!(StreamId::new(5, 9) < StreamId::new(6, 0));
    assert!(StreamId::new(6, 0) < StreamId::new(6, 1));
}

#[test]
fn successor_never_goes_backwards() {
    let id = StreamId::new(100, 4);
    assert_eq!(id.successor_at(100), StreamId::new(100, 5));
    // A clock that stepped back still yields a larger id
    assert_eq!(id.successor_at(90), StreamId::new(100, 5));
    assert_eq!(id.successor_at(101), StreamId::new(101, 0));
}

#[test]
fn read_from_renders_cursor() {
    assert_eq!(ReadFrom::Latest.to_string(), "$");
    assert_eq!(ReadFrom::After(StreamId::new(1, 2)).to_string(), "1-2");
}
