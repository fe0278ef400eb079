// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_interrupt_is_clear() {
    let interrupt = Interrupt::new();
    assert!(!interrupt.is_interrupted());
    assert!(!interrupt.clear());
}

#[test]
fn clones_share_the_flag() {
    let interrupt = Interrupt::new();
    let other = interrupt.clone();

    other.interrupt();
    assert!(interrupt.is_interrupted());
    assert!(interrupt.clear());
    assert!(!other.is_interrupted());
}

#[tokio::test]
async fn sleep_completes_without_interrupt() {
    let interrupt = Interrupt::new();
    interrupt.sleep(Duration::from_millis(5)).await.unwrap();
}

#[tokio::test]
async fn sleep_returns_interrupted_and_clears_flag() {
    let interrupt = Interrupt::new();
    let raiser = interrupt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        raiser.interrupt();
    });

    let started = std::time::Instant::now();
    let err = interrupt.sleep(Duration::from_secs(10)).await.unwrap_err();

    assert!(err.is_interrupted());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!interrupt.is_interrupted());
}

#[tokio::test]
async fn pending_interrupt_fails_the_next_wait_immediately() {
    let interrupt = Interrupt::new();
    interrupt.interrupt();

    let err = interrupt.sleep(Duration::from_secs(10)).await.unwrap_err();
    assert!(matches!(err, LockError::Interrupted));
}

#[tokio::test]
async fn guard_returns_future_output() {
    let interrupt = Interrupt::new();
    let value = interrupt.guard(async { 7 }).await.unwrap();
    assert_eq!(value, 7);
}

#[tokio::test]
async fn interrupted_resolves_after_raise() {
    let interrupt = Interrupt::new();
    let raiser = interrupt.clone();
    let waiting = tokio::spawn(async move { interrupt.interrupted().await });

    raiser.interrupt();
    tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .unwrap()
        .unwrap();
}
