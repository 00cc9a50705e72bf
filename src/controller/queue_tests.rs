// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for the work queue.

use tokio_test::{assert_err, assert_ok};

use super::*;

fn key(name: &str) -> ObjectKey {
    ObjectKey::new("default", name)
}

#[tokio::test]
async fn test_fifo_order() {
    let queue = WorkQueue::new(8);
    assert_ok!(queue.add(key("a")));
    assert_ok!(queue.add(key("b")));

    assert_eq!(queue.get().await, Some(key("a")));
    assert_eq!(queue.get().await, Some(key("b")));
}

#[tokio::test]
async fn test_duplicate_adds_collapse() {
    let queue = WorkQueue::new(8);
    for _ in 0..5 {
        assert_ok!(queue.add(key("a")));
    }
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_key_held_by_worker_is_not_handed_out_twice() {
    let queue = WorkQueue::new(8);
    queue.add(key("a")).unwrap();
    let held = queue.get().await.unwrap();

    queue.add(key("a")).unwrap();
    assert!(queue.is_empty(), "re-added key must wait for done");
    assert_eq!(queue.in_flight(), 1);

    queue.done(&held);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get().await, Some(key("a")));
}

#[tokio::test]
async fn test_done_without_readd_drops_key() {
    let queue = WorkQueue::new(8);
    queue.add(key("a")).unwrap();
    let held = queue.get().await.unwrap();
    queue.done(&held);
    assert!(queue.is_empty());
    assert_eq!(queue.in_flight(), 0);
}

#[tokio::test]
async fn test_full_queue_parks_keys_in_order() {
    let queue = WorkQueue::new(2);
    for name in ["s0", "s1", "s2", "s3", "s4"] {
        assert_ok!(queue.add(key(name)));
    }
    // Duplicates of parked keys still collapse.
    assert_ok!(queue.add(key("s3")));
    assert_eq!(queue.len(), 5);

    let mut served = Vec::new();
    while !queue.is_empty() {
        let held = queue.get().await.unwrap();
        queue.done(&held);
        served.push(held.name);
    }
    assert_eq!(served, vec!["s0", "s1", "s2", "s3", "s4"]);
}

#[tokio::test]
async fn test_readd_during_processing_survives_full_queue() {
    let queue = WorkQueue::new(1);
    queue.add(key("a")).unwrap();
    let held = queue.get().await.unwrap();

    queue.add(key("b")).unwrap();
    queue.add(key("a")).unwrap();
    queue.done(&held);
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.get().await, Some(key("b")));
    assert_eq!(queue.get().await, Some(key("a")));
}

#[tokio::test]
async fn test_get_waits_for_add() {
    let queue = Arc::new(WorkQueue::new(8));
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.get().await })
    };
    tokio::task::yield_now().await;

    queue.add(key("late")).unwrap();
    let got = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got, Some(key("late")));
}

#[tokio::test]
async fn test_shut_down_wakes_waiters_and_rejects_adds() {
    let queue = Arc::new(WorkQueue::new(8));
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        })
        .collect();
    tokio::task::yield_now().await;

    queue.shut_down();
    for waiter in waiters {
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, None);
    }
    assert!(queue.is_shutting_down());
    assert_err!(queue.add(key("a")));
}

#[tokio::test(start_paused = true)]
async fn test_add_after_delays_delivery() {
    let queue = Arc::new(WorkQueue::new(8));
    queue.add_after(key("a"), Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(queue.is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_add_after_zero_is_immediate() {
    let queue = Arc::new(WorkQueue::new(8));
    queue.add_after(key("a"), Duration::ZERO);
    assert_eq!(queue.len(), 1);
}
