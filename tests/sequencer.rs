//! Integration tests for the badge notification service.
//!
//! The service runs on a real tokio task against an in-memory badge source
//! and is observed through its published state.

use std::sync::Arc;
use std::time::Duration;

use mission_tracker::{
    MockBadgeSource, NotificationHandle, NotificationService, Phase,
    config::PopupConfig,
    models::{Badge, BadgeType},
    present_popup,
};
use tokio::sync::mpsc;

fn badge(id: &str) -> Badge {
    Badge {
        id: id.to_string(),
        name: format!("Badge {id}"),
        description: None,
        image_path: None,
        badge_type: BadgeType::Mission,
        created_by: None,
    }
}

/// Wait until the `nth` badge is displayed and return its id.
async fn nth_displayed(handle: &NotificationHandle, nth: u64) -> String {
    let mut rx = handle.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| s.phase == Phase::Displaying && s.displayed >= nth),
    )
    .await
    .expect("badge should be displayed in time")
    .expect("service should be running");
    state.current.clone().unwrap().id
}

// ==================== Ordering Tests ====================

/// Test that queued badges are shown one after another in FIFO order.
#[tokio::test]
async fn test_badges_shown_in_order() {
    let source = Arc::new(MockBadgeSource::new([badge("badge_a"), badge("badge_b")]));
    let (handle, task) = NotificationService::start(source.clone());

    handle.enqueue("badge_a");
    handle.enqueue("badge_b");

    assert_eq!(nth_displayed(&handle, 1).await, "badge_a");
    assert_eq!(handle.state().queued, 1);

    handle.close();
    assert_eq!(nth_displayed(&handle, 2).await, "badge_b");

    handle.close();
    handle.wait_settled().await;
    assert_eq!(source.requests(), vec!["badge_a", "badge_b"]);

    handle.shutdown();
    task.await.unwrap();
}

/// Test that a failed lookup is skipped and the next badge is shown.
#[tokio::test]
async fn test_failed_lookup_is_skipped() {
    let source = Arc::new(MockBadgeSource::new([badge("good")]));
    source.fail_on("broken");
    let (handle, task) = NotificationService::start(source.clone());

    handle.enqueue("broken");
    handle.enqueue("missing");
    handle.enqueue("good");

    assert_eq!(nth_displayed(&handle, 1).await, "good");
    assert_eq!(source.requests(), vec!["broken", "missing", "good"]);

    handle.close();
    handle.wait_settled().await;
    assert!(handle.current().is_none());

    handle.shutdown();
    task.await.unwrap();
}

/// Test that repeated closes only clear the slot once.
#[tokio::test]
async fn test_repeated_close_is_harmless() {
    let source = Arc::new(MockBadgeSource::new([badge("a"), badge("b")]));
    let (handle, task) = NotificationService::start(source.clone());

    handle.enqueue("a");
    assert_eq!(nth_displayed(&handle, 1).await, "a");
    handle.close();
    handle.close();
    handle.close();

    handle.wait_settled().await;
    assert_eq!(handle.state().displayed, 1);

    handle.enqueue("b");
    assert_eq!(nth_displayed(&handle, 2).await, "b");
    assert_eq!(handle.state().displayed, 2);

    handle.shutdown();
    task.await.unwrap();
}

// ==================== Lifecycle Tests ====================

/// Test that the service stops once every handle is dropped.
#[tokio::test]
async fn test_service_stops_when_handles_dropped() {
    let source = Arc::new(MockBadgeSource::default());
    let (handle, task) = NotificationService::start(source);

    drop(handle);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("service should stop")
        .unwrap();
}

/// Test that a timed-out popup closes the slot and the next badge follows.
#[tokio::test(start_paused = true)]
async fn test_popup_timeout_advances_queue() {
    let source = Arc::new(MockBadgeSource::new([badge("first"), badge("second")]));
    let (handle, task) = NotificationService::start(source);
    let config = PopupConfig {
        display_secs: 3,
        fade_ms: 300,
    };
    let (_dismiss_tx, mut dismissals) = mpsc::unbounded_channel::<()>();

    handle.enqueue("first");
    handle.enqueue("second");

    assert_eq!(nth_displayed(&handle, 1).await, "first");
    let closer = handle.clone();
    present_popup(&config, &mut dismissals, move || closer.close()).await;

    assert_eq!(nth_displayed(&handle, 2).await, "second");

    handle.shutdown();
    task.await.unwrap();
}
