mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeApi, coordinator, identity};
use progress_core::model::EventBody;
use services::{CompletionTracker, EventPoster, Identity, ProgressApi};
use storage::LocalCache;

fn poster(api: &Arc<FakeApi>, coordinator: services::RefreshCoordinator) -> EventPoster {
    EventPoster::new(
        Arc::clone(api) as Arc<dyn ProgressApi>,
        coordinator,
        Duration::from_secs(3),
    )
}

#[tokio::test(start_paused = true)]
async fn no_child_means_no_submission() {
    let api = FakeApi::new();
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(Identity::default()).await;
    let poster = poster(&api, coordinator);

    let ack = poster
        .post_event(EventBody::AffirmationViewed {
            affirmation_id: None,
        })
        .await;

    assert_eq!(ack, None);
    assert_eq!(api.post_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_post_returns_ack_without_refreshing() {
    let api = FakeApi::new();
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(identity("u1", "c1")).await;
    coordinator.refresh(false).await;
    let poster = poster(&api, coordinator.clone());

    let ack = poster
        .post_event(EventBody::Chore {
            chore_id: "dishes".into(),
        })
        .await
        .unwrap();

    assert_eq!(ack.points_awarded, 15);
    assert_eq!(api.post_count(), 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(api.fetch_count(), 1);
    assert!(!coordinator.has_pending_refresh());
}

#[tokio::test(start_paused = true)]
async fn failed_post_schedules_one_debounced_refresh() {
    let api = FakeApi::new();
    api.fail_post.store(true, Ordering::SeqCst);
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(identity("u1", "c1")).await;
    coordinator.refresh(false).await;
    let poster = poster(&api, coordinator.clone());

    for _ in 0..3 {
        let ack = poster
            .post_event(EventBody::Flashcard {
                subject: "math".into(),
                correct: true,
                card_id: None,
            })
            .await;
        assert_eq!(ack, None);
    }
    assert_eq!(api.post_count(), 3);
    assert!(coordinator.has_pending_refresh());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(api.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn completion_shows_while_pending_and_settles_to_server_truth() {
    let api = FakeApi::new();
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(identity("u1", "c1")).await;
    coordinator.refresh(false).await;
    let tracker = CompletionTracker::new(poster(&api, coordinator.clone()));

    let pending = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.complete_chore("dishes").await })
    };
    tokio::task::yield_now().await;
    assert!(tracker.is_chore_completed("dishes"));
    assert_eq!(tracker.displayed_chores(), vec!["dishes"]);

    // a second tap while pending does not submit again
    assert_eq!(tracker.complete_chore("dishes").await, None);

    let ack = pending.await.unwrap().unwrap();
    assert_eq!(ack.points_awarded, 15);
    assert_eq!(api.post_count(), 1);
    assert_eq!(api.fetch_count(), 2);
    assert_eq!(tracker.displayed_chores(), vec!["dishes"]);
    assert_eq!(
        coordinator.get_state().data.unwrap().today_completed_chore_ids,
        vec!["dishes"]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_completion_reverts_after_settling() {
    let api = FakeApi::new();
    api.fail_post.store(true, Ordering::SeqCst);
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(identity("u1", "c1")).await;
    coordinator.refresh(false).await;
    let tracker = CompletionTracker::new(poster(&api, coordinator));

    assert_eq!(tracker.complete_outdoor_activity("bike").await, None);
    assert!(!tracker.is_outdoor_activity_completed("bike"));
    assert!(tracker.displayed_outdoor_activities().is_empty());
}

#[tokio::test(start_paused = true)]
async fn accepted_completion_survives_a_failed_refresh() {
    let api = FakeApi::new();
    let coordinator = coordinator(&api, LocalCache::in_memory());
    coordinator.set_identity(identity("u1", "c1")).await;
    coordinator.refresh(false).await;
    api.fail_fetch.store(true, Ordering::SeqCst);
    let tracker = CompletionTracker::new(poster(&api, coordinator.clone()));

    assert!(tracker.complete_chore("dishes").await.is_some());
    assert!(tracker.is_chore_completed("dishes"));
    assert_eq!(tracker.displayed_chores(), vec!["dishes"]);
    assert!(coordinator.has_pending_refresh());

    assert_eq!(tracker.complete_chore("dishes").await, None);
    assert_eq!(api.post_count(), 1);

    api.fail_fetch.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        coordinator.get_state().data.unwrap().today_completed_chore_ids,
        vec!["dishes"]
    );
}
