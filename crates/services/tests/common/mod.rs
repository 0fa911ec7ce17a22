#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use progress_core::model::{
    ChildId, DashboardSnapshot, EventAck, EventBody, ProgressEvent, UserId,
};
use progress_core::time::fixed_clock;
use reqwest::StatusCode;
use services::{ApiError, Identity, ProgressApi, RefreshCoordinator, SyncConfig};
use storage::LocalCache;

/// Scriptable backend that counts every call.
#[derive(Default)]
pub struct FakeApi {
    pub fetches: AtomicU32,
    pub posts: AtomicU32,
    pub fail_fetch: AtomicBool,
    pub fail_post: AtomicBool,
    delays: Mutex<HashMap<String, Duration>>,
    snapshots: Mutex<HashMap<String, DashboardSnapshot>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_delay(&self, child: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(child.to_string(), delay);
    }

    pub fn set_snapshot(&self, child: &str, snapshot: DashboardSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(child.to_string(), snapshot);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn post_count(&self) -> u32 {
        self.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressApi for FakeApi {
    async fn fetch_dashboard(&self, child: &ChildId) -> Result<DashboardSnapshot, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(child.as_str())
            .copied()
            .unwrap_or(Duration::from_millis(50));
        tokio::time::sleep(delay).await;

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .get(child.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn post_event(&self, event: &ProgressEvent) -> Result<EventAck, ApiError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_post.load(Ordering::SeqCst) {
            return Err(ApiError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE));
        }

        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = snapshots
            .entry(event.child_id.as_str().to_string())
            .or_default();
        let points = match &event.body {
            EventBody::Chore { chore_id } => {
                snapshot.today_completed_chore_ids.push(chore_id.clone());
                15
            }
            EventBody::Outdoor { activity_id } => {
                snapshot
                    .today_completed_outdoor_activity_ids
                    .push(activity_id.clone());
                20
            }
            EventBody::Flashcard { correct, .. } => {
                if *correct {
                    10
                } else {
                    2
                }
            }
            EventBody::AffirmationViewed { .. } => 5,
        };
        snapshot.total_points += points;
        Ok(EventAck {
            points_awarded: points,
            new_achievement_ids: Vec::new(),
        })
    }
}

pub fn identity(user: &str, child: &str) -> Identity {
    Identity::new(UserId::new(user).unwrap(), ChildId::new(child).unwrap())
}

pub fn coordinator(api: &Arc<FakeApi>, cache: LocalCache) -> RefreshCoordinator {
    RefreshCoordinator::new(
        Arc::clone(api) as Arc<dyn ProgressApi>,
        cache,
        &SyncConfig::default(),
        fixed_clock(),
    )
}

pub fn snapshot_with_points(points: u32) -> DashboardSnapshot {
    DashboardSnapshot {
        total_points: points,
        ..DashboardSnapshot::default()
    }
}
