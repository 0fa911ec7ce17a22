use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use progress_core::model::{DashboardSnapshot, EventAck, EventBody, ProgressEvent};
use progress_core::optimistic::OptimisticCompletions;
use tracing::{debug, warn};

use crate::api::ProgressApi;
use crate::error::ApiError;
use crate::refresh::{DashboardStatus, RefreshCoordinator};

//
// ─── EVENT POSTER ──────────────────────────────────────────────────────────────
//

/// Submits progress events for the coordinator's current child.
#[derive(Clone)]
pub struct EventPoster {
    api: Arc<dyn ProgressApi>,
    coordinator: RefreshCoordinator,
    timeout: Duration,
}

impl EventPoster {
    #[must_use]
    pub fn new(
        api: Arc<dyn ProgressApi>,
        coordinator: RefreshCoordinator,
        timeout: Duration,
    ) -> Self {
        Self {
            api,
            coordinator,
            timeout,
        }
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Posts one event. Never retries.
    ///
    /// Returns `None` when no child is selected or the post failed; a failure
    /// also schedules a debounced refresh so the dashboard converges on the
    /// server's view.
    pub async fn post_event(&self, body: EventBody) -> Option<EventAck> {
        let Some(child_id) = self.coordinator.identity().child_id else {
            debug!(kind = body.kind().as_str(), "no child selected, skipping event");
            return None;
        };
        let event = ProgressEvent::new(child_id, body);

        match self.send(&event).await {
            Ok(ack) => {
                debug!(
                    kind = event.body.kind().as_str(),
                    points = ack.points_awarded,
                    "event accepted"
                );
                Some(ack)
            }
            Err(err) => {
                warn!(kind = event.body.kind().as_str(), error = %err, "event post failed");
                self.coordinator.schedule_debounced_refresh();
                None
            }
        }
    }

    async fn send(&self, event: &ProgressEvent) -> Result<EventAck, ApiError> {
        match tokio::time::timeout(self.timeout, self.api.post_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

//
// ─── COMPLETION TRACKER ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionList {
    Chores,
    Outdoor,
}

#[derive(Default)]
struct Lists {
    chores: OptimisticCompletions,
    outdoor: OptimisticCompletions,
}

impl Lists {
    fn get_mut(&mut self, list: CompletionList) -> &mut OptimisticCompletions {
        match list {
            CompletionList::Chores => &mut self.chores,
            CompletionList::Outdoor => &mut self.outdoor,
        }
    }

    fn confirm(&mut self, snapshot: &DashboardSnapshot) {
        self.chores
            .confirm_from_server(snapshot.today_completed_chore_ids.iter().cloned());
        self.outdoor
            .confirm_from_server(snapshot.today_completed_outdoor_activity_ids.iter().cloned());
    }
}

/// Shows chore and outdoor completions before the server confirms them.
///
/// An id is pending from the tap until its post and the follow-up refresh
/// settle. While pending it counts as completed, so a second tap does not
/// submit it again.
#[derive(Clone)]
pub struct CompletionTracker {
    poster: EventPoster,
    lists: Arc<Mutex<Lists>>,
}

impl CompletionTracker {
    #[must_use]
    pub fn new(poster: EventPoster) -> Self {
        let tracker = Self {
            poster,
            lists: Arc::new(Mutex::new(Lists::default())),
        };
        if let Some(snapshot) = tracker.poster.coordinator().get_state().data {
            tracker.sync_from_snapshot(&snapshot);
        }
        tracker
    }

    /// Takes the server's completion lists as the new confirmed truth.
    pub fn sync_from_snapshot(&self, snapshot: &DashboardSnapshot) {
        self.lists().confirm(snapshot);
    }

    pub async fn complete_chore(&self, chore_id: &str) -> Option<EventAck> {
        self.complete(
            CompletionList::Chores,
            chore_id,
            EventBody::Chore {
                chore_id: chore_id.to_string(),
            },
        )
        .await
    }

    pub async fn complete_outdoor_activity(&self, activity_id: &str) -> Option<EventAck> {
        self.complete(
            CompletionList::Outdoor,
            activity_id,
            EventBody::Outdoor {
                activity_id: activity_id.to_string(),
            },
        )
        .await
    }

    #[must_use]
    pub fn displayed_chores(&self) -> Vec<String> {
        self.lists().chores.displayed()
    }

    #[must_use]
    pub fn displayed_outdoor_activities(&self) -> Vec<String> {
        self.lists().outdoor.displayed()
    }

    #[must_use]
    pub fn is_chore_completed(&self, chore_id: &str) -> bool {
        self.lists().chores.is_completed(chore_id)
    }

    #[must_use]
    pub fn is_outdoor_activity_completed(&self, activity_id: &str) -> bool {
        self.lists().outdoor.is_completed(activity_id)
    }

    async fn complete(&self, list: CompletionList, id: &str, body: EventBody) -> Option<EventAck> {
        let started = self.lists().get_mut(list).begin(id);
        if !started {
            debug!(?list, id, "already completed or pending");
            return None;
        }

        let ack = self.poster.post_event(body).await;
        let coordinator = self.poster.coordinator();
        let refreshed = match ack {
            Some(_) => {
                let snapshot = coordinator.refresh(true).await;
                snapshot.filter(|_| coordinator.get_state().status != DashboardStatus::Error)
            }
            None => None,
        };

        let retry = {
            let mut lists = self.lists();
            let retry = match (&ack, refreshed) {
                (_, Some(snapshot)) => {
                    lists.confirm(&snapshot);
                    false
                }
                (Some(_), None) => {
                    debug!(?list, id, "accepted but refresh failed, keeping as completed");
                    lists.get_mut(list).accept(id);
                    true
                }
                (None, None) => false,
            };
            lists.get_mut(list).settle(id);
            retry
        };
        if retry {
            coordinator.schedule_debounced_refresh();
        }
        ack
    }

    fn lists(&self) -> MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
