use std::sync::Arc;

use chrono::{DateTime, Utc};
use progress_core::model::{ChildId, DashboardSnapshot, UserId};

/// Who the dashboard belongs to. Either id may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub user_id: Option<UserId>,
    pub child_id: Option<ChildId>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, child_id: ChildId) -> Self {
        Self {
            user_id: Some(user_id),
            child_id: Some(child_id),
        }
    }

    /// Both ids, when both are known.
    #[must_use]
    pub fn ids(&self) -> Option<(&UserId, &ChildId)> {
        Some((self.user_id.as_ref()?, self.child_id.as_ref()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// First fetch, no data to show yet.
    Loading,
    /// Fetching while older data stays visible.
    Refreshing,
    /// Last fetch failed; `data` still holds the previous snapshot.
    Error,
}

/// What subscribers render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardState {
    pub status: DashboardStatus,
    pub data: Option<Arc<DashboardSnapshot>>,
    pub error: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status,
            DashboardStatus::Loading | DashboardStatus::Refreshing
        )
    }
}
