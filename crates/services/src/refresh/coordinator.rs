use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use progress_core::Clock;
use progress_core::model::{ChildId, DashboardSnapshot, UserId};
use storage::{CacheEntry, LocalCache};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ProgressApi;
use crate::config::SyncConfig;
use crate::error::ApiError;
use crate::lifecycle::AppLifecycle;

use super::debounce::{DebouncedTask, TaskFuture};
use super::state::{DashboardState, DashboardStatus, Identity};

type FetchResult = Option<Arc<DashboardSnapshot>>;

struct Flight {
    id: u64,
    epoch: u64,
    result: watch::Receiver<Option<FetchResult>>,
}

#[derive(Default)]
struct Session {
    identity: Identity,
    epoch: u64,
    next_flight_id: u64,
    in_flight: Option<Flight>,
}

struct Inner {
    api: Arc<dyn ProgressApi>,
    cache: LocalCache,
    clock: Clock,
    fetch_timeout: Duration,
    state: watch::Sender<DashboardState>,
    session: Mutex<Session>,
    debounce: DebouncedTask,
}

/// Owns the in-memory dashboard and decides when to talk to the backend.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(
        api: Arc<dyn ProgressApi>,
        cache: LocalCache,
        config: &SyncConfig,
        clock: Clock,
    ) -> Self {
        let fetch_timeout = config.fetch_timeout;
        let debounce_delay = config.debounce;
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            Inner {
                api,
                cache,
                clock,
                fetch_timeout,
                state: watch::Sender::new(DashboardState::default()),
                session: Mutex::new(Session::default()),
                debounce: DebouncedTask::new(debounce_delay, move || -> TaskFuture {
                    let weak = weak.clone();
                    Box::pin(async move {
                        if let Some(inner) = weak.upgrade() {
                            RefreshCoordinator { inner }.refresh(false).await;
                        }
                    })
                }),
            }
        });
        Self { inner }
    }

    //
    // ─── READ SIDE ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn get_state(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.inner.session().identity.clone()
    }

    //
    // ─── IDENTITY ──────────────────────────────────────────────────────────────
    //

    /// Switches to a new (user, child) pair.
    ///
    /// Results of fetches started for the previous identity are dropped. The
    /// cached snapshot, if any, is shown right away and a background refresh
    /// is started.
    pub async fn set_identity(&self, identity: Identity) {
        let epoch = {
            let mut session = self.inner.session();
            session.epoch += 1;
            session.identity = identity.clone();
            session.in_flight = None;
            self.inner.state.send_replace(DashboardState::default());
            session.epoch
        };
        self.inner.debounce.cancel();

        if let Some((user, child)) = identity.ids() {
            if let Some(entry) = self.inner.cache.read(user, child).await {
                let session = self.inner.session();
                if session.epoch == epoch {
                    // A fetch may have published while the cache was read.
                    self.inner.state.send_if_modified(|state| {
                        if state.data.is_some() {
                            return false;
                        }
                        debug!(%child, "hydrated dashboard from cache");
                        state.data = Some(Arc::new(entry.snapshot));
                        state.last_updated_at = Some(entry.last_updated_at);
                        true
                    });
                }
            }
        }

        let _ = self.start_fetch(false);
    }

    /// Forgets the identity and removes its cached snapshot.
    pub async fn clear(&self) {
        let previous = {
            let mut session = self.inner.session();
            session.epoch += 1;
            session.in_flight = None;
            self.inner.state.send_replace(DashboardState::default());
            std::mem::take(&mut session.identity)
        };
        self.inner.debounce.cancel();
        if let Some((user, child)) = previous.ids() {
            info!(%child, "clearing dashboard");
            self.inner.cache.clear(user, child).await;
        }
    }

    //
    // ─── REFRESH ───────────────────────────────────────────────────────────────
    //

    /// Fetches the dashboard and returns the latest known snapshot.
    ///
    /// Non-forced calls join a fetch that is already in flight; forced calls
    /// always start a new one. Failures are published as state, never
    /// returned.
    pub async fn refresh(&self, force: bool) -> Option<Arc<DashboardSnapshot>> {
        let Some(mut result) = self.start_fetch(force) else {
            return self.get_state().data;
        };
        match result.wait_for(Option::is_some).await {
            Ok(done) => done.clone().flatten(),
            Err(_) => self.get_state().data,
        }
    }

    /// Coalesces refresh triggers into one refresh after the quiet period.
    pub fn schedule_debounced_refresh(&self) {
        self.inner.debounce.schedule();
    }

    /// Runs a pending debounced refresh now. Returns whether one was pending.
    pub async fn flush_debounced_refresh(&self) -> bool {
        self.inner.debounce.flush().await
    }

    #[must_use]
    pub fn has_pending_refresh(&self) -> bool {
        self.inner.debounce.is_pending()
    }

    pub async fn handle_lifecycle(&self, lifecycle: AppLifecycle) {
        if lifecycle.should_flush() {
            debug!(?lifecycle, "app left foreground");
            self.flush_debounced_refresh().await;
        }
    }

    /// Returns a receiver for the fetch serving this call, or `None` when no
    /// identity is set.
    fn start_fetch(&self, force: bool) -> Option<watch::Receiver<Option<FetchResult>>> {
        let mut session = self.inner.session();
        let (user, child) = session
            .identity
            .ids()
            .map(|(user, child)| (user.clone(), child.clone()))?;

        if !force {
            if let Some(flight) = session
                .in_flight
                .as_ref()
                .filter(|flight| flight.epoch == session.epoch)
            {
                debug!(%child, "joining in-flight fetch");
                return Some(flight.result.clone());
            }
        }

        session.next_flight_id += 1;
        let id = session.next_flight_id;
        let epoch = session.epoch;
        let (done, result) = watch::channel(None);
        session.in_flight = Some(Flight {
            id,
            epoch,
            result: result.clone(),
        });
        self.inner.state.send_modify(|state| {
            state.status = if state.data.is_some() {
                DashboardStatus::Refreshing
            } else {
                DashboardStatus::Loading
            };
        });
        drop(session);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.fetch(&child).await;
            let published = inner.publish(epoch, &user, &child, outcome).await;
            inner.finish_flight(id);
            let _ = done.send(Some(published));
        });
        Some(result)
    }
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, child: &ChildId) -> Result<DashboardSnapshot, ApiError> {
        match tokio::time::timeout(self.fetch_timeout, self.api.fetch_dashboard(child)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                after_ms: u64::try_from(self.fetch_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Applies a fetch outcome unless the identity changed meanwhile.
    async fn publish(
        &self,
        epoch: u64,
        user: &UserId,
        child: &ChildId,
        outcome: Result<DashboardSnapshot, ApiError>,
    ) -> FetchResult {
        let (snapshot, entry) = {
            let session = self.session();
            if session.epoch != epoch {
                debug!(%child, "dropping result for a previous identity");
                return None;
            }
            match outcome {
                Ok(snapshot) => {
                    let now = self.clock.now();
                    let snapshot = Arc::new(snapshot);
                    self.state.send_modify(|state| {
                        state.status = DashboardStatus::Idle;
                        state.data = Some(Arc::clone(&snapshot));
                        state.error = None;
                        state.last_updated_at = Some(now);
                    });
                    let entry = CacheEntry {
                        snapshot: (*snapshot).clone(),
                        last_updated_at: now,
                    };
                    (snapshot, entry)
                }
                Err(err) => {
                    warn!(%child, error = %err, "dashboard fetch failed");
                    let mut data = None;
                    self.state.send_modify(|state| {
                        state.status = DashboardStatus::Error;
                        state.error = Some(err.to_string());
                        data = state.data.clone();
                    });
                    return data;
                }
            }
        };

        self.cache.write(user, child, &entry).await;
        Some(snapshot)
    }

    fn finish_flight(&self, id: u64) {
        let mut session = self.session();
        if session.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            session.in_flight = None;
        }
    }
}
