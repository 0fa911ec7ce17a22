//! Offline progress: every calculator runs in-process and the whole document
//! is persisted locally after each mutation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use progress_core::Clock;
use progress_core::model::{
    Achievement, ChildId, DashboardSnapshot, DayCompletions, OFFLINE_SCHEMA_VERSION,
    OfflineProgress, ProgressData, SchoolProgressData, SubjectStats, UserId,
};
use progress_core::progress::{ActivityOutcome, OfflineRules, ToggleOutcome};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use storage::{KeyValueStore, StorageError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::decode::coerce_u32;

/// Version 1 documents were stored under their own key.
const LEGACY_OFFLINE_SCHEMA_VERSION: u32 = 1;

#[must_use]
pub fn offline_key(user: &UserId, child: &ChildId) -> String {
    format!("progress:v{OFFLINE_SCHEMA_VERSION}:{user}:{child}")
}

#[must_use]
pub fn legacy_offline_key(user: &UserId, child: &ChildId) -> String {
    format!("progress:v{LEGACY_OFFLINE_SCHEMA_VERSION}:{user}:{child}")
}

//
// ─── DECODING ──────────────────────────────────────────────────────────────────
//

/// Decodes a persisted document, repairing what it can.
///
/// Unparsable input yields a fresh document. Older versions are migrated
/// first; each field is then decoded on its own and falls back to its
/// default when malformed.
#[must_use]
pub fn decode_offline(raw: &str) -> OfflineProgress {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            warn!("offline progress is not an object, starting fresh");
            return OfflineProgress::default();
        }
        Err(err) => {
            warn!(error = %err, "offline progress is unreadable, starting fresh");
            return OfflineProgress::default();
        }
    };

    let version = match value.get("version") {
        Some(v) => coerce_u32(Some(v)),
        None => 1,
    };
    let value = if version < 2 {
        debug!(version, "migrating offline progress");
        migrate_v1(value)
    } else {
        value
    };

    let mut document = OfflineProgress {
        version,
        progress: value
            .get("progress")
            .map(decode_progress)
            .unwrap_or_default(),
        school: value.get("school").map(decode_school).unwrap_or_default(),
    };
    document.normalize();
    document
}

/// Version 1 kept the claimed level as `school.currentLevel` and today's ids
/// as bare lists stamped only by `lastActiveDate`.
fn migrate_v1(mut value: Value) -> Value {
    if let Some(school) = value.get_mut("school").and_then(Value::as_object_mut) {
        if let Some(level) = school.remove("currentLevel") {
            school.entry("level").or_insert(level);
        }
    }
    if let Some(progress) = value.get_mut("progress").and_then(Value::as_object_mut) {
        let chores = progress.remove("todayCompletedChoreIds");
        let outdoor = progress.remove("todayCompletedOutdoorActivityIds");
        if !progress.contains_key("completedToday") {
            let date = progress.get("lastActiveDate").cloned().unwrap_or(Value::Null);
            progress.insert(
                "completedToday".into(),
                json!({
                    "date": date,
                    "choreIds": chores.unwrap_or_else(|| json!([])),
                    "outdoorActivityIds": outdoor.unwrap_or_else(|| json!([])),
                }),
            );
        }
    }
    value
}

fn field<T: DeserializeOwned + Default>(obj: &Map<String, Value>, key: &str) -> T {
    let Some(value) = obj.get(key) else {
        return T::default();
    };
    serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        debug!(key, error = %err, "dropping malformed offline field");
        T::default()
    })
}

fn count(obj: &Map<String, Value>, key: &str) -> u32 {
    coerce_u32(obj.get(key))
}

fn decode_progress(value: &Value) -> ProgressData {
    let Some(obj) = value.as_object() else {
        return ProgressData::default();
    };
    let achievements = match obj.get("achievements") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<Achievement>(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    };
    ProgressData {
        total_points: count(obj, "totalPoints"),
        current_streak: count(obj, "currentStreak"),
        longest_streak: count(obj, "longestStreak"),
        last_active_date: field::<Option<NaiveDate>>(obj, "lastActiveDate"),
        daily: field(obj, "daily"),
        weekly: field(obj, "weekly"),
        totals: field(obj, "totals"),
        completed_today: field::<DayCompletions>(obj, "completedToday"),
        achievements,
    }
}

fn decode_school(value: &Value) -> SchoolProgressData {
    let Some(obj) = value.as_object() else {
        return SchoolProgressData::default();
    };
    let mut subjects = BTreeMap::new();
    if let Some(Value::Object(map)) = obj.get("subjects") {
        for (name, stats) in map {
            match serde_json::from_value::<SubjectStats>(stats.clone()) {
                Ok(stats) => {
                    subjects.insert(name.clone(), stats);
                }
                Err(err) => debug!(subject = %name, error = %err, "dropping malformed subject"),
            }
        }
    }
    SchoolProgressData {
        subjects,
        level: count(obj, "level").max(1),
    }
}

async fn read_raw(kv: &dyn KeyValueStore, key: &str) -> Option<String> {
    match kv.get(key).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(key, error = %err, "offline progress read failed");
            None
        }
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Published offline state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OfflineState {
    pub document: Arc<OfflineProgress>,
    /// Bumped on every mutation.
    pub revision: u64,
}

/// Offline progress for one child, published through a watch channel.
pub struct ProgressStateStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    clock: Clock,
    rules: OfflineRules,
    document: Mutex<OfflineProgress>,
    state: watch::Sender<OfflineState>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl ProgressStateStore {
    /// Loads the child's document with the default rules.
    pub async fn load(
        kv: Arc<dyn KeyValueStore>,
        user: &UserId,
        child: &ChildId,
        clock: Clock,
    ) -> Self {
        Self::load_with_rules(kv, user, child, clock, OfflineRules::default()).await
    }

    /// Loads the child's document. Missing, unreadable or corrupt documents
    /// start fresh.
    ///
    /// When only a version 1 document exists it is migrated, saved under the
    /// current key and the old entry removed.
    pub async fn load_with_rules(
        kv: Arc<dyn KeyValueStore>,
        user: &UserId,
        child: &ChildId,
        clock: Clock,
        rules: OfflineRules,
    ) -> Self {
        let key = offline_key(user, child);
        let legacy_key = legacy_offline_key(user, child);
        let (document, migrated) = match read_raw(kv.as_ref(), &key).await {
            Some(raw) => (decode_offline(&raw), false),
            None => match read_raw(kv.as_ref(), &legacy_key).await {
                Some(raw) => {
                    info!(%child, "migrating legacy offline progress");
                    (decode_offline(&raw), true)
                }
                None => {
                    info!(%child, "no offline progress yet");
                    (OfflineProgress::default(), false)
                }
            },
        };

        let store = Self {
            kv,
            key,
            clock,
            rules,
            state: watch::Sender::new(OfflineState {
                document: Arc::new(document.clone()),
                revision: 0,
            }),
            document: Mutex::new(document),
            persist_lock: tokio::sync::Mutex::new(()),
        };

        if migrated {
            store.upgrade_legacy(&legacy_key).await;
        }
        store
    }

    #[must_use]
    pub fn get_state(&self) -> OfflineState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OfflineState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn rules(&self) -> &OfflineRules {
        &self.rules
    }

    /// Projects the current document into the dashboard shape.
    #[must_use]
    pub fn dashboard(&self) -> DashboardSnapshot {
        self.get_state()
            .document
            .dashboard(&self.rules, self.clock.today())
    }

    //
    // ─── MUTATIONS ─────────────────────────────────────────────────────────────
    //

    pub async fn record_flashcard(&self, subject: &str, correct: bool) -> ActivityOutcome {
        self.mutate(|doc, rules, today, now| {
            doc.record_flashcard(subject, correct, rules, today, now)
        })
        .await
    }

    pub async fn toggle_chore(&self, chore_id: &str) -> ToggleOutcome {
        self.mutate(|doc, rules, today, now| doc.toggle_chore(chore_id, rules, today, now))
            .await
    }

    pub async fn toggle_outdoor_activity(&self, activity_id: &str) -> ToggleOutcome {
        self.mutate(|doc, rules, today, now| {
            doc.toggle_outdoor_activity(activity_id, rules, today, now)
        })
        .await
    }

    pub async fn view_affirmation(&self) -> ActivityOutcome {
        self.mutate(|doc, rules, today, now| doc.view_affirmation(rules, today, now))
            .await
    }

    /// Claims the next balanced level. Returns the new level, or `None` when
    /// some subject is still short.
    pub async fn level_up(&self) -> Option<u32> {
        self.mutate(|doc, rules, _today, now| doc.level_up(rules, now))
            .await
    }

    /// Wipes all progress for this child.
    pub async fn reset(&self) {
        self.mutate(|doc, _rules, _today, _now| *doc = OfflineProgress::default())
            .await;
    }

    async fn mutate<R>(
        &self,
        apply: impl FnOnce(&mut OfflineProgress, &OfflineRules, NaiveDate, DateTime<Utc>) -> R,
    ) -> R {
        let result = {
            let mut document = self.document();
            let now = self.clock.now();
            let result = apply(&mut document, &self.rules, self.clock.today(), now);
            let published = Arc::new(document.clone());
            self.state.send_modify(|state| {
                state.document = published;
                state.revision += 1;
            });
            result
        };
        self.persist().await;
        result
    }

    /// Writes the latest published document. Failures are logged and
    /// swallowed.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let document = Arc::clone(&self.state.borrow().document);
        if let Err(err) = self.write(&document).await {
            warn!(key = %self.key, error = %err, "offline progress write failed");
        }
    }

    async fn upgrade_legacy(&self, legacy_key: &str) {
        let document = Arc::clone(&self.state.borrow().document);
        if let Err(err) = self.write(&document).await {
            warn!(key = %self.key, error = %err, "migrated offline progress write failed");
            return;
        }
        if let Err(err) = self.kv.remove(legacy_key).await {
            warn!(key = legacy_key, error = %err, "legacy offline progress removal failed");
        }
    }

    async fn write(&self, document: &OfflineProgress) -> Result<(), StorageError> {
        let raw = serde_json::to_string(document)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&self.key, &raw).await
    }

    fn document(&self) -> MutexGuard<'_, OfflineProgress> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
