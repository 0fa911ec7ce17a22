use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Achievement, ActivityTotals, DailyStats, SubjectStats, WeeklyStats};
use crate::progress::rollup::{DailyRollup, WeeklyRollup};

/// Current version of the persisted offline document.
pub const OFFLINE_SCHEMA_VERSION: u32 = 2;

/// Chore and outdoor ids completed on `date`.
///
/// The sets are only meaningful for `date`; a new day starts empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayCompletions {
    pub date: Option<NaiveDate>,
    pub chore_ids: BTreeSet<String>,
    pub outdoor_activity_ids: BTreeSet<String>,
    /// Set when a completion started the day's activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened: Option<DayOpening>,
}

impl DayCompletions {
    /// Drops completions that belong to an earlier day.
    pub fn roll_to(&mut self, today: NaiveDate) {
        if self.date != Some(today) {
            self.date = Some(today);
            self.chore_ids.clear();
            self.outdoor_activity_ids.clear();
            self.opened = None;
        }
    }
}

/// What the first completion of a day replaced.
///
/// Restored when toggling completions off leaves the day without activity,
/// so a toggle on and off is an exact inverse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayOpening {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    /// Completions of the earlier day, as they were before the roll-over.
    pub previous_date: Option<NaiveDate>,
    pub previous_chore_ids: BTreeSet<String>,
    pub previous_outdoor_activity_ids: BTreeSet<String>,
    /// Daily bucket pushed out of a full ring by today's bucket.
    pub evicted_day: Option<DailyStats>,
    /// Whether today's activity also started the week's bucket.
    pub week_opened: bool,
    pub evicted_week: Option<WeeklyStats>,
}

/// General (non-school) progress tracked by the offline variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressData {
    pub total_points: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub daily: DailyRollup,
    pub weekly: WeeklyRollup,
    pub totals: ActivityTotals,
    pub completed_today: DayCompletions,
    pub achievements: Vec<Achievement>,
}

/// Flashcard subjects plus the level the child has claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolProgressData {
    pub subjects: BTreeMap<String, SubjectStats>,
    pub level: u32,
}

impl Default for SchoolProgressData {
    fn default() -> Self {
        Self {
            subjects: BTreeMap::new(),
            level: 1,
        }
    }
}

impl SchoolProgressData {
    /// Correct-answer count per subject.
    #[must_use]
    pub fn correct_counts(&self) -> BTreeMap<String, u32> {
        self.subjects
            .iter()
            .map(|(name, stats)| (name.clone(), stats.correct))
            .collect()
    }
}

/// The whole document persisted by the offline store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfflineProgress {
    pub version: u32,
    pub progress: ProgressData,
    pub school: SchoolProgressData,
}

impl Default for OfflineProgress {
    fn default() -> Self {
        Self {
            version: OFFLINE_SCHEMA_VERSION,
            progress: ProgressData::default(),
            school: SchoolProgressData::default(),
        }
    }
}
