use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Achievement, ActivityTotals, DailyStats, SubjectStats, WeeklyStats};
use crate::progress::reward::reward_level;

//
// ─── BALANCED PROGRESS ─────────────────────────────────────────────────────────
//

/// How far one subject is from the next level's per-subject requirement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectRequirement {
    pub current: u32,
    pub required: u32,
    pub met: bool,
}

/// Result of the balanced leveling rule.
///
/// `can_level_up` holds iff `next_level` is `None` (max level) or every
/// entry in `subject_progress` is `met`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalancedProgress {
    pub can_level_up: bool,
    pub current_level: u32,
    pub next_level: Option<u32>,
    pub required_per_subject: u32,
    pub subject_progress: BTreeMap<String, SubjectRequirement>,
    pub lowest_subject: Option<String>,
    pub message: String,
}

impl BalancedProgress {
    /// Recomputes `can_level_up` from the other fields.
    #[must_use]
    pub fn derived_can_level_up(&self) -> bool {
        self.next_level.is_none() || self.subject_progress.values().all(|s| s.met)
    }
}

impl Default for BalancedProgress {
    fn default() -> Self {
        Self {
            can_level_up: true,
            current_level: 1,
            next_level: None,
            required_per_subject: 0,
            subject_progress: BTreeMap::new(),
            lowest_subject: None,
            message: String::new(),
        }
    }
}

//
// ─── REWARD LEVEL ──────────────────────────────────────────────────────────────
//

/// XP badge shown next to the child's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardLevel {
    pub level: u32,
    pub grade: u32,
    pub title: String,
    pub xp: u32,
    pub level_floor_xp: u32,
    pub next_level_xp: Option<u32>,
    pub progress_percent: u8,
}

impl Default for RewardLevel {
    fn default() -> Self {
        reward_level(0)
    }
}

//
// ─── DASHBOARD SNAPSHOT ────────────────────────────────────────────────────────
//

/// Everything the dashboard renders, as last known by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSnapshot {
    pub total_points: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub today: DailyStats,
    pub week: WeeklyStats,
    pub flashcards_by_subject: BTreeMap<String, SubjectStats>,
    pub totals: ActivityTotals,
    pub today_completed_chore_ids: Vec<String>,
    pub today_completed_outdoor_activity_ids: Vec<String>,
    pub achievements_unlocked: Vec<Achievement>,
    pub achievements_locked: Vec<Achievement>,
    pub balanced: BalancedProgress,
    pub reward: RewardLevel,
}
