//! Defensive decoding of backend payloads.
//!
//! The backend is trusted for meaning but not for shape: numbers may arrive
//! as floats, strings or negatives, enums may carry unknown codes, and whole
//! sections may be missing. Every field is coerced on its own so one bad
//! value never discards the rest of the snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use progress_core::model::{
    Achievement, AchievementCategory, ActivityTotals, BalancedProgress, DailyStats,
    DashboardSnapshot, Difficulty, EventAck, RewardLevel, SubjectRequirement, SubjectStats,
    WeeklyStats,
};
use progress_core::progress::reward_level;
use serde_json::Value;

use crate::error::ApiError;

//
// ─── SCALARS ───────────────────────────────────────────────────────────────────
//

/// Looks up `key`, falling back to its `snake_case` spelling.
fn get<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(snake_case(key)))
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Non-negative integer; anything unusable becomes 0.
#[must_use]
pub fn coerce_u32(value: Option<&Value>) -> u32 {
    let as_float = match value {
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return u32::try_from(u).unwrap_or(u32::MAX);
            }
            n.as_f64()
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match as_float {
        Some(f) if f.is_finite() && f > 0.0 => {
            if f >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                // in range and non-negative after the checks above
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let truncated = f.floor() as u32;
                truncated
            }
        }
        _ => 0,
    }
}

fn coerce_opt_u32(value: Option<&Value>) -> Option<u32> {
    match value {
        None | Some(Value::Null) => None,
        other => Some(coerce_u32(other)),
    }
}

fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = coerce_string(value)?;
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

fn coerce_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = coerce_string(value)?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| coerce_string(Some(item)))
            .filter(|s| !s.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn objects(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

fn subject_stats(obj: &Value) -> SubjectStats {
    SubjectStats {
        completed: coerce_u32(get(obj, "completed")),
        correct: coerce_u32(get(obj, "correct")),
        correct_streak: coerce_u32(get(obj, "correctStreak")),
        longest_streak: coerce_u32(get(obj, "longestStreak")),
        difficulty_code: coerce_string(get(obj, "difficultyCode"))
            .and_then(|code| Difficulty::from_code(&code)),
        next_difficulty_at_streak: coerce_opt_u32(get(obj, "nextDifficultyAtStreak")),
        current_tier_start_at_streak: coerce_u32(get(obj, "currentTierStartAtStreak")),
    }
}

fn daily_stats(obj: &Value) -> DailyStats {
    DailyStats {
        date: coerce_date(get(obj, "date")).unwrap_or_default(),
        flashcards: coerce_u32(get(obj, "flashcards")),
        correct: coerce_u32(get(obj, "correct")),
        chores: coerce_u32(get(obj, "chores")),
        outdoor: coerce_u32(get(obj, "outdoor")),
        affirmations: coerce_u32(get(obj, "affirmations")),
        points: coerce_u32(get(obj, "points")),
    }
}

fn weekly_stats(obj: &Value) -> WeeklyStats {
    WeeklyStats {
        week_start: coerce_date(get(obj, "weekStart")).unwrap_or_default(),
        flashcards: coerce_u32(get(obj, "flashcards")),
        correct: coerce_u32(get(obj, "correct")),
        chores: coerce_u32(get(obj, "chores")),
        outdoor: coerce_u32(get(obj, "outdoor")),
        affirmations: coerce_u32(get(obj, "affirmations")),
        points: coerce_u32(get(obj, "points")),
        active_days: coerce_u32(get(obj, "activeDays")).min(7),
    }
}

fn totals(obj: &Value) -> ActivityTotals {
    ActivityTotals {
        flashcards: coerce_u32(get(obj, "flashcards")),
        correct: coerce_u32(get(obj, "correct")),
        chores: coerce_u32(get(obj, "chores")),
        outdoor: coerce_u32(get(obj, "outdoor")),
        affirmations: coerce_u32(get(obj, "affirmations")),
    }
}

fn achievement(obj: &Value) -> Option<Achievement> {
    let id = coerce_string(get(obj, "id")).filter(|id| !id.trim().is_empty())?;
    Some(Achievement {
        title: coerce_string(get(obj, "title")).unwrap_or_else(|| id.clone()),
        description: coerce_string(get(obj, "description")).unwrap_or_default(),
        icon: coerce_string(get(obj, "icon")).unwrap_or_default(),
        category: coerce_string(get(obj, "category"))
            .and_then(|code| AchievementCategory::from_code(&code))
            .unwrap_or_default(),
        unlocked_at: coerce_datetime(get(obj, "unlockedAt")),
        id,
    })
}

/// Decodes the balanced-leveling block and re-derives the flags it carries.
fn balanced(obj: &Value) -> BalancedProgress {
    let required_per_subject = coerce_u32(get(obj, "requiredPerSubject"));
    let mut subject_progress = BTreeMap::new();
    if let Some(Value::Object(map)) = get(obj, "subjectProgress") {
        for (subject, entry) in map {
            let current = coerce_u32(get(entry, "current"));
            let required = match get(entry, "required") {
                Some(v) => coerce_u32(Some(v)),
                None => required_per_subject,
            };
            subject_progress.insert(
                subject.clone(),
                SubjectRequirement {
                    current,
                    required,
                    met: current >= required,
                },
            );
        }
    }

    let current_level = coerce_u32(get(obj, "currentLevel")).max(1);
    let next_level = coerce_opt_u32(get(obj, "nextLevel")).filter(|next| *next > current_level);
    let lowest_subject = coerce_string(get(obj, "lowestSubject")).or_else(|| {
        subject_progress
            .iter()
            .min_by_key(|(_, s)| s.current)
            .map(|(name, _)| name.clone())
    });

    let mut progress = BalancedProgress {
        can_level_up: false,
        current_level,
        next_level,
        required_per_subject,
        subject_progress,
        lowest_subject,
        message: coerce_string(get(obj, "message")).unwrap_or_default(),
    };
    progress.can_level_up = progress.derived_can_level_up();
    progress
}

fn reward(obj: Option<&Value>, total_points: u32) -> RewardLevel {
    let Some(obj) = obj.filter(|v| v.is_object()) else {
        return reward_level(total_points);
    };
    let computed = reward_level(total_points);
    RewardLevel {
        level: coerce_u32(get(obj, "level")).max(1),
        grade: coerce_u32(get(obj, "grade")).max(1),
        title: coerce_string(get(obj, "title")).unwrap_or(computed.title),
        xp: get(obj, "xp").map_or(total_points, |v| coerce_u32(Some(v))),
        level_floor_xp: coerce_u32(get(obj, "levelFloorXp")),
        next_level_xp: coerce_opt_u32(get(obj, "nextLevelXp")),
        progress_percent: u8::try_from(coerce_u32(get(obj, "progressPercent")).min(100))
            .unwrap_or(100),
    }
}

//
// ─── ENTRY POINTS ──────────────────────────────────────────────────────────────
//

/// Builds a snapshot from any JSON value; missing or malformed fields take
/// safe defaults.
#[must_use]
pub fn decode_snapshot(value: &Value) -> DashboardSnapshot {
    let total_points = coerce_u32(get(value, "totalPoints"));
    let current_streak = coerce_u32(get(value, "currentStreak"));

    let mut flashcards_by_subject = BTreeMap::new();
    if let Some(Value::Object(map)) = get(value, "flashcardsBySubject") {
        for (subject, stats) in map {
            flashcards_by_subject.insert(subject.clone(), subject_stats(stats));
        }
    }

    let unlocked: Vec<Achievement> = objects(get(value, "achievementsUnlocked"))
        .iter()
        .filter_map(achievement)
        .collect();
    let locked = objects(get(value, "achievementsLocked"))
        .iter()
        .filter_map(achievement)
        .filter(|a| !unlocked.iter().any(|u| u.id == a.id))
        .map(|a| Achievement {
            unlocked_at: None,
            ..a
        })
        .collect();

    DashboardSnapshot {
        total_points,
        current_streak,
        longest_streak: coerce_u32(get(value, "longestStreak")).max(current_streak),
        last_active_date: coerce_date(get(value, "lastActiveDate")),
        today: get(value, "today").map(daily_stats).unwrap_or_default(),
        week: get(value, "week").map(weekly_stats).unwrap_or_default(),
        flashcards_by_subject,
        totals: get(value, "totals").map(totals).unwrap_or_default(),
        today_completed_chore_ids: string_list(get(value, "todayCompletedChoreIds")),
        today_completed_outdoor_activity_ids: string_list(get(
            value,
            "todayCompletedOutdoorActivityIds",
        )),
        achievements_unlocked: unlocked,
        achievements_locked: locked,
        balanced: get(value, "balanced").map(balanced).unwrap_or_default(),
        reward: reward(get(value, "reward"), total_points),
    }
}

#[must_use]
pub fn decode_ack(value: &Value) -> EventAck {
    EventAck {
        points_awarded: coerce_u32(get(value, "pointsAwarded")),
        new_achievement_ids: string_list(get(value, "newAchievementIds")),
    }
}

/// Parses a raw body and decodes the dashboard inside it.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the body is not JSON or not an object.
pub fn parse_snapshot(body: &str) -> Result<DashboardSnapshot, ApiError> {
    let value = parse_object(body)?;
    Ok(decode_snapshot(&value))
}

/// Parses a raw body and decodes the event acknowledgment inside it.
///
/// An empty body is treated as an empty acknowledgment.
///
/// # Errors
///
/// Returns `ApiError::Decode` if a non-empty body is not a JSON object.
pub fn parse_ack(body: &str) -> Result<EventAck, ApiError> {
    if body.trim().is_empty() {
        return Ok(EventAck::default());
    }
    let value = parse_object(body)?;
    Ok(decode_ack(&value))
}

fn parse_object(body: &str) -> Result<Value, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::Decode("expected a JSON object".into()));
    }
    Ok(value)
}
