use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Flashcard difficulty tier for a subject.
///
/// Ordered so that `Easy < Medium < Hard`; tiers only ever move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Wire code used by the backend and the local cache.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses a wire code, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// The tier above this one, or `None` at the top.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }

    /// Zero-based position in the tier ladder.
    #[must_use]
    pub fn tier_index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

//
// ─── SUBJECT STATS ─────────────────────────────────────────────────────────────
//

/// Per-subject flashcard counters.
///
/// `correct_streak` resets to 0 on a wrong answer and otherwise only grows.
/// `next_difficulty_at_streak == None` means the top tier has been reached.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectStats {
    pub completed: u32,
    pub correct: u32,
    pub correct_streak: u32,
    pub longest_streak: u32,
    pub difficulty_code: Option<Difficulty>,
    pub next_difficulty_at_streak: Option<u32>,
    pub current_tier_start_at_streak: u32,
}

//
// ─── ROLLUP BUCKETS ────────────────────────────────────────────────────────────
//

/// Aggregated activity for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub flashcards: u32,
    pub correct: u32,
    pub chores: u32,
    pub outdoor: u32,
    pub affirmations: u32,
    pub points: u32,
}

impl DailyStats {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// Number of activities of any kind recorded on this day.
    #[must_use]
    pub fn activity_count(&self) -> u32 {
        self.flashcards
            .saturating_add(self.chores)
            .saturating_add(self.outdoor)
            .saturating_add(self.affirmations)
    }
}

/// Aggregated activity for one week, starting on Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyStats {
    pub week_start: NaiveDate,
    pub flashcards: u32,
    pub correct: u32,
    pub chores: u32,
    pub outdoor: u32,
    pub affirmations: u32,
    pub points: u32,
    pub active_days: u32,
}

impl WeeklyStats {
    #[must_use]
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            ..Self::default()
        }
    }
}

/// Lifetime counters across every activity kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityTotals {
    pub flashcards: u32,
    pub correct: u32,
    pub chores: u32,
    pub outdoor: u32,
    pub affirmations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_codes_round_trip_and_order() {
        for tier in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::from_code(tier.code()), Some(tier));
        }
        assert_eq!(Difficulty::from_code(" HARD "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_code("expert"), None);
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert_eq!(Difficulty::Hard.next(), None);
    }

    #[test]
    fn subject_stats_decode_with_missing_fields() {
        let stats: SubjectStats = serde_json::from_str(r#"{"correct": 4}"#).unwrap();
        assert_eq!(stats.correct, 4);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.difficulty_code, None);
    }
}
