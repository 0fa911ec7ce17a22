use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::{BalancedProgress, SubjectRequirement};

/// Cumulative correct answers (summed over all subjects) needed per level.
///
/// Index 0 is level 1.
pub const DEFAULT_LEVEL_THRESHOLDS: [u32; 10] = [0, 20, 52, 100, 160, 240, 340, 460, 600, 800];

/// Subjects the leveling rule tracks by default.
pub const DEFAULT_SUBJECTS: [&str; 4] = ["math", "reading", "science", "spelling"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LevelingError {
    #[error("at least one level threshold is required")]
    EmptyThresholds,

    #[error("level thresholds must be strictly increasing (index {index})")]
    NonIncreasing { index: usize },

    #[error("at least one subject is required")]
    NoSubjects,

    #[error("duplicate subject: {0}")]
    DuplicateSubject(String),
}

/// `ceil(threshold / subject_count)`; the per-subject share of a level.
#[must_use]
pub fn required_per_subject(threshold: u32, subject_count: usize) -> u32 {
    let Ok(count) = u32::try_from(subject_count) else {
        return 0;
    };
    if count == 0 {
        return threshold;
    }
    threshold.div_ceil(count)
}

/// Level progression gated by the weakest subject.
///
/// A level with threshold `T` over `n` subjects needs every subject to reach
/// `ceil(T / n)` correct answers. Grinding one subject cannot lift the level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedLeveling {
    thresholds: Vec<u32>,
    subjects: Vec<String>,
}

impl BalancedLeveling {
    /// # Errors
    ///
    /// Returns `LevelingError` if thresholds are empty or not strictly
    /// increasing, or if subjects are empty or repeated.
    pub fn new(thresholds: Vec<u32>, subjects: Vec<String>) -> Result<Self, LevelingError> {
        if thresholds.is_empty() {
            return Err(LevelingError::EmptyThresholds);
        }
        if let Some(index) = thresholds.windows(2).position(|w| w[1] <= w[0]) {
            return Err(LevelingError::NonIncreasing { index: index + 1 });
        }
        if subjects.is_empty() {
            return Err(LevelingError::NoSubjects);
        }
        let mut seen = BTreeSet::new();
        for subject in &subjects {
            if !seen.insert(subject.as_str()) {
                return Err(LevelingError::DuplicateSubject(subject.clone()));
            }
        }
        Ok(Self {
            thresholds,
            subjects,
        })
    }

    #[must_use]
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.thresholds.len()).unwrap_or(u32::MAX)
    }

    /// Threshold for a 1-based level.
    #[must_use]
    pub fn threshold(&self, level: u32) -> Option<u32> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.thresholds.get(index).copied()
    }

    #[must_use]
    pub fn required_for_level(&self, level: u32) -> Option<u32> {
        self.threshold(level)
            .map(|t| required_per_subject(t, self.subjects.len()))
    }

    /// Highest level whose per-subject share the weakest subject meets.
    #[must_use]
    pub fn earned_level(&self, counts: &BTreeMap<String, u32>) -> u32 {
        let minimum = self.minimum(counts);
        (1..=self.max_level())
            .take_while(|level| {
                self.required_for_level(*level)
                    .is_some_and(|required| minimum >= required)
            })
            .last()
            .unwrap_or(1)
    }

    /// Evaluates progress from the level the counts have earned.
    #[must_use]
    pub fn evaluate(&self, counts: &BTreeMap<String, u32>) -> BalancedProgress {
        self.evaluate_at(counts, self.earned_level(counts))
    }

    /// Evaluates progress toward the level after `level`.
    ///
    /// Used when the level is claimed explicitly and may lag what has been
    /// earned; `can_level_up` then tells whether the claim is allowed.
    #[must_use]
    pub fn evaluate_at(&self, counts: &BTreeMap<String, u32>, level: u32) -> BalancedProgress {
        let current_level = level.clamp(1, self.max_level());
        let next_level = (current_level < self.max_level()).then_some(current_level + 1);
        let required = next_level
            .or(Some(current_level))
            .and_then(|l| self.required_for_level(l))
            .unwrap_or(0);

        let mut subject_progress = BTreeMap::new();
        let mut lowest: Option<(&str, u32)> = None;
        for subject in &self.subjects {
            let current = counts.get(subject).copied().unwrap_or(0);
            if lowest.is_none_or(|(_, min)| current < min) {
                lowest = Some((subject, current));
            }
            subject_progress.insert(
                subject.clone(),
                SubjectRequirement {
                    current,
                    required,
                    met: current >= required,
                },
            );
        }

        let all_met = subject_progress.values().all(|s| s.met);
        let can_level_up = next_level.is_none() || all_met;
        let message = match (next_level, lowest) {
            (None, _) => "You've reached the highest level!".to_string(),
            (Some(next), _) if all_met => format!("Ready to level up to Level {next}!"),
            (Some(next), Some((subject, current))) => format!(
                "Focus on {subject} to reach Level {next} ({current}/{required} correct)"
            ),
            (Some(next), None) => format!("Keep practicing to reach Level {next}"),
        };

        BalancedProgress {
            can_level_up,
            current_level,
            next_level,
            required_per_subject: required,
            subject_progress,
            lowest_subject: lowest.map(|(subject, _)| subject.to_string()),
            message,
        }
    }

    fn minimum(&self, counts: &BTreeMap<String, u32>) -> u32 {
        self.subjects
            .iter()
            .map(|s| counts.get(s).copied().unwrap_or(0))
            .min()
            .unwrap_or(0)
    }
}

impl Default for BalancedLeveling {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_LEVEL_THRESHOLDS.to_vec(),
            subjects: DEFAULT_SUBJECTS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}
