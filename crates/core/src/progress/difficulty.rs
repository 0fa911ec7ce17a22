use crate::model::{Difficulty, SubjectStats};

/// Cumulative correct answers at which a subject reaches `Medium`.
pub const MEDIUM_AT_CORRECT: u32 = 20;
/// Cumulative correct answers at which a subject reaches `Hard`.
pub const HARD_AT_CORRECT: u32 = 40;

/// Difficulty from lifetime correct answers (easy 0, medium 20, hard 40).
#[must_use]
pub fn difficulty_for_correct(correct: u32) -> Difficulty {
    if correct >= HARD_AT_CORRECT {
        Difficulty::Hard
    } else if correct >= MEDIUM_AT_CORRECT {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

/// Consecutive-correct requirements for leaving each tier.
///
/// `steps[0]` is the run needed to go Easy -> Medium, `steps[1]` Medium -> Hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakTierPolicy {
    steps: Vec<u32>,
}

impl StreakTierPolicy {
    #[must_use]
    pub fn new(steps: Vec<u32>) -> Self {
        Self { steps }
    }

    /// Streak length needed within `tier` before advancing; `None` at the top.
    #[must_use]
    pub fn step_for(&self, tier: Difficulty) -> Option<u32> {
        tier.next()?;
        self.steps
            .get(tier.tier_index())
            .copied()
            .filter(|step| *step > 0)
    }
}

impl Default for StreakTierPolicy {
    fn default() -> Self {
        Self::new(vec![5, 8])
    }
}

/// How a subject's difficulty advances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DifficultyPolicy {
    /// Step function of lifetime correct answers.
    #[default]
    Cumulative,
    /// Advance after a run of consecutive correct answers.
    StreakTiers(StreakTierPolicy),
}

/// Records one flashcard answer against a subject.
///
/// A wrong answer zeroes `correct_streak` but never lowers `difficulty_code`.
pub fn record_answer(stats: &mut SubjectStats, correct: bool, policy: &DifficultyPolicy) {
    stats.completed = stats.completed.saturating_add(1);
    if correct {
        stats.correct = stats.correct.saturating_add(1);
        stats.correct_streak = stats.correct_streak.saturating_add(1);
        stats.longest_streak = stats.longest_streak.max(stats.correct_streak);
    } else {
        stats.correct_streak = 0;
    }

    match policy {
        DifficultyPolicy::Cumulative => {
            let earned = difficulty_for_correct(stats.correct);
            stats.difficulty_code = Some(stats.difficulty_code.map_or(earned, |d| d.max(earned)));
        }
        DifficultyPolicy::StreakTiers(tiers) => apply_streak_tiers(stats, correct, tiers),
    }
}

fn apply_streak_tiers(stats: &mut SubjectStats, correct: bool, tiers: &StreakTierPolicy) {
    let tier = match stats.difficulty_code {
        Some(tier) => tier,
        None => {
            stats.current_tier_start_at_streak = 0;
            stats.next_difficulty_at_streak = tiers.step_for(Difficulty::Easy);
            stats.difficulty_code = Some(Difficulty::Easy);
            Difficulty::Easy
        }
    };

    if !correct {
        stats.current_tier_start_at_streak = 0;
        stats.next_difficulty_at_streak = tiers.step_for(tier);
        return;
    }

    let Some(target) = stats.next_difficulty_at_streak else {
        return;
    };
    if stats.correct_streak < target {
        return;
    }

    match tier.next() {
        Some(next) => {
            stats.difficulty_code = Some(next);
            stats.current_tier_start_at_streak = stats.correct_streak;
            stats.next_difficulty_at_streak = tiers
                .step_for(next)
                .map(|step| stats.correct_streak.saturating_add(step));
        }
        None => stats.next_difficulty_at_streak = None,
    }
}
