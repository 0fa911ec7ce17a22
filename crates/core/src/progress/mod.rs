//! Pure calculators behind the dashboard: streaks, difficulty tiers,
//! balanced leveling, achievements, rollups and the reward badge.

pub mod achievements;
pub mod difficulty;
pub mod leveling;
pub mod offline;
pub mod reward;
pub mod rollup;
pub mod streak;

pub use achievements::{AchievementContext, CATALOG, locked_achievements, unlock_achievements};
pub use difficulty::{DifficultyPolicy, StreakTierPolicy, record_answer};
pub use leveling::{BalancedLeveling, LevelingError};
pub use offline::{ActivityOutcome, OfflineRules, PointValues, ToggleOutcome};
pub use reward::reward_level;
pub use rollup::{Activity, Direction, week_start};
pub use streak::{StreakUpdate, advance_streak};
