mod achievement;
mod event;
mod ids;
mod offline;
mod snapshot;
mod stats;

pub use ids::{ChildId, ParseIdError, UserId};

pub use achievement::{Achievement, AchievementCategory};
pub use event::{EventAck, EventBody, EventKind, ProgressEvent};
pub use offline::{
    DayCompletions, DayOpening, OFFLINE_SCHEMA_VERSION, OfflineProgress, ProgressData,
    SchoolProgressData,
};
pub use snapshot::{BalancedProgress, DashboardSnapshot, RewardLevel, SubjectRequirement};
pub use stats::{ActivityTotals, DailyStats, Difficulty, SubjectStats, WeeklyStats};
