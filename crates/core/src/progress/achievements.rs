use chrono::{DateTime, Utc};

use crate::model::{Achievement, AchievementCategory, Difficulty};

/// Condition that unlocks an achievement.
///
/// Every requirement is a threshold over cumulative state, so once it holds
/// it keeps holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    FlashcardsAnswered(u32),
    CorrectAnswers(u32),
    Streak(u32),
    ChoresCompleted(u32),
    OutdoorCompleted(u32),
    AffirmationsViewed(u32),
    SubjectsStudied(u32),
    DifficultyReached(Difficulty),
    TotalPoints(u32),
    ActivitiesInOneDay(u32),
    ActiveDaysInOneWeek(u32),
    BalancedLevel(u32),
}

/// Static definition of an achievement.
#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: AchievementCategory,
    pub requirement: Requirement,
}

impl AchievementDef {
    /// Materializes the definition, locked or unlocked at `unlocked_at`.
    #[must_use]
    pub fn to_achievement(&self, unlocked_at: Option<DateTime<Utc>>) -> Achievement {
        Achievement {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            category: self.category,
            unlocked_at,
        }
    }
}

/// Cumulative, post-mutation state the requirements are checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementContext {
    pub flashcards: u32,
    pub correct: u32,
    pub best_streak: u32,
    pub chores: u32,
    pub outdoor: u32,
    pub affirmations: u32,
    pub subjects_studied: u32,
    pub highest_difficulty: Option<Difficulty>,
    pub total_points: u32,
    pub best_day_activities: u32,
    pub best_week_active_days: u32,
    pub balanced_level: u32,
}

impl Requirement {
    #[must_use]
    pub fn is_met(self, ctx: &AchievementContext) -> bool {
        match self {
            Requirement::FlashcardsAnswered(n) => ctx.flashcards >= n,
            Requirement::CorrectAnswers(n) => ctx.correct >= n,
            Requirement::Streak(n) => ctx.best_streak >= n,
            Requirement::ChoresCompleted(n) => ctx.chores >= n,
            Requirement::OutdoorCompleted(n) => ctx.outdoor >= n,
            Requirement::AffirmationsViewed(n) => ctx.affirmations >= n,
            Requirement::SubjectsStudied(n) => ctx.subjects_studied >= n,
            Requirement::DifficultyReached(tier) => {
                ctx.highest_difficulty.is_some_and(|d| d >= tier)
            }
            Requirement::TotalPoints(n) => ctx.total_points >= n,
            Requirement::ActivitiesInOneDay(n) => ctx.best_day_activities >= n,
            Requirement::ActiveDaysInOneWeek(n) => ctx.best_week_active_days >= n,
            Requirement::BalancedLevel(n) => ctx.balanced_level >= n,
        }
    }
}

/// Every achievement the engine knows about, in display order.
pub static CATALOG: &[AchievementDef] = &[
    AchievementDef {
        id: "first_flashcard",
        title: "First Card",
        description: "Answer your first flashcard",
        icon: "cards",
        category: AchievementCategory::Special,
        requirement: Requirement::FlashcardsAnswered(1),
    },
    AchievementDef {
        id: "correct_25",
        title: "Sharp Mind",
        description: "Answer 25 flashcards correctly",
        icon: "brain",
        category: AchievementCategory::Special,
        requirement: Requirement::CorrectAnswers(25),
    },
    AchievementDef {
        id: "correct_100",
        title: "Century",
        description: "Answer 100 flashcards correctly",
        icon: "trophy",
        category: AchievementCategory::Special,
        requirement: Requirement::CorrectAnswers(100),
    },
    AchievementDef {
        id: "all_subjects",
        title: "Well Rounded",
        description: "Study four different subjects",
        icon: "globe",
        category: AchievementCategory::Special,
        requirement: Requirement::SubjectsStudied(4),
    },
    AchievementDef {
        id: "hard_mode",
        title: "Challenge Accepted",
        description: "Reach hard difficulty in any subject",
        icon: "mountain",
        category: AchievementCategory::Special,
        requirement: Requirement::DifficultyReached(Difficulty::Hard),
    },
    AchievementDef {
        id: "first_chore",
        title: "Helping Hand",
        description: "Complete your first chore",
        icon: "broom",
        category: AchievementCategory::Special,
        requirement: Requirement::ChoresCompleted(1),
    },
    AchievementDef {
        id: "chores_25",
        title: "House Hero",
        description: "Complete 25 chores",
        icon: "house",
        category: AchievementCategory::Monthly,
        requirement: Requirement::ChoresCompleted(25),
    },
    AchievementDef {
        id: "first_outdoor",
        title: "Fresh Air",
        description: "Complete your first outdoor activity",
        icon: "tree",
        category: AchievementCategory::Special,
        requirement: Requirement::OutdoorCompleted(1),
    },
    AchievementDef {
        id: "outdoor_10",
        title: "Explorer",
        description: "Complete 10 outdoor activities",
        icon: "compass",
        category: AchievementCategory::Monthly,
        requirement: Requirement::OutdoorCompleted(10),
    },
    AchievementDef {
        id: "affirmations_7",
        title: "Kind Words",
        description: "View 7 affirmations",
        icon: "heart",
        category: AchievementCategory::Weekly,
        requirement: Requirement::AffirmationsViewed(7),
    },
    AchievementDef {
        id: "busy_day",
        title: "Busy Bee",
        description: "Do 5 activities in one day",
        icon: "bee",
        category: AchievementCategory::Daily,
        requirement: Requirement::ActivitiesInOneDay(5),
    },
    AchievementDef {
        id: "streak_3",
        title: "On a Roll",
        description: "Keep a 3-day streak",
        icon: "flame",
        category: AchievementCategory::Daily,
        requirement: Requirement::Streak(3),
    },
    AchievementDef {
        id: "streak_7",
        title: "Week Warrior",
        description: "Keep a 7-day streak",
        icon: "flame",
        category: AchievementCategory::Weekly,
        requirement: Requirement::Streak(7),
    },
    AchievementDef {
        id: "active_week",
        title: "Steady Week",
        description: "Be active 5 days in one week",
        icon: "calendar",
        category: AchievementCategory::Weekly,
        requirement: Requirement::ActiveDaysInOneWeek(5),
    },
    AchievementDef {
        id: "streak_30",
        title: "Unstoppable",
        description: "Keep a 30-day streak",
        icon: "rocket",
        category: AchievementCategory::Monthly,
        requirement: Requirement::Streak(30),
    },
    AchievementDef {
        id: "points_1000",
        title: "Point Collector",
        description: "Earn 1000 points",
        icon: "star",
        category: AchievementCategory::Special,
        requirement: Requirement::TotalPoints(1000),
    },
    AchievementDef {
        id: "balanced_level_3",
        title: "Balanced Learner",
        description: "Reach level 3 with every subject keeping up",
        icon: "scale",
        category: AchievementCategory::Special,
        requirement: Requirement::BalancedLevel(3),
    },
];

#[cfg(test)]
pub(crate) fn find_definition(id: &str) -> Option<&'static AchievementDef> {
    CATALOG.iter().find(|def| def.id == id)
}

/// Appends newly met achievements to `unlocked` and returns their ids.
///
/// Already unlocked ids are skipped, so re-evaluating the same state is a
/// no-op and existing `unlocked_at` stamps are never touched.
pub fn unlock_achievements(
    unlocked: &mut Vec<Achievement>,
    ctx: &AchievementContext,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut newly = Vec::new();
    for def in CATALOG {
        if unlocked.iter().any(|a| a.id == def.id) {
            continue;
        }
        if def.requirement.is_met(ctx) {
            unlocked.push(def.to_achievement(Some(now)));
            newly.push(def.id.to_string());
        }
    }
    newly
}

/// Catalog entries not yet unlocked, in catalog order.
#[must_use]
pub fn locked_achievements(unlocked: &[Achievement]) -> Vec<Achievement> {
    CATALOG
        .iter()
        .filter(|def| !unlocked.iter().any(|a| a.id == def.id))
        .map(|def| def.to_achievement(None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn catalog_ids_are_unique() {
        for (i, def) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[i + 1..].iter().all(|other| other.id != def.id),
                "duplicate id {}",
                def.id
            );
        }
    }

    #[test]
    fn unlocks_first_time_thresholds() {
        let mut unlocked = Vec::new();
        let ctx = AchievementContext {
            flashcards: 1,
            chores: 1,
            ..AchievementContext::default()
        };
        let ids = unlock_achievements(&mut unlocked, &ctx, fixed_now());
        assert_eq!(ids, vec!["first_flashcard", "first_chore"]);
        assert!(unlocked.iter().all(Achievement::is_unlocked));
    }

    #[test]
    fn evaluation_is_idempotent_and_keeps_first_timestamp() {
        let mut unlocked = Vec::new();
        let ctx = AchievementContext {
            best_streak: 7,
            ..AchievementContext::default()
        };
        let first = fixed_now();
        let ids = unlock_achievements(&mut unlocked, &ctx, first);
        assert_eq!(ids, vec!["streak_3", "streak_7"]);

        let later = first + chrono::Duration::days(2);
        let again = unlock_achievements(&mut unlocked, &ctx, later);
        assert!(again.is_empty());
        assert_eq!(unlocked.len(), 2);
        assert!(unlocked.iter().all(|a| a.unlocked_at == Some(first)));

        let earlier = first - chrono::Duration::days(2);
        unlock_achievements(&mut unlocked, &ctx, earlier);
        assert!(unlocked.iter().all(|a| a.unlocked_at == Some(first)));
    }

    #[test]
    fn multi_unit_jump_unlocks_every_crossed_threshold() {
        let mut unlocked = Vec::new();
        let ctx = AchievementContext {
            flashcards: 120,
            correct: 110,
            ..AchievementContext::default()
        };
        let ids = unlock_achievements(&mut unlocked, &ctx, fixed_now());
        assert!(ids.contains(&"correct_25".to_string()));
        assert!(ids.contains(&"correct_100".to_string()));
    }

    #[test]
    fn locked_list_excludes_unlocked() {
        let mut unlocked = Vec::new();
        let ctx = AchievementContext {
            outdoor: 1,
            ..AchievementContext::default()
        };
        unlock_achievements(&mut unlocked, &ctx, fixed_now());
        let locked = locked_achievements(&unlocked);
        assert_eq!(locked.len(), CATALOG.len() - 1);
        assert!(locked.iter().all(|a| a.id != "first_outdoor"));
        assert!(locked.iter().all(|a| a.unlocked_at.is_none()));
    }

    #[test]
    fn difficulty_requirement_accepts_higher_tiers_only() {
        let req = Requirement::DifficultyReached(Difficulty::Medium);
        let mut ctx = AchievementContext::default();
        assert!(!req.is_met(&ctx));
        ctx.highest_difficulty = Some(Difficulty::Easy);
        assert!(!req.is_met(&ctx));
        ctx.highest_difficulty = Some(Difficulty::Hard);
        assert!(req.is_met(&ctx));
        assert_eq!(find_definition("hard_mode").unwrap().title, "Challenge Accepted");
    }
}
