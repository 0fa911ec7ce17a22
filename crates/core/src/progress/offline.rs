use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    DashboardSnapshot, DayCompletions, DayOpening, OFFLINE_SCHEMA_VERSION, OfflineProgress,
    ProgressData,
};
use crate::progress::achievements::{AchievementContext, locked_achievements, unlock_achievements};
use crate::progress::difficulty::{DifficultyPolicy, record_answer};
use crate::progress::leveling::BalancedLeveling;
use crate::progress::reward::reward_level;
use crate::progress::rollup::{Activity, Direction, record_activity, undo_activity, week_start};
use crate::progress::streak::advance_streak;

/// Points granted per activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointValues {
    pub flashcard_correct: u32,
    pub flashcard_incorrect: u32,
    pub chore: u32,
    pub outdoor: u32,
    pub affirmation: u32,
}

impl PointValues {
    #[must_use]
    pub fn for_activity(&self, activity: Activity) -> u32 {
        match activity {
            Activity::Flashcard { correct: true } => self.flashcard_correct,
            Activity::Flashcard { correct: false } => self.flashcard_incorrect,
            Activity::Chore => self.chore,
            Activity::Outdoor => self.outdoor,
            Activity::Affirmation => self.affirmation,
        }
    }
}

impl Default for PointValues {
    fn default() -> Self {
        Self {
            flashcard_correct: 10,
            flashcard_incorrect: 2,
            chore: 15,
            outdoor: 20,
            affirmation: 5,
        }
    }
}

/// Tunables for the in-process calculators.
#[derive(Debug, Clone, Default)]
pub struct OfflineRules {
    pub points: PointValues,
    pub leveling: BalancedLeveling,
    pub difficulty: DifficultyPolicy,
}

/// Result of recording a single activity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityOutcome {
    pub points_awarded: u32,
    pub new_achievement_ids: Vec<String>,
}

/// Result of toggling a chore or outdoor activity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToggleOutcome {
    /// Whether the id is completed after the toggle.
    pub completed: bool,
    /// Signed change in total points.
    pub points_delta: i64,
    pub new_achievement_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Completion {
    Chore,
    Outdoor,
}

impl Completion {
    fn activity(self) -> Activity {
        match self {
            Completion::Chore => Activity::Chore,
            Completion::Outdoor => Activity::Outdoor,
        }
    }
}

/// Lowercased, trimmed subject key.
#[must_use]
pub fn normalize_subject(subject: &str) -> String {
    subject.trim().to_lowercase()
}

impl OfflineProgress {
    /// Records one flashcard answer.
    pub fn record_flashcard(
        &mut self,
        subject: &str,
        correct: bool,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ActivityOutcome {
        let stats = self
            .school
            .subjects
            .entry(normalize_subject(subject))
            .or_default();
        record_answer(stats, correct, &rules.difficulty);
        self.record(Activity::Flashcard { correct }, rules, today, now)
    }

    pub fn view_affirmation(
        &mut self,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ActivityOutcome {
        self.record(Activity::Affirmation, rules, today, now)
    }

    /// Marks a chore done today, or undoes it if it already was.
    pub fn toggle_chore(
        &mut self,
        chore_id: &str,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ToggleOutcome {
        self.toggle(Completion::Chore, chore_id, rules, today, now)
    }

    /// Marks an outdoor activity done today, or undoes it if it already was.
    pub fn toggle_outdoor_activity(
        &mut self,
        activity_id: &str,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ToggleOutcome {
        self.toggle(Completion::Outdoor, activity_id, rules, today, now)
    }

    /// Claims the next balanced level when every subject has caught up.
    ///
    /// Returns the new level, or `None` when the rule does not allow it.
    pub fn level_up(&mut self, rules: &OfflineRules, now: DateTime<Utc>) -> Option<u32> {
        let progress = rules
            .leveling
            .evaluate_at(&self.school.correct_counts(), self.school.level);
        let next = progress.next_level.filter(|_| progress.can_level_up)?;
        self.school.level = next;
        let ctx = self.achievement_context();
        unlock_achievements(&mut self.progress.achievements, &ctx, now);
        Some(next)
    }

    /// Cumulative state used to evaluate achievements.
    #[must_use]
    pub fn achievement_context(&self) -> AchievementContext {
        let p = &self.progress;
        let subjects_studied = self
            .school
            .subjects
            .values()
            .filter(|s| s.completed > 0)
            .count();
        AchievementContext {
            flashcards: p.totals.flashcards,
            correct: p.totals.correct,
            best_streak: p.current_streak.max(p.longest_streak),
            chores: p.totals.chores,
            outdoor: p.totals.outdoor,
            affirmations: p.totals.affirmations,
            subjects_studied: u32::try_from(subjects_studied).unwrap_or(u32::MAX),
            highest_difficulty: self
                .school
                .subjects
                .values()
                .filter_map(|s| s.difficulty_code)
                .max(),
            total_points: p.total_points,
            best_day_activities: p.daily.iter().map(|d| d.activity_count()).max().unwrap_or(0),
            best_week_active_days: p.weekly.iter().map(|w| w.active_days).max().unwrap_or(0),
            balanced_level: self.school.level,
        }
    }

    /// Repairs a freshly decoded document so invariants hold.
    pub fn normalize(&mut self) {
        self.version = OFFLINE_SCHEMA_VERSION;
        let p = &mut self.progress;
        p.longest_streak = p.longest_streak.max(p.current_streak);
        p.daily.truncate_to_capacity();
        p.weekly.truncate_to_capacity();

        let mut seen = BTreeSet::new();
        p.achievements
            .retain(|a| !a.id.is_empty() && a.unlocked_at.is_some() && seen.insert(a.id.clone()));

        self.school.level = self.school.level.max(1);
        for stats in self.school.subjects.values_mut() {
            stats.completed = stats.completed.max(stats.correct);
            stats.longest_streak = stats.longest_streak.max(stats.correct_streak);
        }
    }

    /// Projects the offline document into the dashboard shape.
    #[must_use]
    pub fn dashboard(&self, rules: &OfflineRules, today: NaiveDate) -> DashboardSnapshot {
        let p = &self.progress;
        let completed_today = p.completed_today.date == Some(today);
        let ids = |set: &BTreeSet<String>| {
            if completed_today {
                set.iter().cloned().collect()
            } else {
                Vec::new()
            }
        };

        DashboardSnapshot {
            total_points: p.total_points,
            current_streak: p.current_streak,
            longest_streak: p.longest_streak,
            last_active_date: p.last_active_date,
            today: p
                .daily
                .get(today)
                .cloned()
                .unwrap_or_else(|| crate::model::DailyStats::new(today)),
            week: p
                .weekly
                .get(week_start(today))
                .cloned()
                .unwrap_or_else(|| crate::model::WeeklyStats::new(week_start(today))),
            flashcards_by_subject: self.school.subjects.clone(),
            totals: p.totals.clone(),
            today_completed_chore_ids: ids(&p.completed_today.chore_ids),
            today_completed_outdoor_activity_ids: ids(&p.completed_today.outdoor_activity_ids),
            achievements_unlocked: p.achievements.clone(),
            achievements_locked: locked_achievements(&p.achievements),
            balanced: rules
                .leveling
                .evaluate_at(&self.school.correct_counts(), self.school.level),
            reward: reward_level(p.total_points),
        }
    }

    fn record(
        &mut self,
        activity: Activity,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ActivityOutcome {
        let points = rules.points.for_activity(activity);
        let p = &mut self.progress;
        p.total_points = p.total_points.saturating_add(points);
        p.totals.apply(activity, Direction::Record);
        record_activity(&mut p.daily, &mut p.weekly, today, activity, points);

        let streak = advance_streak(p.last_active_date, today, p.current_streak, p.longest_streak);
        p.current_streak = streak.current;
        p.longest_streak = streak.longest;
        p.last_active_date = Some(streak.last_active_date);

        let ctx = self.achievement_context();
        let new_achievement_ids = unlock_achievements(&mut self.progress.achievements, &ctx, now);
        ActivityOutcome {
            points_awarded: points,
            new_achievement_ids,
        }
    }

    fn toggle(
        &mut self,
        kind: Completion,
        id: &str,
        rules: &OfflineRules,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ToggleOutcome {
        let activity = kind.activity();
        let previous = self.progress.completed_today.clone();
        self.progress.completed_today.roll_to(today);

        if completion_ids(&mut self.progress.completed_today, kind).remove(id) {
            let points = rules.points.for_activity(activity);
            let p = &mut self.progress;
            p.total_points = p.total_points.saturating_sub(points);
            p.totals.apply(activity, Direction::Undo);
            undo_activity(&mut p.daily, &mut p.weekly, today, activity, points);
            if p.daily.get(today).is_some_and(|d| d.activity_count() == 0) {
                if let Some(opening) = p.completed_today.opened.take() {
                    close_day(p, today, opening);
                }
            }
            return ToggleOutcome {
                completed: false,
                points_delta: -i64::from(points),
                new_achievement_ids: Vec::new(),
            };
        }

        let opening = self.day_opening(today, previous);
        let completions = &mut self.progress.completed_today;
        completion_ids(completions, kind).insert(id.to_string());
        if opening.is_some() {
            completions.opened = opening;
        }
        let outcome = self.record(activity, rules, today, now);
        ToggleOutcome {
            completed: true,
            points_delta: i64::from(outcome.points_awarded),
            new_achievement_ids: outcome.new_achievement_ids,
        }
    }

    /// Snapshot of what recording the first activity of `today` replaces.
    fn day_opening(&self, today: NaiveDate, previous: DayCompletions) -> Option<DayOpening> {
        let p = &self.progress;
        if p.daily.get(today).is_some() {
            return None;
        }
        let week = week_start(today);
        Some(DayOpening {
            current_streak: p.current_streak,
            longest_streak: p.longest_streak,
            last_active_date: p.last_active_date,
            previous_date: previous.date,
            previous_chore_ids: previous.chore_ids,
            previous_outdoor_activity_ids: previous.outdoor_activity_ids,
            evicted_day: p.daily.evicted_by(today).cloned(),
            week_opened: p.weekly.get(week).is_none(),
            evicted_week: p.weekly.evicted_by(week).cloned(),
        })
    }
}

fn completion_ids(completions: &mut DayCompletions, kind: Completion) -> &mut BTreeSet<String> {
    match kind {
        Completion::Chore => &mut completions.chore_ids,
        Completion::Outdoor => &mut completions.outdoor_activity_ids,
    }
}

/// Puts back streaks, history and the completion date as they were before
/// the day's first completion. Unlocked achievements stay.
fn close_day(p: &mut ProgressData, today: NaiveDate, opening: DayOpening) {
    p.daily.remove(today);
    if let Some(day) = opening.evicted_day {
        p.daily.restore_oldest(day);
    }
    if opening.week_opened {
        p.weekly.remove(week_start(today));
        if let Some(week) = opening.evicted_week {
            p.weekly.restore_oldest(week);
        }
    }
    p.current_streak = opening.current_streak;
    p.longest_streak = opening.longest_streak;
    p.last_active_date = opening.last_active_date;
    p.completed_today = DayCompletions {
        date: opening.previous_date,
        chore_ids: opening.previous_chore_ids,
        outdoor_activity_ids: opening.previous_outdoor_activity_ids,
        opened: None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use crate::time::fixed_now;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
    }

    #[test]
    fn toggling_a_chore_twice_restores_points_and_counters() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        state.record_flashcard("math", true, &rules, today(), fixed_now());
        let before = state.clone();

        let on = state.toggle_chore("dishes", &rules, today(), fixed_now());
        assert!(on.completed);
        assert_eq!(on.points_delta, 15);
        let off = state.toggle_chore("dishes", &rules, today(), fixed_now());
        assert!(!off.completed);
        assert_eq!(off.points_delta, -15);

        assert_eq!(state.progress.total_points, before.progress.total_points);
        assert_eq!(state.progress.totals, before.progress.totals);
        assert_eq!(state.progress.daily, before.progress.daily);
        assert_eq!(state.progress.weekly, before.progress.weekly);
        assert_eq!(
            state.progress.completed_today.chore_ids,
            before.progress.completed_today.chore_ids
        );
    }

    #[test]
    fn first_completion_of_a_day_undoes_exactly_with_full_history() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        let mut day = today() - chrono::Duration::days(90);
        while day < today() {
            state.view_affirmation(&rules, day, fixed_now());
            day = day.succ_opt().unwrap();
        }
        state.toggle_chore("bed", &rules, today() - chrono::Duration::days(1), fixed_now());
        let before = state.progress.clone();
        assert_eq!(before.current_streak, 90);
        assert_eq!(before.daily.len(), 90);

        state.toggle_chore("dishes", &rules, today(), fixed_now());
        assert_eq!(state.progress.current_streak, 91);
        state.toggle_chore("dishes", &rules, today(), fixed_now());

        let after = &state.progress;
        assert_eq!(after.current_streak, before.current_streak);
        assert_eq!(after.longest_streak, before.longest_streak);
        assert_eq!(after.last_active_date, before.last_active_date);
        assert_eq!(after.daily, before.daily);
        assert_eq!(after.weekly, before.weekly);
        assert_eq!(after.totals, before.totals);
        assert_eq!(after.total_points, before.total_points);
        assert_eq!(after.completed_today, before.completed_today);
        assert_eq!(after.achievements, before.achievements);
    }

    #[test]
    fn other_activity_keeps_the_day_open_after_undo() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        state.view_affirmation(&rules, today().pred_opt().unwrap(), fixed_now());

        state.toggle_outdoor_activity("bike", &rules, today(), fixed_now());
        state.view_affirmation(&rules, today(), fixed_now());
        state.toggle_outdoor_activity("bike", &rules, today(), fixed_now());

        assert_eq!(state.progress.current_streak, 2);
        assert_eq!(state.progress.last_active_date, Some(today()));
        assert_eq!(state.progress.daily.get(today()).unwrap().affirmations, 1);
        assert_eq!(state.progress.daily.get(today()).unwrap().outdoor, 0);
    }

    #[test]
    fn activity_after_yesterday_extends_the_streak() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        state.progress.current_streak = 4;
        state.progress.longest_streak = 4;
        state.progress.last_active_date = today().pred_opt();

        state.view_affirmation(&rules, today(), fixed_now());

        assert_eq!(state.progress.current_streak, 5);
        assert_eq!(state.progress.longest_streak, 5);
        assert_eq!(state.progress.last_active_date, Some(today()));
    }

    #[test]
    fn flashcards_update_subject_stats_and_points() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        let first = state.record_flashcard(" Math ", true, &rules, today(), fixed_now());
        let second = state.record_flashcard("math", false, &rules, today(), fixed_now());

        assert_eq!(first.points_awarded, 10);
        assert_eq!(first.new_achievement_ids, vec!["first_flashcard"]);
        assert_eq!(second.points_awarded, 2);
        assert!(second.new_achievement_ids.is_empty());

        let math = &state.school.subjects["math"];
        assert_eq!(math.completed, 2);
        assert_eq!(math.correct, 1);
        assert_eq!(math.correct_streak, 0);
        assert_eq!(math.difficulty_code, Some(Difficulty::Easy));
        assert_eq!(state.progress.total_points, 12);
    }

    #[test]
    fn completions_reset_on_a_new_day() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        state.toggle_outdoor_activity("bike", &rules, today(), fixed_now());

        let tomorrow = today().succ_opt().unwrap();
        let outcome = state.toggle_outdoor_activity("bike", &rules, tomorrow, fixed_now());
        assert!(outcome.completed);
        assert_eq!(state.progress.totals.outdoor, 2);

        let dashboard = state.dashboard(&rules, tomorrow);
        assert_eq!(dashboard.today_completed_outdoor_activity_ids, vec!["bike"]);
        let stale = state.dashboard(&rules, tomorrow.succ_opt().unwrap());
        assert!(stale.today_completed_outdoor_activity_ids.is_empty());
    }

    #[test]
    fn level_up_requires_every_subject() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        for _ in 0..5 {
            state.record_flashcard("math", true, &rules, today(), fixed_now());
            state.record_flashcard("reading", true, &rules, today(), fixed_now());
            state.record_flashcard("science", true, &rules, today(), fixed_now());
        }
        assert_eq!(state.level_up(&rules, fixed_now()), None);

        for _ in 0..5 {
            state.record_flashcard("spelling", true, &rules, today(), fixed_now());
        }
        assert_eq!(state.level_up(&rules, fixed_now()), Some(2));
        assert_eq!(state.school.level, 2);
        assert_eq!(state.level_up(&rules, fixed_now()), None);
    }

    #[test]
    fn dashboard_projects_balanced_and_reward() {
        let rules = OfflineRules::default();
        let mut state = OfflineProgress::default();
        state.toggle_chore("bed", &rules, today(), fixed_now());
        let dashboard = state.dashboard(&rules, today());

        assert_eq!(dashboard.total_points, 15);
        assert_eq!(dashboard.today.chores, 1);
        assert_eq!(dashboard.week.active_days, 1);
        assert_eq!(dashboard.balanced.current_level, 1);
        assert_eq!(dashboard.balanced.lowest_subject.as_deref(), Some("math"));
        assert_eq!(dashboard.reward.level, 1);
        assert_eq!(dashboard.achievements_unlocked.len(), 1);
        assert_eq!(
            dashboard.achievements_unlocked.len() + dashboard.achievements_locked.len(),
            crate::progress::achievements::CATALOG.len()
        );
    }

    #[test]
    fn normalize_repairs_inconsistent_documents() {
        let mut state = OfflineProgress::default();
        state.version = 1;
        state.progress.current_streak = 9;
        state.progress.longest_streak = 2;
        state.school.level = 0;
        state.progress.achievements.push(
            crate::progress::achievements::find_definition("first_chore")
                .unwrap()
                .to_achievement(None),
        );

        state.normalize();

        assert_eq!(state.version, OFFLINE_SCHEMA_VERSION);
        assert_eq!(state.progress.longest_streak, 9);
        assert_eq!(state.school.level, 1);
        assert!(state.progress.achievements.is_empty());
    }
}
