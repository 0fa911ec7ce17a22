use std::collections::VecDeque;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{ActivityTotals, DailyStats, WeeklyStats};

pub const DAILY_HISTORY_DAYS: usize = 90;
pub const WEEKLY_HISTORY_WEEKS: usize = 12;

pub type DailyRollup = Rollup<DailyStats, DAILY_HISTORY_DAYS>;
pub type WeeklyRollup = Rollup<WeeklyStats, WEEKLY_HISTORY_WEEKS>;

/// Most recent Sunday on or before `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

//
// ─── ACTIVITY ──────────────────────────────────────────────────────────────────
//

/// One unit of activity counted by the rollups and totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Flashcard { correct: bool },
    Chore,
    Outdoor,
    Affirmation,
}

/// Whether an activity is being recorded or undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Record,
    Undo,
}

fn bump(counter: &mut u32, by: u32, direction: Direction) {
    *counter = match direction {
        Direction::Record => counter.saturating_add(by),
        Direction::Undo => counter.saturating_sub(by),
    };
}

/// Counters shared by daily buckets, weekly buckets and lifetime totals.
trait ActivityCounters {
    fn counters(&mut self) -> [&mut u32; 5];
}

fn tally(target: &mut impl ActivityCounters, activity: Activity, direction: Direction) {
    let [flashcards, correct, chores, outdoor, affirmations] = target.counters();
    match activity {
        Activity::Flashcard { correct: was_correct } => {
            bump(flashcards, 1, direction);
            if was_correct {
                bump(correct, 1, direction);
            }
        }
        Activity::Chore => bump(chores, 1, direction),
        Activity::Outdoor => bump(outdoor, 1, direction),
        Activity::Affirmation => bump(affirmations, 1, direction),
    }
}

impl ActivityCounters for DailyStats {
    fn counters(&mut self) -> [&mut u32; 5] {
        [
            &mut self.flashcards,
            &mut self.correct,
            &mut self.chores,
            &mut self.outdoor,
            &mut self.affirmations,
        ]
    }
}

impl ActivityCounters for WeeklyStats {
    fn counters(&mut self) -> [&mut u32; 5] {
        [
            &mut self.flashcards,
            &mut self.correct,
            &mut self.chores,
            &mut self.outdoor,
            &mut self.affirmations,
        ]
    }
}

impl ActivityCounters for ActivityTotals {
    fn counters(&mut self) -> [&mut u32; 5] {
        [
            &mut self.flashcards,
            &mut self.correct,
            &mut self.chores,
            &mut self.outdoor,
            &mut self.affirmations,
        ]
    }
}

impl ActivityTotals {
    pub fn apply(&mut self, activity: Activity, direction: Direction) {
        tally(self, activity, direction);
    }
}

//
// ─── RING BUFFER ───────────────────────────────────────────────────────────────
//

/// A bucket keyed by the first day of its period.
pub trait PeriodBucket {
    fn period_key(&self) -> NaiveDate;
    fn empty(key: NaiveDate) -> Self;
}

impl PeriodBucket for DailyStats {
    fn period_key(&self) -> NaiveDate {
        self.date
    }

    fn empty(key: NaiveDate) -> Self {
        DailyStats::new(key)
    }
}

impl PeriodBucket for WeeklyStats {
    fn period_key(&self) -> NaiveDate {
        self.week_start
    }

    fn empty(key: NaiveDate) -> Self {
        WeeklyStats::new(key)
    }
}

/// Fixed-capacity history of per-period aggregates, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rollup<T, const N: usize> {
    buckets: VecDeque<T>,
}

impl<T, const N: usize> Default for Rollup<T, N> {
    fn default() -> Self {
        Self {
            buckets: VecDeque::new(),
        }
    }
}

impl<T: PeriodBucket, const N: usize> Rollup<T, N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.iter()
    }

    #[must_use]
    pub fn get(&self, key: NaiveDate) -> Option<&T> {
        self.buckets.iter().rev().find(|b| b.period_key() == key)
    }

    pub fn get_mut(&mut self, key: NaiveDate) -> Option<&mut T> {
        self.buckets.iter_mut().rev().find(|b| b.period_key() == key)
    }

    /// Bucket for `key`, appending a new one (and evicting the oldest beyond
    /// capacity) when the period changed.
    pub fn bucket_mut(&mut self, key: NaiveDate) -> &mut T {
        if let Some(index) = self.buckets.iter().rposition(|b| b.period_key() == key) {
            return &mut self.buckets[index];
        }
        self.buckets.push_back(T::empty(key));
        while self.buckets.len() > N {
            self.buckets.pop_front();
        }
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    /// Oldest bucket, when opening a period for `key` would evict it.
    #[must_use]
    pub fn evicted_by(&self, key: NaiveDate) -> Option<&T> {
        if self.buckets.len() < N || self.get(key).is_some() {
            return None;
        }
        self.buckets.front()
    }

    /// Removes the bucket for `key`.
    pub fn remove(&mut self, key: NaiveDate) -> Option<T> {
        let index = self.buckets.iter().rposition(|b| b.period_key() == key)?;
        self.buckets.remove(index)
    }

    /// Puts a previously evicted bucket back as the oldest one.
    pub fn restore_oldest(&mut self, bucket: T) {
        if self.buckets.len() < N {
            self.buckets.push_front(bucket);
        }
    }

    /// Drops buckets beyond capacity, keeping the newest.
    pub fn truncate_to_capacity(&mut self) {
        while self.buckets.len() > N {
            self.buckets.pop_front();
        }
    }
}

//
// ─── RECORDING ─────────────────────────────────────────────────────────────────
//

/// Adds one activity (and its points) to the day and week containing `date`.
pub fn record_activity(
    daily: &mut DailyRollup,
    weekly: &mut WeeklyRollup,
    date: NaiveDate,
    activity: Activity,
    points: u32,
) {
    let day = daily.bucket_mut(date);
    let first_of_day = day.activity_count() == 0;
    tally(day, activity, Direction::Record);
    bump(&mut day.points, points, Direction::Record);

    let week = weekly.bucket_mut(week_start(date));
    tally(week, activity, Direction::Record);
    bump(&mut week.points, points, Direction::Record);
    if first_of_day {
        bump(&mut week.active_days, 1, Direction::Record);
    }
}

/// Removes one previously recorded activity. Missing buckets are left alone.
pub fn undo_activity(
    daily: &mut DailyRollup,
    weekly: &mut WeeklyRollup,
    date: NaiveDate,
    activity: Activity,
    points: u32,
) {
    let mut day_emptied = false;
    if let Some(day) = daily.get_mut(date) {
        tally(day, activity, Direction::Undo);
        bump(&mut day.points, points, Direction::Undo);
        day_emptied = day.activity_count() == 0;
    }
    if let Some(week) = weekly.get_mut(week_start(date)) {
        tally(week, activity, Direction::Undo);
        bump(&mut week.points, points, Direction::Undo);
        if day_emptied {
            bump(&mut week.active_days, 1, Direction::Undo);
        }
    }
}
