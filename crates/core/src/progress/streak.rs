use chrono::NaiveDate;

/// Streak counters after recording activity on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub current: u32,
    pub longest: u32,
    pub last_active_date: NaiveDate,
}

/// Applies the daily streak rule for activity on `today`.
///
/// - same day as `last_active`: streak unchanged
/// - `last_active` is exactly the previous calendar day: streak + 1
/// - any other gap, or no previous activity: streak restarts at 1
///
/// `longest` never decreases.
#[must_use]
pub fn advance_streak(
    last_active: Option<NaiveDate>,
    today: NaiveDate,
    current: u32,
    longest: u32,
) -> StreakUpdate {
    let current = match last_active {
        Some(last) if last == today => current,
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    };

    StreakUpdate {
        current,
        longest: longest.max(current),
        last_active_date: today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn yesterday_extends_the_streak() {
        let update = advance_streak(Some(day(9)), day(10), 4, 4);
        assert_eq!(update.current, 5);
        assert_eq!(update.longest, 5);
        assert_eq!(update.last_active_date, day(10));
    }

    #[test]
    fn longest_keeps_previous_best() {
        let update = advance_streak(Some(day(9)), day(10), 4, 12);
        assert_eq!(update.current, 5);
        assert_eq!(update.longest, 12);
    }

    #[test]
    fn same_day_is_unchanged() {
        let update = advance_streak(Some(day(10)), day(10), 3, 7);
        assert_eq!(update.current, 3);
        assert_eq!(update.longest, 7);
    }

    #[test]
    fn any_other_gap_resets_to_one() {
        assert_eq!(advance_streak(Some(day(7)), day(10), 9, 9).current, 1);
        assert_eq!(advance_streak(None, day(10), 0, 0).current, 1);
        // a date in the future (clock moved backwards) also restarts
        assert_eq!(advance_streak(Some(day(11)), day(10), 6, 6).current, 1);
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let feb_end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let update = advance_streak(Some(feb_end), day(1), 2, 2);
        assert_eq!(update.current, 3);
    }

    #[test]
    fn every_consecutive_pair_in_a_year_increments() {
        let mut date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        for _ in 0..365 {
            let next = date.succ_opt().unwrap();
            assert_eq!(advance_streak(Some(date), next, 10, 10).current, 11);
            date = next;
        }
    }
}
