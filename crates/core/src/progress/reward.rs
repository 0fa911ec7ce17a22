use crate::model::RewardLevel;

/// XP needed to reach each reward level; index 0 is level 1.
pub const XP_LEVEL_THRESHOLDS: [u32; 10] = [0, 100, 250, 450, 700, 1000, 1400, 1900, 2500, 3200];

/// Two reward levels make one grade.
pub const LEVELS_PER_GRADE: u32 = 2;

const GRADE_TITLES: [&str; 5] = ["Seedling", "Sprout", "Sapling", "Blossom", "Mighty Oak"];

/// Maps lifetime XP (points) to the reward badge.
#[must_use]
pub fn reward_level(xp: u32) -> RewardLevel {
    let index = XP_LEVEL_THRESHOLDS
        .iter()
        .rposition(|threshold| xp >= *threshold)
        .unwrap_or(0);
    let level = u32::try_from(index).unwrap_or(0) + 1;
    let grade = (level - 1) / LEVELS_PER_GRADE + 1;
    let title = usize::try_from(grade - 1)
        .ok()
        .and_then(|i| GRADE_TITLES.get(i))
        .copied()
        .unwrap_or(GRADE_TITLES[GRADE_TITLES.len() - 1]);

    let level_floor_xp = XP_LEVEL_THRESHOLDS[index];
    let next_level_xp = XP_LEVEL_THRESHOLDS.get(index + 1).copied();
    let progress_percent = match next_level_xp {
        Some(next) => {
            let span = u64::from(next - level_floor_xp);
            let into = u64::from(xp - level_floor_xp);
            u8::try_from(into * 100 / span).unwrap_or(100)
        }
        None => 100,
    };

    RewardLevel {
        level,
        grade,
        title: title.to_string(),
        xp,
        level_floor_xp,
        next_level_xp,
        progress_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_xp_is_level_one_seedling() {
        let reward = reward_level(0);
        assert_eq!(reward.level, 1);
        assert_eq!(reward.grade, 1);
        assert_eq!(reward.title, "Seedling");
        assert_eq!(reward.next_level_xp, Some(100));
        assert_eq!(reward.progress_percent, 0);
    }

    #[test]
    fn mid_level_progress_and_grade() {
        let reward = reward_level(325);
        assert_eq!(reward.level, 3);
        assert_eq!(reward.grade, 2);
        assert_eq!(reward.title, "Sprout");
        assert_eq!(reward.level_floor_xp, 250);
        assert_eq!(reward.next_level_xp, Some(450));
        assert_eq!(reward.progress_percent, 37);
    }

    #[test]
    fn top_level_is_capped() {
        let reward = reward_level(50_000);
        assert_eq!(reward.level, 10);
        assert_eq!(reward.grade, 5);
        assert_eq!(reward.title, "Mighty Oak");
        assert_eq!(reward.next_level_xp, None);
        assert_eq!(reward.progress_percent, 100);
    }

    #[test]
    fn level_never_decreases_with_more_xp() {
        let mut last = 0;
        for xp in (0..4000).step_by(25) {
            let level = reward_level(xp).level;
            assert!(level >= last);
            last = level;
        }
    }
}
