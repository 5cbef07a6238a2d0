use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::date::DayKey;

/// Consecutive completed days ending at `today`, or at yesterday when today
/// has no check-in yet. Any older gap resets the streak to zero.
pub fn current_streak(completed: &HashSet<DayKey>, today: DayKey) -> u32 {
    let start = if completed.contains(&today) {
        today
    } else {
        match today.pred() {
            Some(yesterday) if completed.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut count = 0;
    let mut cursor = Some(start);
    while let Some(day) = cursor {
        if !completed.contains(&day) {
            break;
        }
        count += 1;
        cursor = day.pred();
    }
    count
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub count: u32,
    pub today_done: bool,
}

impl StreakState {
    pub fn evaluate(completed: &HashSet<DayKey>, today: DayKey) -> Self {
        Self {
            count: current_streak(completed, today),
            today_done: completed.contains(&today),
        }
    }
}

/// History-wide figures shown next to the live streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
    pub total_days: u32,
    pub last_day: Option<DayKey>,
}

impl StreakSummary {
    pub fn evaluate(completed: &HashSet<DayKey>, today: DayKey) -> Self {
        let mut days: Vec<DayKey> = completed.iter().copied().collect();
        days.sort();

        let mut longest = 0u32;
        let mut run = 0u32;
        let mut previous: Option<DayKey> = None;
        for day in &days {
            run = match previous {
                Some(prev) if prev.succ() == Some(*day) => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            previous = Some(*day);
        }

        Self {
            current: current_streak(completed, today),
            longest,
            total_days: days.len() as u32,
            last_day: days.last().copied(),
        }
    }
}
