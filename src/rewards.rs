//! Badge eligibility bookkeeping.

use std::collections::HashSet;

use crate::models::{Challenge, ConditionType, DailySnapshot, EarnedBadge, MissionLog, SnapshotMission};
use crate::streak::{DayEntry, week_complete};

/// True when every mission in `missions` has a log in `logs`.
///
/// An empty mission list is never "all done".
pub fn all_done(missions: &[SnapshotMission], logs: &[MissionLog]) -> bool {
    if missions.is_empty() {
        return false;
    }
    let completed: HashSet<&str> = logs.iter().map(|l| l.mission_id.as_str()).collect();
    missions.iter().all(|m| completed.contains(m.id.as_str()))
}

/// Counters each challenge condition is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChallengeProgress {
    /// Days on which every mission was completed.
    pub daily: u32,
    /// Fully completed Mon-Fri weeks.
    pub weekly: u32,
    /// Individual mission completions.
    pub total: u32,
}

impl ChallengeProgress {
    pub fn count_for(&self, condition: ConditionType) -> u32 {
        match condition {
            ConditionType::DailyCompletion => self.daily,
            ConditionType::WeeklyCompletion => self.weekly,
            ConditionType::TotalCompletion => self.total,
        }
    }

    /// Progress from stored snapshots, completed weeks and the total log
    /// count.
    pub fn from_history(snapshots: &[DailySnapshot], weeks: &[[DayEntry; 5]], total_logs: usize) -> Self {
        Self {
            daily: snapshots.iter().filter(|s| s.is_complete()).count() as u32,
            weekly: weeks.iter().filter(|w| week_complete(w)).count() as u32,
            total: total_logs as u32,
        }
    }
}

/// Challenges whose condition is met and whose badge has not been earned.
pub fn eligible_challenges<'a>(
    challenges: &'a [Challenge],
    progress: &ChallengeProgress,
    earned: &[EarnedBadge],
) -> Vec<&'a Challenge> {
    let earned_ids: HashSet<&str> = earned.iter().map(|e| e.badge_id.as_str()).collect();
    challenges
        .iter()
        .filter(|c| progress.count_for(c.condition_type) >= c.required_count)
        .filter(|c| !earned_ids.contains(c.badge_id.as_str()))
        .collect()
}

/// Fraction of a challenge completed, clamped to `0.0..=1.0`.
pub fn challenge_fraction(challenge: &Challenge, progress: &ChallengeProgress) -> f64 {
    if challenge.required_count == 0 {
        return 1.0;
    }
    (progress.count_for(challenge.condition_type) as f64 / challenge.required_count as f64).min(1.0)
}
