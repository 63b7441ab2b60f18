//! Match rules shared by every match the server runs

use serde::{Deserialize, Serialize};

use super::vitals::FighterVitals;
use super::window::BeatSchedule;

/// Tunables for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Vitals both fighters start with
    pub baseline: FighterVitals,
    /// Rounds needed to win the match
    pub win_threshold: u32,
    /// Turns played at most
    pub max_turns: u32,
    pub beat_schedule: BeatSchedule,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            baseline: FighterVitals::new(100, 0),
            win_threshold: 3,
            max_turns: 10,
            beat_schedule: BeatSchedule::default(),
        }
    }
}

impl MatchRules {
    /// Single-exchange variant: one turn, first round decides
    pub fn sudden_death() -> Self {
        Self {
            win_threshold: 1,
            max_turns: 1,
            ..Self::default()
        }
    }

    /// Check invariants the match loop relies on
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.baseline.health == 0 {
            return Err(RulesError::ZeroHealth);
        }
        if self.win_threshold == 0 {
            return Err(RulesError::ZeroWinThreshold);
        }
        if self.max_turns == 0 {
            return Err(RulesError::ZeroMaxTurns);
        }

        let schedule = &self.beat_schedule;
        if schedule.floor_ms == 0 {
            return Err(RulesError::ZeroBeatFloor);
        }
        if schedule.durations_ms.is_empty() {
            return Err(RulesError::EmptyBeatTable);
        }
        if let Some(turn) = schedule.durations_ms.iter().position(|&d| d == 0) {
            return Err(RulesError::ZeroBeatDuration(turn));
        }
        if let Some(turn) = schedule
            .durations_ms
            .windows(2)
            .position(|pair| pair[1] > pair[0])
        {
            return Err(RulesError::IncreasingBeatDuration(turn + 1));
        }

        Ok(())
    }
}

/// Rules that would break the match loop
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("baseline health must be positive")]
    ZeroHealth,

    #[error("win threshold must be at least 1")]
    ZeroWinThreshold,

    #[error("max turns must be at least 1")]
    ZeroMaxTurns,

    #[error("beat duration floor must be positive")]
    ZeroBeatFloor,

    #[error("beat duration table is empty")]
    EmptyBeatTable,

    #[error("beat duration for turn {0} is zero")]
    ZeroBeatDuration(usize),

    #[error("beat duration for turn {0} is longer than the previous turn")]
    IncreasingBeatDuration(usize),
}
