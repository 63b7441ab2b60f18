//! Point-in-time view of a match for late joiners and status queries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::SidePair;
use super::r#match::{MatchState, MatchStatus};
use super::resolver::RoundScore;
use super::vitals::FighterVitals;
use super::window::TurnWindow;

/// How a side is controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatState {
    /// A connected human holds the seat
    Human,
    /// Reserved for a human who has not joined yet
    Open,
    /// Scripted opponent
    Cpu,
}

/// Copy of the authoritative match state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: Uuid,
    pub status: MatchStatus,
    pub turn_index: u32,
    pub vitals: SidePair<FighterVitals>,
    pub round_score: RoundScore,
    pub window: TurnWindow,
    pub seats: SidePair<SeatState>,
    /// Beats already filled this turn, per side
    pub filled_beats: SidePair<u8>,
}

impl MatchSnapshot {
    pub fn capture(state: &MatchState, seats: SidePair<SeatState>) -> Self {
        Self {
            match_id: state.id,
            status: state.status,
            turn_index: state.turn_index,
            vitals: state.vitals,
            round_score: state.score,
            window: state.window,
            seats,
            filled_beats: SidePair::new(
                state.pending.p1.filled_count(),
                state.pending.p2.filled_count(),
            ),
        }
    }
}
