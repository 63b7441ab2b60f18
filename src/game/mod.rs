//! Duel engine: judgement table, turn resolution and the match actors

pub mod action;
pub mod judgement;
pub mod r#match;
pub mod policy;
pub mod resolver;
pub mod rules;
pub mod snapshot;
pub mod vitals;
pub mod window;

pub use action::{Action, Beat, Side, SidePair, Winner};
pub use policy::{CyclicPolicy, OpponentPolicy, SeededPolicy};
pub use r#match::{
    JoinError, MatchController, MatchHandle, MatchRegistry, MatchSetup, MatchStatus, Participant,
    RejectReason,
};
pub use resolver::{resolve_turn, RoundScore, TurnInput};
pub use rules::MatchRules;
pub use vitals::FighterVitals;
pub use window::{BeatSchedule, TurnWindow};
