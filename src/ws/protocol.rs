//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::action::{Action, Beat, Side, SidePair, Winner};
use crate::game::r#match::RejectReason;
use crate::game::resolver::{ResolvedEvent, RoundScore};
use crate::game::rules::MatchRules;
use crate::game::snapshot::MatchSnapshot;
use crate::game::vitals::FighterVitals;

/// Who fills side 2 of a new match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentKind {
    /// Scripted CPU opponent
    #[default]
    Cpu,
    /// Another connection joins with `join_match`
    Human,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start a new match as side 1
    StartMatch {
        #[serde(default)]
        opponent: OpponentKind,
    },

    /// Take side 2 of an open match
    JoinMatch { match_id: Uuid },

    /// Submit the action for one beat of the current turn
    SubmitInput {
        match_id: Uuid,
        turn_index: u32,
        beat: Beat,
        action: Action,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Stop following the current match
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { user_id: Uuid, server_time: u64 },

    /// A match began; sent once per match
    MatchStarted {
        match_id: Uuid,
        rules: MatchRules,
    },

    /// Confirmation of which side this connection plays
    SideAssigned { match_id: Uuid, side: Side },

    /// Input window for a turn opened
    TurnWindow {
        turn_index: u32,
        turn_start_ts: u64,
        input_close_ts: u64,
        lock_in_ts: u64,
        beat_duration_ms: u64,
        round_score: RoundScore,
    },

    /// An input was locked into its beat slot
    InputAccepted {
        beat: Beat,
        action: Action,
        side: Side,
    },

    /// An input was refused (sent to the submitter only)
    InputRejected {
        turn_index: u32,
        beat: Beat,
        reason: RejectReason,
    },

    /// Turn resolution
    Resolved(ResolvedEvent),

    /// Match has ended
    MatchEnded {
        winner: Winner,
        final_vitals: SidePair<FighterVitals>,
        final_score: RoundScore,
    },

    /// Current match state, sent on join
    MatchSnapshot(MatchSnapshot),

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_input() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"submit_input","match_id":"{}","turn_index":3,"beat":2,"action":"GUARD"}}"#,
            id
        );
        match serde_json::from_str::<ClientMsg>(&raw).unwrap() {
            ClientMsg::SubmitInput {
                match_id,
                turn_index,
                beat,
                action,
            } => {
                assert_eq!(match_id, id);
                assert_eq!(turn_index, 3);
                assert_eq!(beat, Beat::Second);
                assert_eq!(action, Action::Block);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_reject_malformed_submit() {
        let id = Uuid::new_v4();
        let bad_beat = format!(
            r#"{{"type":"submit_input","match_id":"{}","turn_index":0,"beat":3,"action":"ATTACK"}}"#,
            id
        );
        assert!(serde_json::from_str::<ClientMsg>(&bad_beat).is_err());

        let negative_turn = format!(
            r#"{{"type":"submit_input","match_id":"{}","turn_index":-1,"beat":1,"action":"ATTACK"}}"#,
            id
        );
        assert!(serde_json::from_str::<ClientMsg>(&negative_turn).is_err());

        let unknown_action = format!(
            r#"{{"type":"submit_input","match_id":"{}","turn_index":0,"beat":1,"action":"FLY"}}"#,
            id
        );
        assert!(serde_json::from_str::<ClientMsg>(&unknown_action).is_err());
    }

    #[test]
    fn test_start_match_defaults_to_cpu() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"start_match"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::StartMatch {
                opponent: OpponentKind::Cpu
            }
        ));
    }

    #[test]
    fn test_server_msg_tags() {
        let msg = ServerMsg::InputAccepted {
            beat: Beat::First,
            action: Action::Attack,
            side: Side::P1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "input_accepted");
        assert_eq!(json["beat"], 1);
        assert_eq!(json["action"], "ATTACK");
        assert_eq!(json["side"], "p1");
    }
}
