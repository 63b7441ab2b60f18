//! Duel Server - authoritative engine for timed-beat duels
//!
//! Two fighters commit actions for two beats per turn. When the lock-in beat
//! ends, the server resolves both sides against the judgement table, updates
//! vitals and round score, and either opens the next turn or ends the match.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod store;
pub mod util;
pub mod ws;
