//! Turn window scheduling
//!
//! A turn is three beats long: beats 1 and 2 accept input, beat 3 is the
//! lock-in grace period and resolution fires when beat 3 ends. Beats get
//! shorter as the match goes on, down to a fixed floor.

use serde::{Deserialize, Serialize};

/// Timing envelope of one turn (unix milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnWindow {
    pub turn_index: u32,
    pub turn_start_ts: u64,
    pub input_close_ts: u64,
    pub lock_in_ts: u64,
    pub beat_duration_ms: u64,
}

impl TurnWindow {
    /// Whether input submitted at `now_ms` still lands in this window
    pub fn accepts_input_at(&self, now_ms: u64) -> bool {
        now_ms < self.input_close_ts
    }
}

/// Beat duration lookup, indexed by turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatSchedule {
    /// Duration per turn index; the last entry repeats forever
    pub durations_ms: Vec<u64>,
    /// Lower bound applied after lookup
    pub floor_ms: u64,
}

impl Default for BeatSchedule {
    fn default() -> Self {
        Self {
            durations_ms: vec![1100, 1050, 1000, 940, 880, 820, 760, 700, 640, 580, 520],
            floor_ms: 420,
        }
    }
}

impl BeatSchedule {
    /// Beat duration for a turn, clamped to the table end and the floor
    pub fn beat_duration(&self, turn_index: u32) -> u64 {
        let idx = (turn_index as usize).min(self.durations_ms.len().saturating_sub(1));
        let value = self.durations_ms.get(idx).copied().unwrap_or(self.floor_ms);
        value.max(self.floor_ms)
    }

    /// Open the window for `turn_index` starting at `now_ms`
    pub fn open(&self, turn_index: u32, now_ms: u64) -> TurnWindow {
        let beat = self.beat_duration(turn_index);
        TurnWindow {
            turn_index,
            turn_start_ts: now_ms,
            input_close_ts: now_ms + beat * 2,
            lock_in_ts: now_ms + beat * 3,
            beat_duration_ms: beat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ordering_holds_for_all_turns() {
        let schedule = BeatSchedule::default();
        for turn in 0..64 {
            let w = schedule.open(turn, 1_700_000_000_000);
            assert!(w.turn_start_ts < w.input_close_ts);
            assert!(w.input_close_ts < w.lock_in_ts);
            assert_eq!(w.input_close_ts - w.turn_start_ts, 2 * w.beat_duration_ms);
            assert_eq!(w.lock_in_ts - w.turn_start_ts, 3 * w.beat_duration_ms);
        }
    }

    #[test]
    fn test_beat_duration_non_increasing_to_floor() {
        let schedule = BeatSchedule::default();
        let mut prev = u64::MAX;
        for turn in 0..100 {
            let d = schedule.beat_duration(turn);
            assert!(d <= prev, "turn {} got longer", turn);
            assert!(d >= schedule.floor_ms);
            prev = d;
        }
        assert_eq!(schedule.beat_duration(0), 1100);
        assert_eq!(schedule.beat_duration(10), 520);
        assert_eq!(schedule.beat_duration(500), 520);
    }

    #[test]
    fn test_floor_applies_over_table() {
        let schedule = BeatSchedule {
            durations_ms: vec![800, 300],
            floor_ms: 420,
        };
        assert_eq!(schedule.beat_duration(0), 800);
        assert_eq!(schedule.beat_duration(1), 420);
        assert_eq!(schedule.beat_duration(7), 420);
    }

    #[test]
    fn test_input_cutoff_is_exclusive() {
        let w = BeatSchedule::default().open(0, 1000);
        assert!(w.accepts_input_at(w.input_close_ts - 1));
        assert!(!w.accepts_input_at(w.input_close_ts));
    }
}
