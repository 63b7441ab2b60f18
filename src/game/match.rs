//! Match lifecycle: one actor task per match, and the registry that owns them
//!
//! All state of a match lives inside its actor. Callers talk to it through a
//! [`MatchHandle`] (commands in) and a broadcast receiver (events out), so two
//! operations on the same match can never interleave.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::sleep_until;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{EventKind, EventSink, MatchEventRecord};
use crate::util::time::MatchClock;
use crate::ws::protocol::ServerMsg;

use super::action::{Action, Beat, Side, SidePair, Winner};
use super::policy::OpponentPolicy;
use super::resolver::{resolve_turn, RoundScore, TurnInput};
use super::rules::MatchRules;
use super::snapshot::{MatchSnapshot, SeatState};
use super::vitals::FighterVitals;
use super::window::TurnWindow;

const COMMAND_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Running,
    Ended,
}

/// Why an input was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("input is for a turn that is not current")]
    StaleTurn,

    #[error("input window has closed")]
    WindowClosed,

    #[error("beat already has an action")]
    SlotFilled,

    #[error("match is not running")]
    MatchEnded,

    #[error("not a participant of this match")]
    NotParticipant,
}

/// Why a join was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("match already has two players")]
    MatchFull,

    #[error("match is against a CPU opponent")]
    CpuOpponent,

    #[error("match is not running")]
    MatchEnded,
}

/// Who controls a side
#[derive(Clone)]
pub enum Participant {
    /// Interactive player, `None` until someone takes the seat
    Human(Option<Uuid>),
    /// Scripted opponent
    Cpu(Arc<dyn OpponentPolicy>),
}

impl Participant {
    fn is_player(&self, player: Uuid) -> bool {
        matches!(self, Participant::Human(Some(id)) if *id == player)
    }

    fn seat(&self) -> SeatState {
        match self {
            Participant::Human(Some(_)) => SeatState::Human,
            Participant::Human(None) => SeatState::Open,
            Participant::Cpu(_) => SeatState::Cpu,
        }
    }
}

/// Parameters for a new match
pub struct MatchSetup {
    /// Player on side 1
    pub owner: Uuid,
    /// Side 2
    pub opponent: Participant,
}

impl MatchSetup {
    pub fn vs_cpu(owner: Uuid, policy: Arc<dyn OpponentPolicy>) -> Self {
        Self {
            owner,
            opponent: Participant::Cpu(policy),
        }
    }

    pub fn vs_human(owner: Uuid) -> Self {
        Self {
            owner,
            opponent: Participant::Human(None),
        }
    }
}

/// Beat slots of one side for the current turn; first write wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingInputs {
    slots: [Option<Action>; 2],
}

impl PendingInputs {
    pub fn fill(&mut self, beat: Beat, action: Action) -> Result<(), RejectReason> {
        let slot = &mut self.slots[beat.index()];
        if slot.is_some() {
            return Err(RejectReason::SlotFilled);
        }
        *slot = Some(action);
        Ok(())
    }

    pub fn get(&self, beat: Beat) -> Option<Action> {
        self.slots[beat.index()]
    }

    pub fn filled_count(&self) -> u8 {
        self.slots.iter().filter(|s| s.is_some()).count() as u8
    }

    /// Committed actions, empty beats as the neutral action
    pub fn to_turn_input(&self) -> TurnInput {
        TurnInput::new(
            self.slots[0].unwrap_or_default(),
            self.slots[1].unwrap_or_default(),
        )
    }
}

/// Match state (owned by the match task)
#[derive(Debug, Clone)]
pub struct MatchState {
    pub id: Uuid,
    pub turn_index: u32,
    pub vitals: SidePair<FighterVitals>,
    pub score: RoundScore,
    pub pending: SidePair<PendingInputs>,
    pub window: TurnWindow,
    pub status: MatchStatus,
}

impl MatchState {
    pub fn new(id: Uuid, rules: &MatchRules, now_ms: u64) -> Self {
        Self {
            id,
            turn_index: 0,
            vitals: SidePair::new(rules.baseline, rules.baseline),
            score: RoundScore::default(),
            pending: SidePair::default(),
            window: rules.beat_schedule.open(0, now_ms),
            status: MatchStatus::Running,
        }
    }
}

/// Commands accepted by a match actor
pub enum MatchCommand {
    SubmitInput {
        player: Uuid,
        turn_index: u32,
        beat: Beat,
        action: Action,
        reply: oneshot::Sender<Result<Side, RejectReason>>,
    },
    Join {
        player: Uuid,
        reply: oneshot::Sender<Result<Side, JoinError>>,
    },
    Snapshot {
        reply: oneshot::Sender<MatchSnapshot>,
    },
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    command_tx: mpsc::Sender<MatchCommand>,
    event_tx: broadcast::Sender<ServerMsg>,
    clock: MatchClock,
    last_activity_ms: Arc<AtomicU64>,
    abort: Option<Arc<AbortHandle>>,
}

impl MatchHandle {
    /// Receive every event the match broadcasts from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.event_tx.subscribe()
    }

    /// Submit the action for one beat; returns the side it was credited to
    pub async fn submit_input(
        &self,
        player: Uuid,
        turn_index: u32,
        beat: Beat,
        action: Action,
    ) -> Result<Side, RejectReason> {
        let (reply, rx) = oneshot::channel();
        let cmd = MatchCommand::SubmitInput {
            player,
            turn_index,
            beat,
            action,
            reply,
        };
        if self.command_tx.send(cmd).await.is_err() {
            return Err(RejectReason::MatchEnded);
        }
        rx.await.unwrap_or(Err(RejectReason::MatchEnded))
    }

    /// Take the open seat of a human-vs-human match
    pub async fn join(&self, player: Uuid) -> Result<Side, JoinError> {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(MatchCommand::Join { player, reply })
            .await
            .is_err()
        {
            return Err(JoinError::MatchEnded);
        }
        rx.await.unwrap_or(Err(JoinError::MatchEnded))
    }

    /// Current state, or `None` once the actor has stopped
    pub async fn snapshot(&self) -> Option<MatchSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(MatchCommand::Snapshot { reply })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Time since the last join or accepted input
    pub fn idle_for(&self) -> Duration {
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.clock.now_ms().saturating_sub(last))
    }

    fn abort(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
    rules: Arc<MatchRules>,
    sink: Arc<dyn EventSink>,
}

impl MatchRegistry {
    pub fn new(rules: MatchRules, sink: Arc<dyn EventSink>) -> Self {
        Self {
            matches: DashMap::new(),
            rules: Arc::new(rules),
            sink,
        }
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Create a match and spawn its actor.
    ///
    /// The returned receiver is subscribed before the actor runs, so it sees
    /// `match_started` and the first window.
    pub fn create(self: &Arc<Self>, setup: MatchSetup) -> (Uuid, broadcast::Receiver<ServerMsg>) {
        let match_id = Uuid::new_v4();
        let (controller, mut handle) =
            MatchController::new(match_id, setup, self.rules.clone(), self.sink.clone());
        let events = handle.subscribe();

        // The actor cannot finish before its first lock-in, so the entry is
        // always in place by the time it removes itself.
        let registry = Arc::clone(self);
        let task = tokio::spawn(async move {
            controller.run().await;
            registry.matches.remove(&match_id);
            debug!(match_id = %match_id, "Match removed from registry");
        });
        handle.abort = Some(Arc::new(task.abort_handle()));
        self.matches.insert(match_id, handle);

        info!(match_id = %match_id, active = self.matches.len(), "Created new match");
        (match_id, events)
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    /// Drop a match and cancel its actor; unknown ids are ignored
    pub fn discard(&self, id: &Uuid) -> bool {
        match self.matches.remove(id) {
            Some((_, handle)) => {
                handle.abort();
                info!(match_id = %id, "Match discarded");
                true
            }
            None => false,
        }
    }

    /// Discard matches nobody has touched for `max_idle`
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let stale: Vec<Uuid> = self
            .matches
            .iter()
            .filter(|m| m.value().idle_for() > max_idle)
            .map(|m| *m.key())
            .collect();

        for id in &stale {
            warn!(match_id = %id, "Evicting idle match");
            self.discard(id);
        }
        stale.len()
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

/// The authoritative match actor
pub struct MatchController {
    state: MatchState,
    rules: Arc<MatchRules>,
    owner: Uuid,
    opponent: Participant,
    clock: MatchClock,
    command_rx: mpsc::Receiver<MatchCommand>,
    event_tx: broadcast::Sender<ServerMsg>,
    sink: Arc<dyn EventSink>,
    last_activity_ms: Arc<AtomicU64>,
}

impl MatchController {
    pub fn new(
        id: Uuid,
        setup: MatchSetup,
        rules: Arc<MatchRules>,
        sink: Arc<dyn EventSink>,
    ) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let clock = MatchClock::start();
        let last_activity_ms = Arc::new(AtomicU64::new(clock.now_ms()));

        let handle = MatchHandle {
            id,
            command_tx,
            event_tx: event_tx.clone(),
            clock,
            last_activity_ms: last_activity_ms.clone(),
            abort: None,
        };

        let controller = Self {
            state: MatchState::new(id, &rules, clock.now_ms()),
            rules,
            owner: setup.owner,
            opponent: setup.opponent,
            clock,
            command_rx,
            event_tx,
            sink,
            last_activity_ms,
        };

        (controller, handle)
    }

    /// Drive the match until it ends or every handle is gone
    pub async fn run(mut self) {
        self.start();

        while self.state.status == MatchStatus::Running {
            let turn = self.state.window.turn_index;
            let deadline = self.clock.instant_at(self.state.window.lock_in_ts);

            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        info!(match_id = %self.state.id, "All handles dropped, abandoning match");
                        break;
                    }
                },
                _ = sleep_until(deadline) => self.on_lock_in(turn),
            }
        }
    }

    fn start(&mut self) {
        info!(
            match_id = %self.state.id,
            owner = %self.owner,
            opponent = ?self.opponent.seat(),
            "Match started"
        );
        self.broadcast(ServerMsg::MatchStarted {
            match_id: self.state.id,
            rules: (*self.rules).clone(),
        });
        self.broadcast_window();
    }

    fn handle_command(&mut self, cmd: MatchCommand) {
        match cmd {
            MatchCommand::SubmitInput {
                player,
                turn_index,
                beat,
                action,
                reply,
            } => {
                let result = self.handle_input(player, turn_index, beat, action);
                if let Err(reason) = result {
                    debug!(
                        match_id = %self.state.id,
                        player = %player,
                        turn = turn_index,
                        reason = %reason,
                        "Input rejected"
                    );
                }
                let _ = reply.send(result);
            }
            MatchCommand::Join { player, reply } => {
                let _ = reply.send(self.handle_join(player));
            }
            MatchCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn side_of(&self, player: Uuid) -> Option<Side> {
        if player == self.owner {
            Some(Side::P1)
        } else if self.opponent.is_player(player) {
            Some(Side::P2)
        } else {
            None
        }
    }

    /// Validate and store one beat of input
    fn handle_input(
        &mut self,
        player: Uuid,
        turn_index: u32,
        beat: Beat,
        action: Action,
    ) -> Result<Side, RejectReason> {
        if self.state.status != MatchStatus::Running {
            return Err(RejectReason::MatchEnded);
        }
        let side = self.side_of(player).ok_or(RejectReason::NotParticipant)?;
        if turn_index != self.state.turn_index {
            return Err(RejectReason::StaleTurn);
        }
        if !self.state.window.accepts_input_at(self.clock.now_ms()) {
            return Err(RejectReason::WindowClosed);
        }
        self.state.pending.get_mut(side).fill(beat, action)?;
        self.touch();

        let accepted = ServerMsg::InputAccepted { beat, action, side };
        self.persist(EventKind::Input, &accepted);
        self.broadcast(accepted);

        Ok(side)
    }

    fn handle_join(&mut self, player: Uuid) -> Result<Side, JoinError> {
        if player == self.owner {
            return Ok(Side::P1);
        }
        if self.state.status != MatchStatus::Running {
            return Err(JoinError::MatchEnded);
        }

        match &mut self.opponent {
            Participant::Cpu(_) => Err(JoinError::CpuOpponent),
            Participant::Human(Some(id)) if *id == player => Ok(Side::P2),
            Participant::Human(Some(_)) => Err(JoinError::MatchFull),
            Participant::Human(seat) => {
                *seat = Some(player);
                self.touch();
                info!(match_id = %self.state.id, player = %player, "Player joined as side 2");
                Ok(Side::P2)
            }
        }
    }

    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot::capture(&self.state, SidePair::new(SeatState::Human, self.opponent.seat()))
    }

    /// Committed actions of one side for the turn being resolved
    fn turn_input(&self, side: Side) -> TurnInput {
        match (side, &self.opponent) {
            (Side::P2, Participant::Cpu(policy)) => {
                let [beat1, beat2] = policy.beats_for(self.state.turn_index);
                TurnInput::new(beat1, beat2)
            }
            _ => self.state.pending.get(side).to_turn_input(),
        }
    }

    /// Lock-in timer fired for `turn`
    fn on_lock_in(&mut self, turn: u32) {
        if self.state.status != MatchStatus::Running || turn != self.state.turn_index {
            warn!(
                match_id = %self.state.id,
                timer_turn = turn,
                current_turn = self.state.turn_index,
                "Ignoring stale lock-in timer"
            );
            return;
        }

        let resolution = resolve_turn(
            turn,
            self.turn_input(Side::P1),
            self.turn_input(Side::P2),
            self.state.vitals.p1,
            self.state.vitals.p2,
            self.state.score,
        );

        self.state.vitals = SidePair::new(resolution.p1_after, resolution.p2_after);
        self.state.score = resolution.score_after;

        info!(
            match_id = %self.state.id,
            turn,
            round_winner = ?resolution.event.round_winner,
            p1_health = resolution.p1_after.health,
            p2_health = resolution.p2_after.health,
            "Turn resolved"
        );

        let event = ServerMsg::Resolved(resolution.event);
        self.persist(EventKind::Resolved, &event);
        self.broadcast(event);

        match self.termination() {
            Some(winner) => self.finish(winner),
            None => self.advance(),
        }
    }

    /// Winner if the match is over after the current turn
    fn termination(&self) -> Option<Winner> {
        let vitals = &self.state.vitals;
        let knocked_out = vitals.p1.is_knocked_out() || vitals.p2.is_knocked_out();
        let threshold_reached = self.state.score.best() >= self.rules.win_threshold;
        let out_of_turns = self.state.turn_index + 1 >= self.rules.max_turns;

        if knocked_out || threshold_reached || out_of_turns {
            Some(self.state.score.leader())
        } else {
            None
        }
    }

    fn finish(&mut self, winner: Winner) {
        self.state.status = MatchStatus::Ended;
        info!(
            match_id = %self.state.id,
            turn = self.state.turn_index,
            winner = ?winner,
            p1_rounds = self.state.score.p1,
            p2_rounds = self.state.score.p2,
            "Match ended"
        );
        self.broadcast(ServerMsg::MatchEnded {
            winner,
            final_vitals: self.state.vitals,
            final_score: self.state.score,
        });
    }

    fn advance(&mut self) {
        self.state.turn_index += 1;
        self.state.pending = SidePair::default();
        self.state.window = self
            .rules
            .beat_schedule
            .open(self.state.turn_index, self.clock.now_ms());
        self.broadcast_window();
    }

    fn broadcast_window(&self) {
        let w = self.state.window;
        self.broadcast(ServerMsg::TurnWindow {
            turn_index: w.turn_index,
            turn_start_ts: w.turn_start_ts,
            input_close_ts: w.input_close_ts,
            lock_in_ts: w.lock_in_ts,
            beat_duration_ms: w.beat_duration_ms,
            round_score: self.state.score,
        });
    }

    /// Send to observers; nobody listening is not an error
    fn broadcast(&self, msg: ServerMsg) {
        if self.event_tx.send(msg).is_err() {
            debug!(match_id = %self.state.id, "No subscribers for match event");
        }
    }

    fn persist(&self, kind: EventKind, msg: &ServerMsg) {
        self.sink.record(MatchEventRecord::new(
            self.state.id,
            self.state.turn_index,
            kind,
            msg,
        ));
    }

    fn touch(&self) {
        self.last_activity_ms
            .store(self.clock.now_ms(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_input_per_beat_wins() {
        let mut pending = PendingInputs::default();
        assert_eq!(pending.fill(Beat::First, Action::Attack), Ok(()));
        assert_eq!(
            pending.fill(Beat::First, Action::Beam),
            Err(RejectReason::SlotFilled)
        );
        assert_eq!(pending.get(Beat::First), Some(Action::Attack));
        assert_eq!(pending.filled_count(), 1);
    }

    #[test]
    fn test_empty_beats_default_to_none() {
        let mut pending = PendingInputs::default();
        pending.fill(Beat::Second, Action::Block).unwrap();
        assert_eq!(
            pending.to_turn_input(),
            TurnInput::new(Action::None, Action::Block)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_handle_can_always_cancel_its_actor() {
        let registry = Arc::new(MatchRegistry::new(
            MatchRules::default(),
            Arc::new(crate::store::NullSink),
        ));
        let (match_id, mut events) = registry.create(MatchSetup::vs_human(Uuid::new_v4()));
        assert!(registry.get(&match_id).unwrap().abort.is_some());

        // Discarded before the actor was ever polled: it must never run
        assert!(registry.discard(&match_id));
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(registry.active_matches(), 0);
    }

    #[test]
    fn test_reject_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&RejectReason::WindowClosed).unwrap(),
            "\"window_closed\""
        );
        assert_eq!(
            serde_json::to_string(&RejectReason::SlotFilled).unwrap(),
            "\"slot_filled\""
        );
    }
}
