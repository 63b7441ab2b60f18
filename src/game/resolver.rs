//! Turn resolution - combines both sides' beats into vitals and score changes

use serde::{Deserialize, Serialize};

use super::action::{Action, SidePair, Winner};
use super::judgement::{judge, Outcome};
use super::vitals::{normalize, FighterVitals};

/// Actions one side committed for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnInput {
    pub beat1: Action,
    pub beat2: Action,
}

impl TurnInput {
    pub fn new(beat1: Action, beat2: Action) -> Self {
        Self { beat1, beat2 }
    }

    fn beats(&self) -> [Action; 2] {
        [self.beat1, self.beat2]
    }
}

/// Rounds won by each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundScore {
    pub p1: u32,
    pub p2: u32,
}

impl RoundScore {
    pub fn award(self, winner: Winner) -> Self {
        match winner {
            Winner::P1 => Self { p1: self.p1 + 1, ..self },
            Winner::P2 => Self { p2: self.p2 + 1, ..self },
            Winner::Draw => self,
        }
    }

    /// Side with more rounds, if any
    pub fn leader(&self) -> Winner {
        match self.p1.cmp(&self.p2) {
            std::cmp::Ordering::Greater => Winner::P1,
            std::cmp::Ordering::Less => Winner::P2,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    pub fn best(&self) -> u32 {
        self.p1.max(self.p2)
    }
}

/// Presentation keys for one beat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationKey {
    pub vfx: String,
    pub sfx: String,
}

impl From<&Outcome> for PresentationKey {
    fn from(outcome: &Outcome) -> Self {
        Self {
            vfx: outcome.vfx_key.to_string(),
            sfx: outcome.sfx_key.to_string(),
        }
    }
}

/// Broadcast payload describing a resolved turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEvent {
    pub turn_index: u32,
    /// One entry per beat, in beat order, from side 1's perspective
    pub presentation_keys: Vec<PresentationKey>,
    /// Actions after normalization, as actually resolved
    pub actions: SidePair<TurnInput>,
    /// Health lost this turn, before clamping
    pub damage: SidePair<u32>,
    pub vitals_after: SidePair<FighterVitals>,
    pub summary: String,
    pub round_winner: Winner,
    pub round_score: RoundScore,
}

/// Everything a resolved turn changes
#[derive(Debug, Clone)]
pub struct TurnResolution {
    pub event: ResolvedEvent,
    pub p1_after: FighterVitals,
    pub p2_after: FighterVitals,
    pub score_after: RoundScore,
}

/// Resolve one turn.
///
/// Both beats of a side are normalized against that side's vitals at the
/// start of the turn. The round goes to whoever took strictly less damage,
/// measured before clamping so a knockout does not hide the margin.
pub fn resolve_turn(
    turn_index: u32,
    p1_input: TurnInput,
    p2_input: TurnInput,
    p1_vitals: FighterVitals,
    p2_vitals: FighterVitals,
    score: RoundScore,
) -> TurnResolution {
    let p1_beats = p1_input.beats().map(|a| normalize(a, &p1_vitals));
    let p2_beats = p2_input.beats().map(|a| normalize(a, &p2_vitals));

    let p1_outcomes = [judge(p1_beats[0], p2_beats[0]), judge(p1_beats[1], p2_beats[1])];
    let p2_outcomes = [judge(p2_beats[0], p1_beats[0]), judge(p2_beats[1], p1_beats[1])];

    let (p1_dh, p1_de) = sum_deltas(&p1_outcomes);
    let (p2_dh, p2_de) = sum_deltas(&p2_outcomes);

    let p1_after = p1_vitals.apply(p1_dh, p1_de);
    let p2_after = p2_vitals.apply(p2_dh, p2_de);

    let p1_damage = damage_taken(p1_dh);
    let p2_damage = damage_taken(p2_dh);
    let round_winner = match p1_damage.cmp(&p2_damage) {
        std::cmp::Ordering::Less => Winner::P1,
        std::cmp::Ordering::Greater => Winner::P2,
        std::cmp::Ordering::Equal => Winner::Draw,
    };
    let score_after = score.award(round_winner);

    let summary = p1_outcomes
        .iter()
        .map(|o| o.summary)
        .collect::<Vec<_>>()
        .join(" / ");

    let event = ResolvedEvent {
        turn_index,
        presentation_keys: p1_outcomes.iter().map(PresentationKey::from).collect(),
        actions: SidePair::new(
            TurnInput::new(p1_beats[0], p1_beats[1]),
            TurnInput::new(p2_beats[0], p2_beats[1]),
        ),
        damage: SidePair::new(p1_damage, p2_damage),
        vitals_after: SidePair::new(p1_after, p2_after),
        summary,
        round_winner,
        round_score: score_after,
    };

    TurnResolution {
        event,
        p1_after,
        p2_after,
        score_after,
    }
}

fn sum_deltas(outcomes: &[Outcome; 2]) -> (i32, i32) {
    outcomes.iter().fold((0, 0), |(dh, de), o| {
        (dh + o.delta_health, de + o.delta_energy)
    })
}

fn damage_taken(delta_health: i32) -> u32 {
    delta_health.min(0).unsigned_abs()
}
