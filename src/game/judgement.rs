//! Judgement table - what each ordered pair of actions does to a fighter

use super::action::Action;

/// Effect of one beat on the fighter performing `self_action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Health change for self (never positive)
    pub delta_health: i32,
    /// Energy change for self
    pub delta_energy: i32,
    /// Visual effect key for the client
    pub vfx_key: &'static str,
    /// Sound effect key for the client
    pub sfx_key: &'static str,
    /// Human-readable description
    pub summary: &'static str,
}

const fn outcome(
    delta_health: i32,
    delta_energy: i32,
    vfx_key: &'static str,
    sfx_key: &'static str,
    summary: &'static str,
) -> Outcome {
    Outcome {
        delta_health,
        delta_energy,
        vfx_key,
        sfx_key,
        summary,
    }
}

/// Look up the outcome for `self_action` performed against `opponent_action`.
///
/// `(a, b)` and `(b, a)` are separate entries: a guard nullifies an attack for
/// the guarder only, it says nothing about what happens to the attacker.
pub fn judge(self_action: Action, opponent_action: Action) -> Outcome {
    use Action::*;

    match (self_action, opponent_action) {
        (None, None) => outcome(0, 0, "idle", "none", "Both hold still"),
        (None, Charge) => outcome(0, 0, "idle", "charge", "Opponent gathers energy"),
        (None, Block) => outcome(0, 0, "idle", "none", "Standoff"),
        (None, Attack) => outcome(-10, 0, "hit", "hit", "Caught off guard"),
        (None, Beam) => outcome(-25, 0, "beam-hit", "beam", "Struck by a beam"),
        (None, Teleport) => outcome(0, 0, "vanish", "teleport", "Opponent vanishes"),

        (Charge, None) => outcome(0, 2, "charge", "charge", "Charging safely"),
        (Charge, Charge) => outcome(0, 3, "dual-charge", "charge", "Both charge"),
        (Charge, Block) => outcome(0, 2, "charge", "charge", "Charging safely"),
        (Charge, Attack) => outcome(-14, -2, "punished", "hit-heavy", "Charge interrupted"),
        (Charge, Beam) => outcome(-30, 0, "beam-hit", "beam", "Beam lands mid-charge"),
        (Charge, Teleport) => outcome(0, 2, "charge", "charge", "Charging safely"),

        (Block, None) => outcome(0, 1, "guard", "none", "Guard held"),
        (Block, Charge) => outcome(0, 0, "read", "charge", "Opponent gathers energy"),
        (Block, Block) => outcome(0, 1, "idle", "none", "Standoff"),
        (Block, Attack) => outcome(0, 1, "parry", "guard", "Guard succeeds"),
        (Block, Beam) => outcome(-12, 0, "guard-break", "beam", "Beam pierces the guard"),
        (Block, Teleport) => outcome(0, 1, "guard", "teleport", "Guard held"),

        (Attack, None) => outcome(0, 0, "hit", "hit", "Clean hit"),
        (Attack, Charge) => outcome(0, 0, "hit", "hit-heavy", "Hit a charging opponent"),
        (Attack, Block) => outcome(-2, -1, "guard", "guard", "Attack blocked"),
        (Attack, Attack) => outcome(-8, -1, "clash", "impact", "Both clash"),
        (Attack, Beam) => outcome(-25, 0, "beam-hit", "beam", "Overpowered by a beam"),
        (Attack, Teleport) => outcome(0, 0, "whiff", "swing", "Attack whiffs"),

        (Beam, None) => outcome(0, -2, "beam", "beam", "Beam connects"),
        (Beam, Charge) => outcome(0, -2, "beam", "beam", "Beam connects"),
        (Beam, Block) => outcome(0, -2, "beam", "beam", "Beam breaks the guard"),
        (Beam, Attack) => outcome(0, -2, "beam", "beam", "Beam overpowers the attack"),
        (Beam, Beam) => outcome(0, -2, "beam-clash", "beam", "Beams cancel out"),
        (Beam, Teleport) => outcome(0, -2, "beam-miss", "beam", "Beam dodged"),

        (Teleport, None) => outcome(0, -1, "teleport", "teleport", "Repositioned"),
        (Teleport, Charge) => outcome(0, -1, "teleport", "teleport", "Repositioned"),
        (Teleport, Block) => outcome(0, -1, "teleport", "teleport", "Repositioned"),
        (Teleport, Attack) => outcome(0, -1, "dodge", "teleport", "Dodged the attack"),
        (Teleport, Beam) => outcome(0, -1, "dodge", "teleport", "Dodged the beam"),
        (Teleport, Teleport) => outcome(0, -1, "teleport", "teleport", "Both vanish"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pair_is_defined_and_deterministic() {
        for a in Action::ALL {
            for b in Action::ALL {
                let first = judge(a, b);
                let second = judge(a, b);
                assert_eq!(first, second, "{:?} vs {:?}", a, b);
                assert!(first.delta_health <= 0, "{:?} vs {:?} heals", a, b);
                assert!(!first.summary.is_empty());
                assert!(!first.vfx_key.is_empty());
            }
        }
    }

    #[test]
    fn test_guard_nullifies_attack_for_guarder_only() {
        assert_eq!(judge(Action::Block, Action::Attack).delta_health, 0);
        assert_eq!(judge(Action::None, Action::Attack).delta_health, -10);
    }

    #[test]
    fn test_blocked_attack_recoils_on_attacker() {
        let recoil = judge(Action::Attack, Action::Block);
        assert_eq!(recoil.delta_health, -2);
        assert_eq!(recoil.delta_energy, -1);
        assert_eq!(recoil.vfx_key, "guard");
    }

    #[test]
    fn test_attacking_a_charger_costs_nothing() {
        let hit = judge(Action::Attack, Action::Charge);
        assert_eq!(hit.delta_health, 0);
        assert_eq!(judge(Action::Charge, Action::Attack).delta_health, -14);
    }

    #[test]
    fn test_costed_actions_spend_their_cost() {
        for opp in Action::ALL {
            assert_eq!(
                judge(Action::Beam, opp).delta_energy,
                -(Action::Beam.energy_cost() as i32)
            );
            assert_eq!(
                judge(Action::Teleport, opp).delta_energy,
                -(Action::Teleport.energy_cost() as i32)
            );
        }
    }

    #[test]
    fn test_teleport_evades_all_damage() {
        for opp in Action::ALL {
            assert_eq!(judge(Action::Teleport, opp).delta_health, 0);
        }
    }

    #[test]
    fn test_beam_outranks_attack() {
        assert!(judge(Action::Attack, Action::Beam).delta_health < 0);
        assert_eq!(judge(Action::Beam, Action::Attack).delta_health, 0);
    }
}
