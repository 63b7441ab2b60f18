//! Fighter vitals and action normalization

use serde::{Deserialize, Serialize};

use super::action::Action;

/// Health and energy of one fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterVitals {
    pub health: u32,
    pub energy: u32,
}

impl FighterVitals {
    pub fn new(health: u32, energy: u32) -> Self {
        Self { health, energy }
    }

    /// Apply summed deltas, clamping both counters at zero
    pub fn apply(self, delta_health: i32, delta_energy: i32) -> Self {
        Self {
            health: clamp_add(self.health, delta_health),
            energy: clamp_add(self.energy, delta_energy),
        }
    }

    pub fn is_knocked_out(&self) -> bool {
        self.health == 0
    }

    pub fn can_afford(&self, action: Action) -> bool {
        self.energy >= action.energy_cost()
    }
}

fn clamp_add(value: u32, delta: i32) -> u32 {
    let next = i64::from(value) + i64::from(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}

/// Downgrade an action the fighter cannot afford to the neutral action
pub fn normalize(requested: Action, vitals: &FighterVitals) -> Action {
    if vitals.can_afford(requested) {
        requested
    } else {
        Action::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_clamps_at_zero() {
        let v = FighterVitals::new(5, 1).apply(-30, -4);
        assert_eq!(v, FighterVitals::new(0, 0));

        let dead = FighterVitals::new(0, 0).apply(-10, -2);
        assert_eq!(dead.health, 0);
        assert_eq!(dead.energy, 0);
        assert!(dead.is_knocked_out());
    }

    #[test]
    fn test_apply_adds_energy() {
        let v = FighterVitals::new(100, 0).apply(0, 3);
        assert_eq!(v, FighterVitals::new(100, 3));
    }

    #[test]
    fn test_normalize_downgrades_unaffordable() {
        let broke = FighterVitals::new(100, 1);
        assert_eq!(normalize(Action::Beam, &broke), Action::None);
        assert_eq!(normalize(Action::Teleport, &broke), Action::Teleport);
        assert_eq!(normalize(Action::Attack, &FighterVitals::new(100, 0)), Action::Attack);
        assert_eq!(normalize(Action::Teleport, &FighterVitals::new(100, 0)), Action::None);
        assert_eq!(normalize(Action::Beam, &FighterVitals::new(100, 2)), Action::Beam);
    }
}
