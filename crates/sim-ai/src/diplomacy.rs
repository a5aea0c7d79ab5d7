//! War and peace decisions driven by reputation.

use serde::Serialize;
use sim_core::{CompanyId, World};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiplomacyChange {
    Peace(CompanyId),
    War(CompanyId),
}

/// Make peace with companies whose reputation recovered above
/// `war_threshold`, and declare war on those at or below it. A declaration
/// against the player is mirrored on the player's side.
pub fn simulate_diplomacy(
    world: &mut World,
    company: CompanyId,
    war_threshold: f32,
) -> Vec<DiplomacyChange> {
    let Some(me) = world.companies.get(&company) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    for &other in world.companies.keys() {
        if other == company {
            continue;
        }
        let reputation = me.reputation_of(other);
        let hostile = me.is_hostile_to(other);
        if hostile && reputation > war_threshold {
            changes.push(DiplomacyChange::Peace(other));
        } else if !hostile && reputation <= war_threshold {
            changes.push(DiplomacyChange::War(other));
        }
    }

    for change in &changes {
        match *change {
            DiplomacyChange::Peace(other) => {
                if let Some(me) = world.companies.get_mut(&company) {
                    me.set_hostility_to(other, false);
                }
                info!(%company, %other, "peace made");
            }
            DiplomacyChange::War(other) => {
                if let Some(me) = world.companies.get_mut(&company) {
                    me.set_hostility_to(other, true);
                }
                if world.is_player(other) {
                    if let Some(player) = world.companies.get_mut(&other) {
                        player.set_hostility_to(company, true);
                    }
                }
                info!(%company, %other, "war declared");
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::Controller;

    #[test]
    fn bad_reputation_means_war_and_recovery_means_peace() {
        let mut world = World::new(365);
        let player = world.add_company("p", "Player", 0, Controller::Human);
        let ai = world.add_company("ai", "Ai", 0, Controller::Ai);
        let other = world.add_company("o", "Other", 0, Controller::Ai);
        {
            let me = world.companies.get_mut(&ai).unwrap();
            me.give_reputation(player, -150.0);
            me.give_reputation(other, -100.0);
        }

        let changes = simulate_diplomacy(&mut world, ai, -100.0);
        assert_eq!(
            changes,
            vec![DiplomacyChange::War(player), DiplomacyChange::War(other)]
        );
        assert!(world.companies[&player].is_hostile_to(ai));
        assert!(!world.companies[&other].is_hostile_to(ai));

        world
            .companies
            .get_mut(&ai)
            .unwrap()
            .give_reputation(other, 10.0);
        let changes = simulate_diplomacy(&mut world, ai, -100.0);
        assert_eq!(changes, vec![DiplomacyChange::Peace(other)]);
        assert!(world.companies[&ai].is_hostile_to(player));
    }
}
