//! Battle state of a company in a sector, derived from military presence.

use crate::ids::{CompanyId, SectorId};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleState {
    /// No enemy present, or nobody able to fight.
    NoBattle,
    /// Both sides field military strength.
    Battle,
    /// Only this company fields military strength.
    BattleWon,
    /// Only the enemy fields military strength; some ships could still flee.
    BattleLost,
    /// Only the enemy fields military strength and nothing can flee.
    BattleLostNoRetreat,
}

impl BattleState {
    pub fn is_lost(self) -> bool {
        matches!(self, BattleState::BattleLost | BattleState::BattleLostNoRetreat)
    }
}

impl World {
    pub fn battle_state(&self, sector: SectorId, company: CompanyId) -> BattleState {
        let Some(s) = self.sectors.get(&sector) else {
            return BattleState::NoBattle;
        };
        let mut own_presence = false;
        let mut own_strength = 0u32;
        let mut can_retreat = false;
        let mut enemy_presence = false;
        let mut enemy_strength = 0u32;
        for spacecraft in s
            .ships
            .iter()
            .chain(s.stations.iter())
            .filter_map(|id| self.spacecraft.get(id))
        {
            if spacecraft.company == company {
                own_presence = true;
                own_strength += spacecraft.effective_combat_points();
                can_retreat |= spacecraft.is_ship() && !spacecraft.disabled;
            } else if self.are_at_war(company, spacecraft.company) {
                enemy_presence = true;
                enemy_strength += spacecraft.effective_combat_points();
            }
        }
        if !own_presence || !enemy_presence {
            return BattleState::NoBattle;
        }
        match (own_strength > 0, enemy_strength > 0) {
            (true, true) => BattleState::Battle,
            (true, false) => BattleState::BattleWon,
            (false, true) if can_retreat => BattleState::BattleLost,
            (false, true) => BattleState::BattleLostNoRetreat,
            (false, false) => BattleState::NoBattle,
        }
    }

    /// Companies with at least one spacecraft in the sector.
    pub fn companies_in_sector(&self, sector: SectorId) -> BTreeSet<CompanyId> {
        self.sectors
            .get(&sector)
            .map(|s| {
                s.ships
                    .iter()
                    .chain(s.stations.iter())
                    .filter_map(|id| self.spacecraft.get(id))
                    .map(|sc| sc.company)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a battle must be resolved in the sector today: some company
    /// fields military strength against an enemy present there.
    ///
    /// The player's company is ignored where its flagship is present, since
    /// that fight is played out live.
    pub fn sector_needs_battle(&self, sector: SectorId) -> bool {
        let player_here = self
            .player
            .filter(|_| self.player_sector() == Some(sector))
            .map(|p| p.company);
        self.companies_in_sector(sector)
            .into_iter()
            .filter(|c| Some(*c) != player_here)
            .any(|c| {
                matches!(
                    self.battle_state(sector, c),
                    BattleState::Battle | BattleState::BattleWon
                )
            })
    }

    /// Capture strength of a company in a sector.
    pub fn company_capture_points(&self, sector: SectorId, company: CompanyId) -> u32 {
        self.sector_ships(sector)
            .filter(|s| s.company == company)
            .map(|s| s.effective_combat_points())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::company::Controller;

    #[test]
    fn states_follow_military_presence() {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let a = world.add_company("a", "A", 0, Controller::Ai);
        let b = world.add_company("b", "B", 0, Controller::Ai);
        let sector = world.add_sector(&catalog, "s", "S", 0, 1.0);
        let ghoul = catalog.find_spacecraft("ship-ghoul").unwrap();
        let omen = catalog.find_spacecraft("ship-omen").unwrap();
        world.create_spacecraft(&catalog, ghoul, a, sector).unwrap();
        let cargo = world.create_spacecraft(&catalog, omen, b, sector).unwrap();

        assert_eq!(world.battle_state(sector, a), BattleState::NoBattle);
        world.companies.get_mut(&a).unwrap().set_hostility_to(b, true);
        assert_eq!(world.battle_state(sector, a), BattleState::BattleWon);
        assert_eq!(world.battle_state(sector, b), BattleState::BattleLost);
        // the winner still fights to finish off the cargo ship
        assert!(world.sector_needs_battle(sector));

        world.spacecraft.get_mut(&cargo).unwrap().disabled = true;
        assert_eq!(world.battle_state(sector, b), BattleState::BattleLostNoRetreat);

        world.create_spacecraft(&catalog, ghoul, b, sector).unwrap();
        assert_eq!(world.battle_state(sector, a), BattleState::Battle);
        assert!(world.sector_needs_battle(sector));
        assert_eq!(world.company_capture_points(sector, a), 10);
    }
}
