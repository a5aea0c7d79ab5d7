//! Companies, their diplomacy and their persisted AI planner state.

use crate::ids::{CompanyId, FleetId, SectorId, SpacecraftId, SpacecraftTypeId, TradeRouteId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bound applied to every reputation value.
pub const REPUTATION_LIMIT: f32 = 200.0;

/// Who takes the company's decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    Human,
    Ai,
}

/// Stance of one company toward another, as seen by the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hostility {
    Owned,
    Neutral,
    Hostile,
}

/// Ship grouping used for combat tactics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombatGroup {
    AllMilitary,
    Capitals,
    Fighters,
    Civilian,
}

impl CombatGroup {
    pub const ALL: [CombatGroup; 4] = [
        CombatGroup::AllMilitary,
        CombatGroup::Capitals,
        CombatGroup::Fighters,
        CombatGroup::Civilian,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatTactic {
    ProtectMe,
    AttackMilitary,
    AttackStations,
    AttackCivilians,
    StandDown,
}

/// Station build the AI has committed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionProject {
    pub station_type: SpacecraftTypeId,
    pub sector: SectorId,
}

/// Planner state kept across ticks for AI companies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    pub construction_project: Option<ConstructionProject>,
    /// Ships ferrying resources for the current project.
    pub construction_ships: Vec<SpacecraftId>,
    pub combat_tactics: BTreeMap<CombatGroup, CombatTactic>,
}

impl AiState {
    pub fn release_construction_ships(&mut self) {
        self.construction_ships.clear();
    }

    pub fn is_construction_ship(&self, ship: SpacecraftId) -> bool {
        self.construction_ships.contains(&ship)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub identifier: String,
    pub name: String,
    pub short_name: String,
    /// Balance in hundredths of a credit.
    pub money: i64,
    pub controller: Controller,
    pub reputation: BTreeMap<CompanyId, f32>,
    /// Companies this one considers enemies. The relation is one-sided.
    pub hostile_to: BTreeSet<CompanyId>,
    pub fleets: BTreeSet<FleetId>,
    pub spacecraft: BTreeSet<SpacecraftId>,
    pub known_sectors: BTreeSet<SectorId>,
    pub trade_routes: BTreeSet<TradeRouteId>,
    pub ai: AiState,
}

impl Company {
    pub fn new(id: CompanyId, identifier: &str, name: &str, money: i64, controller: Controller) -> Self {
        Self {
            id,
            identifier: identifier.to_string(),
            name: name.to_string(),
            short_name: identifier.chars().take(3).collect::<String>().to_uppercase(),
            money,
            controller,
            reputation: BTreeMap::new(),
            hostile_to: BTreeSet::new(),
            fleets: BTreeSet::new(),
            spacecraft: BTreeSet::new(),
            known_sectors: BTreeSet::new(),
            trade_routes: BTreeSet::new(),
            ai: AiState::default(),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.controller == Controller::Ai
    }

    /// Withdraw `amount` when the balance allows it.
    pub fn take_money(&mut self, amount: i64) -> bool {
        if amount < 0 || amount > self.money {
            return false;
        }
        self.money -= amount;
        true
    }

    pub fn give_money(&mut self, amount: i64) {
        self.money += amount.max(0);
    }

    pub fn reputation_of(&self, other: CompanyId) -> f32 {
        self.reputation.get(&other).copied().unwrap_or(0.0)
    }

    pub fn give_reputation(&mut self, other: CompanyId, amount: f32) {
        let entry = self.reputation.entry(other).or_insert(0.0);
        *entry = (*entry + amount).clamp(-REPUTATION_LIMIT, REPUTATION_LIMIT);
    }

    pub fn is_hostile_to(&self, other: CompanyId) -> bool {
        self.hostile_to.contains(&other)
    }

    pub fn set_hostility_to(&mut self, other: CompanyId, hostile: bool) {
        if other == self.id {
            return;
        }
        if hostile {
            self.hostile_to.insert(other);
        } else {
            self.hostile_to.remove(&other);
        }
    }

    pub fn hostility(&self, other: CompanyId) -> Hostility {
        if other == self.id {
            Hostility::Owned
        } else if self.is_hostile_to(other) {
            Hostility::Hostile
        } else {
            Hostility::Neutral
        }
    }

    pub fn knows_sector(&self, sector: SectorId) -> bool {
        self.known_sectors.contains(&sector)
    }

    pub fn discover_sector(&mut self, sector: SectorId) {
        self.known_sectors.insert(sector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> Company {
        Company::new(CompanyId(1), "miners", "Miners Guild", 10_000, Controller::Ai)
    }

    #[test]
    fn money_is_never_overdrawn() {
        let mut c = company();
        assert!(!c.take_money(10_001));
        assert!(c.take_money(10_000));
        assert_eq!(c.money, 0);
        c.give_money(-5);
        assert_eq!(c.money, 0);
    }

    #[test]
    fn reputation_is_clamped() {
        let mut c = company();
        c.give_reputation(CompanyId(2), -500.0);
        assert_eq!(c.reputation_of(CompanyId(2)), -REPUTATION_LIMIT);
        assert_eq!(c.reputation_of(CompanyId(3)), 0.0);
    }

    #[test]
    fn hostility_is_one_sided_and_never_self() {
        let mut c = company();
        c.set_hostility_to(CompanyId(2), true);
        c.set_hostility_to(CompanyId(1), true);
        assert_eq!(c.hostility(CompanyId(2)), Hostility::Hostile);
        assert_eq!(c.hostility(CompanyId(1)), Hostility::Owned);
        assert_eq!(c.short_name, "MIN");
    }
}
