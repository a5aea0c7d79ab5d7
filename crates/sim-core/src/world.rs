//! Arena-backed world state.
//!
//! Every entity lives in a `BTreeMap` keyed by its identifier, so iteration
//! order is stable across runs and snapshots. Cross references between
//! entities are plain identifiers looked up through the world.

use crate::catalog::Catalog;
use crate::company::{Company, Controller};
use crate::fleet::Fleet;
use crate::ids::{
    CompanyId, FleetId, IdAllocator, ResourceId, SectorId, SpacecraftId, SpacecraftTypeId,
    TradeRouteId, TravelId,
};
use crate::sector::Sector;
use crate::spacecraft::Spacecraft;
use crate::trade_route::TradeRoute;
use crate::travel::Travel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Errors raised by world construction helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("unknown company {0}")]
    UnknownCompany(CompanyId),
    #[error("unknown sector {0}")]
    UnknownSector(SectorId),
    #[error("unknown spacecraft type {0}")]
    UnknownSpacecraftType(SpacecraftTypeId),
    #[error("no catalog entry named `{0}`")]
    UnknownIdentifier(String),
}

/// The human player's company and flagship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub company: CompanyId,
    pub ship: Option<SpacecraftId>,
}

/// Trailing per-day consumption statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionHistory {
    capacity: usize,
    days: VecDeque<BTreeMap<ResourceId, u64>>,
    today: BTreeMap<ResourceId, u64>,
}

impl ConsumptionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            days: VecDeque::with_capacity(capacity),
            today: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, resource: ResourceId, quantity: u32) {
        *self.today.entry(resource).or_insert(0) += quantity as u64;
    }

    /// Close the current day; the oldest entry is evicted once full.
    pub fn roll(&mut self) {
        let today = std::mem::take(&mut self.today);
        self.days.push_back(today);
        while self.days.len() > self.capacity {
            self.days.pop_front();
        }
    }

    /// Closed days, oldest first.
    pub fn days(&self) -> impl Iterator<Item = &BTreeMap<ResourceId, u64>> + '_ {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn today(&self) -> &BTreeMap<ResourceId, u64> {
        &self.today
    }

    /// Total consumption of `resource` over the trailing window.
    pub fn total(&self, resource: ResourceId) -> u64 {
        self.days
            .iter()
            .filter_map(|d| d.get(&resource))
            .sum()
    }
}

impl Default for ConsumptionHistory {
    fn default() -> Self {
        Self::new(365)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct World {
    /// Day counter.
    pub date: i64,
    pub companies: BTreeMap<CompanyId, Company>,
    pub sectors: BTreeMap<SectorId, Sector>,
    pub spacecraft: BTreeMap<SpacecraftId, Spacecraft>,
    pub fleets: BTreeMap<FleetId, Fleet>,
    pub travels: BTreeMap<TravelId, Travel>,
    pub trade_routes: BTreeMap<TradeRouteId, TradeRoute>,
    pub player: Option<PlayerInfo>,
    pub consumption: ConsumptionHistory,
    /// World money recorded by the last integrity check.
    pub money_reference: Option<i64>,
    pub ids: IdAllocator,
}

impl World {
    pub fn new(history_days: usize) -> Self {
        Self {
            consumption: ConsumptionHistory::new(history_days),
            ..Self::default()
        }
    }

    pub fn add_company(
        &mut self,
        identifier: &str,
        name: &str,
        money: i64,
        controller: Controller,
    ) -> CompanyId {
        let id = CompanyId(self.ids.allocate());
        self.companies
            .insert(id, Company::new(id, identifier, name, money, controller));
        if controller == Controller::Human && self.player.is_none() {
            self.player = Some(PlayerInfo {
                company: id,
                ship: None,
            });
        }
        id
    }

    pub fn add_sector(
        &mut self,
        catalog: &Catalog,
        identifier: &str,
        name: &str,
        orbit_distance: i64,
        light_ratio: f32,
    ) -> SectorId {
        let id = SectorId(self.ids.allocate());
        self.sectors.insert(
            id,
            Sector::new(id, identifier, name, orbit_distance, light_ratio, catalog),
        );
        id
    }

    /// Spawn a spacecraft in a sector. Ships get a fleet of their own.
    pub fn create_spacecraft(
        &mut self,
        catalog: &Catalog,
        type_id: SpacecraftTypeId,
        company: CompanyId,
        sector: SectorId,
    ) -> Result<SpacecraftId, WorldError> {
        let description = catalog
            .spacecraft(type_id)
            .ok_or(WorldError::UnknownSpacecraftType(type_id))?;
        if !self.sectors.contains_key(&sector) {
            return Err(WorldError::UnknownSector(sector));
        }
        let owner = self
            .companies
            .get_mut(&company)
            .ok_or(WorldError::UnknownCompany(company))?;
        let id = SpacecraftId(self.ids.allocate());
        let immatriculation = format!(
            "{}-{}-{}",
            owner.short_name,
            description.identifier.rsplit('-').next().unwrap_or("x"),
            id.0
        );
        owner.spacecraft.insert(id);
        owner.discover_sector(sector);
        let spacecraft =
            Spacecraft::from_description(id, immatriculation, description, company, sector);
        let is_station = spacecraft.is_station();
        self.spacecraft.insert(id, spacecraft);
        if let Some(s) = self.sectors.get_mut(&sector) {
            s.attach(id, is_station);
        }
        if !is_station {
            self.create_fleet(company, sector, vec![id]);
        }
        debug!(spacecraft = %id, %company, %sector, "spacecraft created");
        Ok(id)
    }

    /// Remove a spacecraft from every list referencing it.
    ///
    /// Money reserved by its factories goes back to the owner.
    pub fn destroy_spacecraft(&mut self, id: SpacecraftId) -> Option<Spacecraft> {
        let spacecraft = self.spacecraft.remove(&id)?;
        if let Some(sector) = spacecraft.sector.and_then(|s| self.sectors.get_mut(&s)) {
            sector.detach(id);
        }
        let reserved: i64 = spacecraft.factories.iter().map(|f| f.reserved_money).sum();
        if let Some(owner) = self.companies.get_mut(&spacecraft.company) {
            owner.spacecraft.remove(&id);
            owner.give_money(reserved);
            owner.ai.construction_ships.retain(|s| *s != id);
        }
        if let Some(fleet_id) = spacecraft.fleet {
            if let Some(fleet) = self.fleets.get_mut(&fleet_id) {
                fleet.ships.retain(|s| *s != id);
                if fleet.ships.is_empty() {
                    self.dissolve_fleet(fleet_id);
                }
            }
        }
        if let Some(player) = self.player.as_mut() {
            if player.ship == Some(id) {
                player.ship = None;
            }
        }
        Some(spacecraft)
    }

    /// Either company considers the other an enemy.
    pub fn are_at_war(&self, a: CompanyId, b: CompanyId) -> bool {
        if a == b {
            return false;
        }
        let hostile = |x: CompanyId, y: CompanyId| {
            self.companies
                .get(&x)
                .is_some_and(|c| c.is_hostile_to(y))
        };
        hostile(a, b) || hostile(b, a)
    }

    pub fn is_player(&self, company: CompanyId) -> bool {
        self.player.is_some_and(|p| p.company == company)
    }

    /// Sector the player's flagship is in, if any.
    pub fn player_sector(&self) -> Option<SectorId> {
        let ship = self.player?.ship?;
        self.spacecraft.get(&ship)?.sector
    }

    /// Company money, money reserved by factories and population savings minus debt.
    pub fn world_money(&self) -> i64 {
        let companies: i64 = self.companies.values().map(|c| c.money).sum();
        let factories: i64 = self
            .spacecraft
            .values()
            .flat_map(|s| s.factories.iter())
            .map(|f| f.reserved_money)
            .sum();
        let people: i64 = self
            .sectors
            .values()
            .map(|s| s.people.money - s.people.dept)
            .sum();
        companies + factories + people
    }

    /// Account for money entering (positive) or leaving the world.
    pub fn record_external_transfer(&mut self, amount: i64) {
        if let Some(reference) = self.money_reference.as_mut() {
            *reference += amount;
        }
    }

    pub fn company_ships(&self, company: CompanyId) -> impl Iterator<Item = &Spacecraft> + '_ {
        self.spacecraft
            .values()
            .filter(move |s| s.company == company && s.is_ship())
    }

    pub fn company_stations(&self, company: CompanyId) -> impl Iterator<Item = &Spacecraft> + '_ {
        self.spacecraft
            .values()
            .filter(move |s| s.company == company && s.is_station())
    }

    /// Stations in a sector, in membership order.
    pub fn sector_stations(&self, sector: SectorId) -> impl Iterator<Item = &Spacecraft> + '_ {
        self.sectors
            .get(&sector)
            .into_iter()
            .flat_map(|s| s.stations.iter())
            .filter_map(|id| self.spacecraft.get(id))
    }

    pub fn sector_ships(&self, sector: SectorId) -> impl Iterator<Item = &Spacecraft> + '_ {
        self.sectors
            .get(&sector)
            .into_iter()
            .flat_map(|s| s.ships.iter())
            .filter_map(|id| self.spacecraft.get(id))
    }

    /// End the day's trade, repair and refill operations.
    pub fn clear_daily_flags(&mut self) {
        for spacecraft in self.spacecraft.values_mut() {
            spacecraft.clear_daily_flags();
        }
    }

    /// Advance sector local clocks by one day.
    pub fn advance_sector_time(&mut self) {
        for sector in self.sectors.values_mut() {
            sector.local_time += 1;
        }
    }
}
