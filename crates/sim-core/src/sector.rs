//! Sectors: location, local prices and population.

use crate::catalog::Catalog;
use crate::ids::{FleetId, ResourceId, SectorId, SpacecraftId};
use crate::people::People;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of a transaction a price is quoted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceContext {
    /// Reference price, used for storage and valuation.
    Default,
    /// Price paid when delivering to a factory (base plus transport fee).
    FactoryInput,
    /// Price paid when collecting from a factory (base minus transport fee).
    FactoryOutput,
}

/// Double-buffered price table. Reads see `current`; variation writes `next`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub current: BTreeMap<ResourceId, i64>,
    pub next: BTreeMap<ResourceId, i64>,
}

impl PriceTable {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let current: BTreeMap<ResourceId, i64> = catalog
            .resources
            .iter()
            .map(|r| (r.id, r.default_price))
            .collect();
        Self {
            next: current.clone(),
            current,
        }
    }

    /// Publish the prices computed during the last variation pass.
    pub fn swap(&mut self) {
        self.current.clone_from(&self.next);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub identifier: String,
    pub name: String,
    /// Distance from the star; drives travel duration.
    pub orbit_distance: i64,
    /// Sunlight available to sun-dependent factories, in (0, 1].
    pub light_ratio: f32,
    /// Maximum number of stations a single company may own here.
    pub station_limit: u32,
    /// Days simulated in this sector.
    pub local_time: i64,
    pub people: People,
    pub prices: PriceTable,
    pub ships: Vec<SpacecraftId>,
    pub stations: Vec<SpacecraftId>,
    pub fleets: Vec<FleetId>,
    /// Unexploded ordnance left by the last battle.
    pub bombs: u32,
}

impl Sector {
    pub fn new(
        id: SectorId,
        identifier: &str,
        name: &str,
        orbit_distance: i64,
        light_ratio: f32,
        catalog: &Catalog,
    ) -> Self {
        Self {
            id,
            identifier: identifier.to_string(),
            name: name.to_string(),
            orbit_distance,
            light_ratio,
            station_limit: 5,
            local_time: 0,
            people: People::default(),
            prices: PriceTable::from_catalog(catalog),
            ships: Vec::new(),
            stations: Vec::new(),
            fleets: Vec::new(),
            bombs: 0,
        }
    }

    /// Current base price, falling back to the catalog default.
    pub fn base_price(&self, catalog: &Catalog, resource: ResourceId) -> i64 {
        self.prices
            .current
            .get(&resource)
            .copied()
            .or_else(|| catalog.resource(resource).map(|r| r.default_price))
            .unwrap_or(0)
    }

    pub fn resource_price(
        &self,
        catalog: &Catalog,
        resource: ResourceId,
        context: PriceContext,
    ) -> i64 {
        let base = self.base_price(catalog, resource);
        let fee = catalog.resource(resource).map_or(0, |r| r.transport_fee);
        match context {
            PriceContext::Default => base,
            PriceContext::FactoryInput => base + fee,
            PriceContext::FactoryOutput => (base - fee).max(0),
        }
    }

    pub fn contains(&self, spacecraft: SpacecraftId) -> bool {
        self.ships.contains(&spacecraft) || self.stations.contains(&spacecraft)
    }

    pub(crate) fn attach(&mut self, spacecraft: SpacecraftId, is_station: bool) {
        let list = if is_station {
            &mut self.stations
        } else {
            &mut self.ships
        };
        if !list.contains(&spacecraft) {
            list.push(spacecraft);
        }
    }

    pub(crate) fn detach(&mut self, spacecraft: SpacecraftId) {
        self.ships.retain(|s| *s != spacecraft);
        self.stations.retain(|s| *s != spacecraft);
    }

    pub(crate) fn attach_fleet(&mut self, fleet: FleetId) {
        if !self.fleets.contains(&fleet) {
            self.fleets.push(fleet);
        }
    }

    pub(crate) fn detach_fleet(&mut self, fleet: FleetId) {
        self.fleets.retain(|f| *f != fleet);
    }
}
