//! Per-sector supply and demand forecast as seen by one company.
//!
//! Flows are expressed as net consumption per day: factory inputs and
//! population needs add, factory outputs subtract. A stock bucket after `t`
//! days is `stock - flow * t`; a capacity bucket is `capacity + flow * t`.

use serde::Serialize;
use sim_core::{
    Capabilities, Catalog, CompanyId, ResourceId, SectorId, Spacecraft, World,
};
use std::collections::BTreeMap;

/// Days of flow a stockpile may hold before the excess counts as already
/// spoken for.
pub const DEFAULT_STOCK_HORIZON_DAYS: i64 = 10;

/// Forecast buckets of one resource in one sector.
///
/// "Owned" buckets belong to stations of the evaluating company; "factory"
/// buckets to every other non-hostile station.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResourceVariation {
    pub owned_flow: i64,
    pub factory_flow: i64,
    pub owned_stock: i64,
    pub factory_stock: i64,
    pub storage_stock: i64,
    pub owned_capacity: i64,
    pub factory_capacity: i64,
    pub storage_capacity: i64,
    pub incoming_resources: i64,
}

impl ResourceVariation {
    /// No flow, stock or capacity anywhere; incoming goods are not counted.
    pub fn is_empty(&self) -> bool {
        self.owned_flow == 0
            && self.factory_flow == 0
            && self.owned_stock == 0
            && self.factory_stock == 0
            && self.storage_stock == 0
            && self.owned_capacity == 0
            && self.factory_capacity == 0
            && self.storage_capacity == 0
    }

    pub fn total_flow(&self) -> i64 {
        self.owned_flow + self.factory_flow
    }

    pub fn total_stock(&self) -> i64 {
        self.owned_stock + self.factory_stock + self.storage_stock
    }

    pub fn total_capacity(&self) -> i64 {
        self.owned_capacity + self.factory_capacity + self.storage_capacity
    }

    /// Drop every source of this resource after a failed purchase, so no
    /// other ship plans on it during the same pass.
    pub fn forget_supply(&mut self) {
        self.owned_stock = 0;
        self.factory_stock = 0;
        self.storage_stock = 0;
        self.owned_flow = self.owned_flow.min(0);
        self.factory_flow = self.factory_flow.min(0);
    }

    fn flow_mut(&mut self, owned: bool) -> &mut i64 {
        if owned {
            &mut self.owned_flow
        } else {
            &mut self.factory_flow
        }
    }

    fn stock_mut(&mut self, owned: bool) -> &mut i64 {
        if owned {
            &mut self.owned_stock
        } else {
            &mut self.factory_stock
        }
    }

    fn capacity_mut(&mut self, owned: bool) -> &mut i64 {
        if owned {
            &mut self.owned_capacity
        } else {
            &mut self.factory_capacity
        }
    }
}

/// Forecast of a whole sector for one company.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SectorVariation {
    pub resources: BTreeMap<ResourceId, ResourceVariation>,
    /// Cargo capacity per day heading to this sector.
    pub incoming_capacity: i64,
}

impl SectorVariation {
    fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            resources: catalog
                .resource_ids()
                .map(|r| (r, ResourceVariation::default()))
                .collect(),
            incoming_capacity: 0,
        }
    }

    pub fn resource(&self, resource: ResourceId) -> ResourceVariation {
        self.resources.get(&resource).copied().unwrap_or_default()
    }

    pub fn resource_mut(&mut self, resource: ResourceId) -> &mut ResourceVariation {
        self.resources.entry(resource).or_default()
    }
}

/// Forecasts of every sector a company knows, keyed by sector.
pub type WorldVariation = BTreeMap<SectorId, SectorVariation>;

fn headroom(station: &Spacecraft, resource: ResourceId) -> i64 {
    let quantity = station.cargo.resource_quantity(resource);
    let slot = station.cargo.slot_capacity();
    i64::from(slot.saturating_sub(quantity))
}

/// Forecast one sector as seen by `company`.
pub fn compute_sector_variation(
    world: &World,
    catalog: &Catalog,
    sector_id: SectorId,
    company: CompanyId,
    stock_horizon_days: i64,
) -> SectorVariation {
    let mut variation = SectorVariation::for_catalog(catalog);
    let Some(sector) = world.sectors.get(&sector_id) else {
        return variation;
    };

    let mut owned_consumers = 0u32;
    let mut other_consumers = 0u32;

    for station in world.sector_stations(sector_id) {
        if world.are_at_war(company, station.company) {
            continue;
        }
        let owned = station.company == company;

        for factory in &station.factories {
            if !factory.active || !factory.needs_production(&station.cargo) {
                break;
            }
            let duration = factory.description.production_time.max(1);
            for input in &factory.description.inputs {
                let flow = i64::from(input.quantity) / duration;
                if flow == 0 {
                    continue;
                }
                let entry = variation.resource_mut(input.resource);
                if factory.producing {
                    *entry.flow_mut(owned) += flow;
                }
                *entry.capacity_mut(owned) += headroom(station, input.resource);
            }
            for output in &factory.description.outputs {
                let flow = i64::from(output.quantity) / duration;
                if flow == 0 {
                    continue;
                }
                let entry = variation.resource_mut(output.resource);
                if factory.producing {
                    *entry.flow_mut(owned) -= flow;
                }
                *entry.stock_mut(owned) += i64::from(station.cargo.resource_quantity(output.resource));
            }
        }

        if station.has(Capabilities::CONSUMER) {
            if owned {
                owned_consumers += 1;
            } else {
                other_consumers += 1;
            }
            for resource in catalog.consumer_resources() {
                *variation.resource_mut(resource).capacity_mut(owned) += headroom(station, resource);
            }
        }

        if station.has(Capabilities::MAINTENANCE) {
            for resource in catalog.maintenance_resources() {
                *variation.resource_mut(resource).capacity_mut(owned) += headroom(station, resource);
            }
        }

        if station.has(Capabilities::STORAGE) {
            for resource in catalog.resource_ids() {
                let entry = variation.resource_mut(resource);
                entry.storage_stock += i64::from(station.cargo.resource_quantity(resource));
                entry.storage_capacity += headroom(station, resource);
            }
        }
    }

    let consumers = owned_consumers + other_consumers;
    if consumers > 0 {
        let owned_ratio = f64::from(owned_consumers) / f64::from(consumers);
        let other_ratio = f64::from(other_consumers) / f64::from(consumers);
        for resource in catalog.consumer_resources() {
            let consumption = f64::from(sector.people.resource_consumption(catalog, resource));
            let entry = variation.resource_mut(resource);
            entry.owned_flow += (consumption * owned_ratio) as i64;
            entry.factory_flow += (consumption * other_ratio) as i64;
        }
    }

    for travel in world.travels.values().filter(|t| t.destination == sector_id) {
        let remaining = travel.remaining(world.date).max(1);
        let Some(fleet) = world.fleets.get(&travel.fleet) else {
            continue;
        };
        for ship in fleet.ships.iter().filter_map(|id| world.spacecraft.get(id)) {
            if ship.cargo.slot_capacity() == 0 {
                continue;
            }
            variation.incoming_capacity += i64::from(ship.cargo.capacity()) / remaining;
            for slot in ship.cargo.slots() {
                let Some(resource) = slot.resource else {
                    continue;
                };
                let arriving = f64::from(slot.quantity) / (remaining as f64 * 0.5);
                variation.resource_mut(resource).incoming_resources += arriving as i64;
            }
        }
    }

    for entry in variation.resources.values_mut() {
        let flow = entry.total_flow();
        if flow < 0 {
            continue;
        }
        let stock = entry.owned_stock + entry.factory_stock;
        let long_term = flow * stock_horizon_days;
        if stock > long_term {
            entry.incoming_resources += stock - long_term;
        }
    }

    variation
}

/// Forecast every sector known to `company`.
pub fn compute_world_variation(
    world: &World,
    catalog: &Catalog,
    company: CompanyId,
    stock_horizon_days: i64,
) -> WorldVariation {
    let Some(c) = world.companies.get(&company) else {
        return WorldVariation::new();
    };
    c.known_sectors
        .iter()
        .map(|&sector| {
            (
                sector,
                compute_sector_variation(world, catalog, sector, company, stock_horizon_days),
            )
        })
        .collect()
}

/// Net daily supply per resource over the sectors `company` knows.
///
/// Outputs add, inputs subtract, and the population of every sector with a
/// consumer station subtracts its needs. Hostile stations are ignored.
pub fn compute_world_resource_flow(
    world: &World,
    catalog: &Catalog,
    company: CompanyId,
) -> BTreeMap<ResourceId, i64> {
    let mut flow: BTreeMap<ResourceId, i64> = catalog.resource_ids().map(|r| (r, 0)).collect();
    let Some(c) = world.companies.get(&company) else {
        return flow;
    };
    for &sector_id in &c.known_sectors {
        let mut has_consumer = false;
        for station in world.sector_stations(sector_id) {
            if world.are_at_war(company, station.company) {
                continue;
            }
            has_consumer |= station.has(Capabilities::CONSUMER);
            for factory in &station.factories {
                if !factory.active || !factory.needs_production(&station.cargo) {
                    break;
                }
                let duration = factory.description.production_time.max(1);
                for input in &factory.description.inputs {
                    *flow.entry(input.resource).or_default() -= i64::from(input.quantity) / duration;
                }
                for output in &factory.description.outputs {
                    *flow.entry(output.resource).or_default() += i64::from(output.quantity) / duration;
                }
            }
        }
        if has_consumer {
            if let Some(sector) = world.sectors.get(&sector_id) {
                for resource in catalog.consumer_resources() {
                    *flow.entry(resource).or_default() -=
                        i64::from(sector.people.resource_consumption(catalog, resource));
                }
            }
        }
    }
    flow
}
