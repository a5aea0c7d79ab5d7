//! Daily factory cycles, shipyards and in-sector transport.

use crate::catalog::{Capabilities, Catalog};
use crate::factory::ShipOrder;
use crate::ids::{CompanyId, ResourceId, SectorId, SpacecraftId, SpacecraftTypeId};
use crate::market::{is_factory_input, is_factory_output, spacecraft_price};
use crate::spacecraft::Spacecraft;
use crate::world::World;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShipyardError {
    #[error("unknown station {0}")]
    UnknownStation(SpacecraftId),
    #[error("spacecraft type {0} is not a ship")]
    NotAShip(SpacecraftTypeId),
    #[error("no free shipyard able to build {0}")]
    NoFreeShipyard(SpacecraftTypeId),
    #[error("ordering company {0} is at war with the shipyard owner")]
    Hostile(CompanyId),
    #[error("not enough money: need {needed}, have {available}")]
    NotEnoughMoney { needed: i64, available: i64 },
}

impl World {
    /// Run one day of every station factory.
    ///
    /// A cycle takes its inputs and sets its cost aside when it starts, then
    /// delivers its outputs and pays the cost to the sector population when
    /// it ends.
    pub fn simulate_factories(&mut self, catalog: &Catalog) {
        let stations: Vec<(SpacecraftId, usize)> = self
            .spacecraft
            .values()
            .filter(|s| s.is_station())
            .map(|s| (s.id, s.factories.len()))
            .collect();
        for (station, count) in stations {
            for index in 0..count {
                self.tick_factory(catalog, station, index);
            }
        }
    }

    fn tick_factory(&mut self, catalog: &Catalog, station_id: SpacecraftId, index: usize) {
        let Some(station) = self.spacecraft.get(&station_id) else {
            return;
        };
        let Some(sector_id) = station.sector else {
            return;
        };
        let Some(factory) = station.factories.get(index) else {
            return;
        };
        if !factory.active {
            return;
        }
        if factory.is_shipyard() {
            self.tick_shipyard(catalog, station_id, index, sector_id);
            return;
        }

        if !factory.producing {
            if !factory.has_inputs(&station.cargo) || !factory.needs_production(&station.cargo) {
                return;
            }
            let light = self.sectors.get(&sector_id).map_or(1.0, |s| s.light_ratio);
            let cost = factory.cycle_cost(light);
            let inputs = factory.description.inputs.clone();
            let owner = station.company;
            let paid = self
                .companies
                .get_mut(&owner)
                .is_some_and(|c| c.take_money(cost));
            if !paid {
                debug!(station = %station_id, cost, "factory cannot afford its cycle");
                return;
            }
            let Some(station) = self.spacecraft.get_mut(&station_id) else {
                return;
            };
            for input in &inputs {
                station.cargo.take_resources(input.resource, input.quantity);
            }
            let factory = &mut station.factories[index];
            factory.producing = true;
            factory.progress = 0;
            factory.reserved_money = cost;
        }

        let Some(station) = self.spacecraft.get_mut(&station_id) else {
            return;
        };
        let factory = &mut station.factories[index];
        factory.progress += 1;
        if factory.progress < factory.description.production_time {
            return;
        }
        factory.producing = false;
        factory.progress = 0;
        let wages = std::mem::take(&mut factory.reserved_money);
        let outputs = factory.description.outputs.clone();
        for output in &outputs {
            let given = station.cargo.give_resources(output.resource, output.quantity);
            if given < output.quantity {
                debug!(station = %station_id, resource = %output.resource, lost = output.quantity - given, "output storage full");
            }
        }
        if let Some(sector) = self.sectors.get_mut(&sector_id) {
            sector.people.pay(wages);
        }
    }

    fn tick_shipyard(
        &mut self,
        catalog: &Catalog,
        station_id: SpacecraftId,
        index: usize,
        sector_id: SectorId,
    ) {
        let Some(factory) = self
            .spacecraft
            .get_mut(&station_id)
            .and_then(|s| s.factories.get_mut(index))
        else {
            return;
        };
        if factory.target.is_none() {
            let Some(order) = factory.order.take() else {
                return;
            };
            factory.target = Some(order);
            factory.producing = true;
            factory.progress = 0;
        }
        factory.progress += 1;
        if factory.progress < factory.description.production_time {
            return;
        }
        factory.producing = false;
        factory.progress = 0;
        let Some(order) = factory.target.take() else {
            return;
        };
        match self.create_spacecraft(catalog, order.ship_type, order.company, sector_id) {
            Ok(ship) => {
                info!(company = %order.company, %ship, shipyard = %station_id, "ship delivered")
            }
            Err(err) => warn!(shipyard = %station_id, %err, "ship delivery failed"),
        }
    }

    /// Order a ship from any free shipyard factory of `station`.
    ///
    /// The full ship price is paid up front, to the shipyard owner or, for
    /// the owner's own orders, to the sector population.
    pub fn order_ship(
        &mut self,
        catalog: &Catalog,
        company: CompanyId,
        station_id: SpacecraftId,
        ship_type: SpacecraftTypeId,
    ) -> Result<(), ShipyardError> {
        let description = catalog
            .spacecraft(ship_type)
            .filter(|d| !d.is_station())
            .ok_or(ShipyardError::NotAShip(ship_type))?;
        let station = self
            .spacecraft
            .get(&station_id)
            .ok_or(ShipyardError::UnknownStation(station_id))?;
        let sector_id = station.sector.ok_or(ShipyardError::UnknownStation(station_id))?;
        let owner = station.company;
        if self.are_at_war(company, owner) {
            return Err(ShipyardError::Hostile(company));
        }
        let index = station
            .factories
            .iter()
            .position(|f| {
                f.active
                    && f.is_free_shipyard()
                    && f.shipyard_size().is_some_and(|size| size >= description.size)
            })
            .ok_or(ShipyardError::NoFreeShipyard(ship_type))?;
        let price = spacecraft_price(catalog, ship_type);
        let available = self.companies.get(&company).map_or(0, |c| c.money);
        if available < price {
            return Err(ShipyardError::NotEnoughMoney {
                needed: price,
                available,
            });
        }

        if let Some(c) = self.companies.get_mut(&company) {
            c.take_money(price);
        }
        if owner == company {
            if let Some(sector) = self.sectors.get_mut(&sector_id) {
                sector.people.pay(price);
            }
        } else if let Some(c) = self.companies.get_mut(&owner) {
            c.give_money(price);
        }
        if let Some(factory) = self
            .spacecraft
            .get_mut(&station_id)
            .and_then(|s| s.factories.get_mut(index))
        {
            factory.order = Some(ShipOrder { ship_type, company });
        }
        info!(%company, shipyard = %station_id, kind = %description.identifier, price, "ship ordered");
        Ok(())
    }

    /// Ships assigned to a sector move their company's factory outputs into
    /// the inputs of its other stations, up to their combined capacity.
    pub fn simulate_sector_transport(&mut self) {
        let sector_ids: Vec<SectorId> = self.sectors.keys().copied().collect();
        for sector_id in sector_ids {
            for company in self.companies_in_sector(sector_id) {
                let mut budget: u32 = self
                    .sector_ships(sector_id)
                    .filter(|s| {
                        s.company == company
                            && s.assigned_to_sector == Some(sector_id)
                            && s.has(Capabilities::CARGO)
                    })
                    .map(|s| s.cargo_capacity())
                    .sum();
                if budget == 0 {
                    continue;
                }
                let stations: Vec<SpacecraftId> = self
                    .sector_stations(sector_id)
                    .filter(|s| s.company == company && s.has(Capabilities::FACTORY))
                    .map(|s| s.id)
                    .collect();
                for &from in &stations {
                    let outputs: Vec<ResourceId> = self
                        .spacecraft
                        .get(&from)
                        .map(|s| {
                            s.factories
                                .iter()
                                .flat_map(|f| f.description.outputs.iter().map(|o| o.resource))
                                .collect()
                        })
                        .unwrap_or_default();
                    for resource in outputs {
                        for &to in &stations {
                            if to == from || budget == 0 {
                                continue;
                            }
                            let (Some(src), Some(dst)) =
                                (self.spacecraft.get(&from), self.spacecraft.get(&to))
                            else {
                                continue;
                            };
                            if !is_factory_input(dst, resource) || is_factory_output(dst, resource) {
                                continue;
                            }
                            let q = budget
                                .min(src.cargo.resource_quantity(resource))
                                .min(dst.cargo.free_space_for_resource(resource));
                            if q == 0 {
                                continue;
                            }
                            if let Some(src) = self.spacecraft.get_mut(&from) {
                                src.cargo.take_resources(resource, q);
                            }
                            if let Some(dst) = self.spacecraft.get_mut(&to) {
                                dst.cargo.give_resources(resource, q);
                            }
                            budget -= q;
                        }
                    }
                }
            }
        }
    }

    /// Cargo capacity of the company ships assigned to the sector.
    pub fn transport_capacity(&self, sector: SectorId, company: CompanyId) -> u32 {
        self.sector_ships(sector)
            .filter(|s| s.company == company && s.assigned_to_sector == Some(sector))
            .map(|s| s.cargo_capacity())
            .sum()
    }

    /// Units per cycle the company's stations in the sector need moved
    /// between each other: outputs that another own station consumes.
    pub fn transport_capacity_needs(&self, sector: SectorId, company: CompanyId) -> u32 {
        let stations: Vec<&Spacecraft> = self
            .sector_stations(sector)
            .filter(|s| s.company == company && s.has(Capabilities::FACTORY))
            .collect();
        let mut needs = 0;
        for from in &stations {
            for factory in from.factories.iter().filter(|f| f.active) {
                for output in &factory.description.outputs {
                    let consumed_nearby = stations.iter().any(|to| {
                        to.id != from.id && is_factory_input(to, output.resource)
                    });
                    if consumed_nearby {
                        needs += output.quantity;
                    }
                }
            }
        }
        needs
    }

    /// Assigned capacity minus needs; positive means ships can be released.
    pub fn transport_capacity_balance(&self, sector: SectorId, company: CompanyId) -> i64 {
        i64::from(self.transport_capacity(sector, company))
            - i64::from(self.transport_capacity_needs(sector, company))
    }
}
