//! Sector-local trade and construction.
//!
//! Trades between two companies move money from the buyer to the seller at
//! the sector price for the relevant context; trades within one company are
//! free transfers.

use crate::catalog::{Capabilities, Catalog};
use crate::ids::{CompanyId, ResourceId, SectorId, SpacecraftId, SpacecraftTypeId};
use crate::sector::PriceContext;
use crate::spacecraft::Spacecraft;
use crate::world::World;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("unknown company {0}")]
    UnknownCompany(CompanyId),
    #[error("unknown sector {0}")]
    UnknownSector(SectorId),
    #[error("station {0} cannot be built here")]
    NotPermitted(SpacecraftTypeId),
    #[error("not enough money: need {needed}, have {available}")]
    NotEnoughMoney { needed: i64, available: i64 },
    #[error("missing {missing} units of {resource}")]
    MissingResources { resource: ResourceId, missing: u32 },
}

/// Full value of a spacecraft: construction cost plus construction resources at default price.
pub fn spacecraft_price(catalog: &Catalog, type_id: SpacecraftTypeId) -> i64 {
    let Some(description) = catalog.spacecraft(type_id) else {
        return 0;
    };
    let resources: i64 = description
        .construction
        .iter()
        .map(|a| {
            a.quantity as i64 * catalog.resource(a.resource).map_or(0, |r| r.default_price)
        })
        .sum();
    description.construction_cost + resources
}

pub(crate) fn is_factory_input(station: &Spacecraft, resource: ResourceId) -> bool {
    station.factories.iter().any(|f| {
        f.active
            && f.description.inputs.iter().any(|i| i.resource == resource)
    })
}

pub(crate) fn is_factory_output(station: &Spacecraft, resource: ResourceId) -> bool {
    station.factories.iter().any(|f| {
        f.description.outputs.iter().any(|o| o.resource == resource)
    })
}

/// Whether a station buys `resource`.
pub fn station_accepts(catalog: &Catalog, station: &Spacecraft, resource: ResourceId) -> bool {
    let Some(r) = catalog.resource(resource) else {
        return false;
    };
    station.has(Capabilities::STORAGE)
        || (station.has(Capabilities::CONSUMER) && r.consumer_rate > 0)
        || (station.has(Capabilities::MAINTENANCE) && r.maintenance)
        || (station.has(Capabilities::FACTORY) && is_factory_input(station, resource))
}

/// Whether a station sells `resource`.
pub fn station_offers(station: &Spacecraft, resource: ResourceId) -> bool {
    station.has(Capabilities::STORAGE)
        || (station.has(Capabilities::FACTORY) && is_factory_output(station, resource))
}

/// Price a station pays when buying.
pub fn buy_context(station: &Spacecraft, resource: ResourceId) -> PriceContext {
    if is_factory_input(station, resource) {
        PriceContext::FactoryInput
    } else {
        PriceContext::Default
    }
}

/// Price a station charges when selling.
pub fn sell_context(station: &Spacecraft, resource: ResourceId) -> PriceContext {
    if is_factory_output(station, resource) {
        PriceContext::FactoryOutput
    } else {
        PriceContext::Default
    }
}

impl World {
    /// Stations of the sector that `company` may trade with, own first.
    fn trading_partners(&self, sector: SectorId, company: CompanyId) -> Vec<SpacecraftId> {
        let mut own = Vec::new();
        let mut others = Vec::new();
        for station in self.sector_stations(sector) {
            if station.company == company {
                own.push(station.id);
            } else if !self.are_at_war(company, station.company) {
                others.push(station.id);
            }
        }
        own.extend(others);
        own
    }

    /// Total stock of a resource held by the stations of a sector.
    pub fn resource_count(&self, sector: SectorId, resource: ResourceId) -> u32 {
        self.sector_stations(sector)
            .map(|s| s.cargo.resource_quantity(resource))
            .sum()
    }

    /// Unload up to `quantity` of a ship's cargo into stations that buy it.
    ///
    /// Own stations are served first for free; other companies pay the
    /// sector price within their means. Returns the quantity delivered.
    pub fn give_resources(
        &mut self,
        catalog: &Catalog,
        ship_id: SpacecraftId,
        resource: ResourceId,
        quantity: u32,
    ) -> u32 {
        let Some(ship) = self.spacecraft.get(&ship_id) else {
            return 0;
        };
        let Some(sector_id) = ship.sector else {
            return 0;
        };
        let seller = ship.company;
        let mut remaining = quantity.min(ship.cargo.resource_quantity(resource));
        let mut delivered = 0;
        for station_id in self.trading_partners(sector_id, seller) {
            if remaining == 0 {
                break;
            }
            let Some(station) = self.spacecraft.get(&station_id) else {
                continue;
            };
            if !station_accepts(catalog, station, resource) {
                continue;
            }
            let buyer = station.company;
            let mut q = remaining.min(station.cargo.free_space_for_resource(resource));
            let mut cost = 0;
            if buyer != seller {
                let price = self.sectors.get(&sector_id).map_or(0, |s| {
                    s.resource_price(catalog, resource, buy_context(station, resource))
                });
                let funds = self.companies.get(&buyer).map_or(0, |c| c.money);
                if price > 0 {
                    q = q.min(u32::try_from(funds / price).unwrap_or(u32::MAX));
                }
                cost = q as i64 * price;
            }
            if q == 0 {
                continue;
            }
            if cost > 0 {
                if let Some(b) = self.companies.get_mut(&buyer) {
                    if !b.take_money(cost) {
                        continue;
                    }
                }
                if let Some(s) = self.companies.get_mut(&seller) {
                    s.give_money(cost);
                }
            }
            if let Some(station) = self.spacecraft.get_mut(&station_id) {
                station.cargo.give_resources(resource, q);
            }
            if let Some(ship) = self.spacecraft.get_mut(&ship_id) {
                ship.cargo.take_resources(resource, q);
                ship.trading = true;
            }
            remaining -= q;
            delivered += q;
        }
        if delivered > 0 {
            debug!(ship = %ship_id, %resource, delivered, "resources sold");
        }
        delivered
    }

    /// Remove up to `quantity` of a resource from stations that offer it.
    ///
    /// Own stations give it away; when `allow_trade` is set, other companies
    /// sell it to `company` within its means. Returns the quantity taken; the
    /// caller is responsible for storing it.
    pub fn take_useless_resources(
        &mut self,
        catalog: &Catalog,
        company: CompanyId,
        sector_id: SectorId,
        resource: ResourceId,
        quantity: u32,
        allow_trade: bool,
    ) -> u32 {
        let mut remaining = quantity;
        let mut taken = 0;
        for station_id in self.trading_partners(sector_id, company) {
            if remaining == 0 {
                break;
            }
            let Some(station) = self.spacecraft.get(&station_id) else {
                continue;
            };
            if !station_offers(station, resource) {
                continue;
            }
            let seller = station.company;
            if seller != company && !allow_trade {
                continue;
            }
            let mut q = remaining.min(station.cargo.resource_quantity(resource));
            let mut cost = 0;
            if seller != company {
                let price = self.sectors.get(&sector_id).map_or(0, |s| {
                    s.resource_price(catalog, resource, sell_context(station, resource))
                });
                let funds = self.companies.get(&company).map_or(0, |c| c.money);
                if price > 0 {
                    q = q.min(u32::try_from(funds / price).unwrap_or(u32::MAX));
                }
                cost = q as i64 * price;
            }
            if q == 0 {
                continue;
            }
            if cost > 0 {
                let paid = self
                    .companies
                    .get_mut(&company)
                    .is_some_and(|c| c.take_money(cost));
                if !paid {
                    continue;
                }
                if let Some(s) = self.companies.get_mut(&seller) {
                    s.give_money(cost);
                }
            }
            if let Some(station) = self.spacecraft.get_mut(&station_id) {
                station.cargo.take_resources(resource, q);
            }
            remaining -= q;
            taken += q;
        }
        taken
    }

    /// Buy a resource into a ship's cargo from stations of its sector.
    pub fn load_resources(
        &mut self,
        catalog: &Catalog,
        ship_id: SpacecraftId,
        resource: ResourceId,
        quantity: u32,
    ) -> u32 {
        let Some(ship) = self.spacecraft.get(&ship_id) else {
            return 0;
        };
        let Some(sector) = ship.sector else {
            return 0;
        };
        let company = ship.company;
        let wanted = quantity.min(ship.cargo.free_space_for_resource(resource));
        let taken = self.take_useless_resources(catalog, company, sector, resource, wanted, true);
        if let Some(ship) = self.spacecraft.get_mut(&ship_id) {
            ship.cargo.give_resources(resource, taken);
            if taken > 0 {
                ship.trading = true;
            }
        }
        if taken > 0 {
            debug!(ship = %ship_id, %resource, taken, "resources bought");
        }
        taken
    }

    /// Whether `company` may start a station of this type in the sector.
    pub fn can_build_station(
        &self,
        catalog: &Catalog,
        station_type: SpacecraftTypeId,
        company: CompanyId,
        sector: SectorId,
    ) -> bool {
        let Some(description) = catalog.spacecraft(station_type) else {
            return false;
        };
        let Some(s) = self.sectors.get(&sector) else {
            return false;
        };
        if !description.is_station() {
            return false;
        }
        if !self
            .companies
            .get(&company)
            .is_some_and(|c| c.knows_sector(sector))
        {
            return false;
        }
        let owned = self
            .sector_stations(sector)
            .filter(|st| st.company == company)
            .count();
        if owned >= s.station_limit as usize {
            return false;
        }
        let state = self.battle_state(sector, company);
        !state.is_lost() && state != crate::battle::BattleState::Battle
    }

    /// Build a station from resources carried by the company's ships in the sector.
    ///
    /// The construction cost is paid to the sector population.
    pub fn build_station(
        &mut self,
        catalog: &Catalog,
        station_type: SpacecraftTypeId,
        company: CompanyId,
        sector: SectorId,
    ) -> Result<SpacecraftId, MarketError> {
        if !self.can_build_station(catalog, station_type, company, sector) {
            return Err(MarketError::NotPermitted(station_type));
        }
        let description = catalog
            .spacecraft(station_type)
            .ok_or(MarketError::NotPermitted(station_type))?;
        let available = self
            .companies
            .get(&company)
            .map(|c| c.money)
            .ok_or(MarketError::UnknownCompany(company))?;
        if available < description.construction_cost {
            return Err(MarketError::NotEnoughMoney {
                needed: description.construction_cost,
                available,
            });
        }
        let ships: Vec<SpacecraftId> = self
            .sector_ships(sector)
            .filter(|s| s.company == company)
            .map(|s| s.id)
            .collect();
        for amount in &description.construction {
            let carried: u32 = ships
                .iter()
                .filter_map(|id| self.spacecraft.get(id))
                .map(|s| s.cargo.resource_quantity(amount.resource))
                .sum();
            if carried < amount.quantity {
                return Err(MarketError::MissingResources {
                    resource: amount.resource,
                    missing: amount.quantity - carried,
                });
            }
        }

        for amount in &description.construction {
            let mut remaining = amount.quantity;
            for id in &ships {
                if remaining == 0 {
                    break;
                }
                if let Some(ship) = self.spacecraft.get_mut(id) {
                    remaining -= ship.cargo.take_resources(amount.resource, remaining);
                }
            }
        }
        let cost = description.construction_cost;
        if let Some(c) = self.companies.get_mut(&company) {
            c.take_money(cost);
        }
        if let Some(s) = self.sectors.get_mut(&sector) {
            s.people.pay(cost);
        }
        let station = self
            .create_spacecraft(catalog, station_type, company, sector)
            .map_err(|_| MarketError::UnknownSector(sector))?;
        info!(%company, %sector, station = %station, kind = %description.identifier, "station built");
        Ok(station)
    }
}
