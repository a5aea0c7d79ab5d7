//! Sector population: consumer demand, savings and debt.

use crate::catalog::{Capabilities, Catalog};
use crate::ids::{ResourceId, SpacecraftId};
use crate::sector::PriceContext;
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Days of consumption the population tries to keep in stock.
const STOCK_DAYS: u32 = 2;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct People {
    pub population: u32,
    /// Savings in hundredths of a credit.
    pub money: i64,
    /// Purchases made beyond savings.
    pub dept: i64,
    pub stock: BTreeMap<ResourceId, u32>,
}

impl People {
    pub fn new(population: u32, money: i64) -> Self {
        Self {
            population,
            money,
            ..Self::default()
        }
    }

    /// Daily consumption of one resource.
    pub fn resource_consumption(&self, catalog: &Catalog, resource: ResourceId) -> u32 {
        let rate = catalog.resource(resource).map_or(0, |r| r.consumer_rate);
        ((self.population as u64 * rate as u64) / 1000) as u32
    }

    /// Receive money; outstanding debt is repaid first.
    pub fn pay(&mut self, amount: i64) {
        let amount = amount.max(0);
        let repaid = self.dept.min(amount);
        self.dept -= repaid;
        self.money += amount - repaid;
    }

    pub fn take_money(&mut self, amount: i64) -> bool {
        if amount < 0 || amount > self.money {
            return false;
        }
        self.money -= amount;
        true
    }

    /// Pay for goods, going into debt when savings run out.
    pub fn spend(&mut self, amount: i64) {
        let amount = amount.max(0);
        let from_savings = self.money.min(amount);
        self.money -= from_savings;
        self.dept += amount - from_savings;
    }

    /// Savings per inhabitant.
    pub fn wealth(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.money as f64 / self.population as f64
        }
    }

    pub fn stock_of(&self, resource: ResourceId) -> u32 {
        self.stock.get(&resource).copied().unwrap_or(0)
    }
}

impl World {
    /// Populations buy consumer goods from local consumer stations and consume them.
    pub fn simulate_people(&mut self, catalog: &Catalog) {
        let consumer_resources = catalog.consumer_resources();
        let sector_ids: Vec<_> = self.sectors.keys().copied().collect();
        for sector_id in sector_ids {
            let stations: Vec<SpacecraftId> = self.sectors[&sector_id]
                .stations
                .iter()
                .copied()
                .filter(|id| {
                    self.spacecraft
                        .get(id)
                        .is_some_and(|s| s.has(Capabilities::CONSUMER))
                })
                .collect();
            for &resource in &consumer_resources {
                let Some(sector) = self.sectors.get_mut(&sector_id) else {
                    continue;
                };
                let need = sector.people.resource_consumption(catalog, resource);
                if need == 0 {
                    continue;
                }
                let price = sector.resource_price(catalog, resource, PriceContext::Default);
                let mut to_buy = (need * STOCK_DAYS).saturating_sub(sector.people.stock_of(resource));
                for station_id in &stations {
                    if to_buy == 0 {
                        break;
                    }
                    let Some(station) = self.spacecraft.get_mut(station_id) else {
                        continue;
                    };
                    let bought = station.cargo.take_resources(resource, to_buy);
                    if bought == 0 {
                        continue;
                    }
                    let cost = bought as i64 * price;
                    sector.people.spend(cost);
                    if let Some(owner) = self.companies.get_mut(&station.company) {
                        owner.give_money(cost);
                    }
                    *sector.people.stock.entry(resource).or_insert(0) += bought;
                    to_buy -= bought;
                }
                let stock = sector.people.stock.entry(resource).or_insert(0);
                let consumed = (*stock).min(need);
                *stock -= consumed;
                if consumed < need {
                    debug!(sector = %sector_id, %resource, need, consumed, "population short of supply");
                }
                self.consumption.record(resource, consumed);
            }
        }
    }
}
