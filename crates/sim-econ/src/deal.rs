//! Two-sector arbitrage search for a single cargo ship.

use crate::forecast::{ResourceVariation, WorldVariation};
use serde::{Deserialize, Serialize};
use sim_core::{
    travel_duration, Catalog, PriceContext, ResourceId, SectorId, SpacecraftId, World,
};

/// How the deal finder values trades with the evaluating company's own
/// stations relative to market prices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeValuation {
    /// Multiplier on the default price when delivering to an own station.
    pub owned_sell_bonus: f64,
    /// Multiplier on the default price when collecting from an own station.
    pub owned_buy_discount: f64,
}

impl Default for TradeValuation {
    fn default() -> Self {
        Self {
            owned_sell_bonus: 1.1,
            owned_buy_discount: 0.9,
        }
    }
}

/// Buy `buy_quantity` of `resource` in `sector_a`, sell in `sector_b`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Deal {
    pub resource: ResourceId,
    pub sector_a: SectorId,
    pub sector_b: SectorId,
    pub buy_quantity: u32,
    /// Expected profit per day of the round, in hundredths of a credit.
    pub money_balance_per_day: f64,
}

/// Value of `quantity` spread over consecutive `(room, unit price)` buckets.
fn fill_buckets(quantity: i64, buckets: &[(i64, f64)]) -> f64 {
    let mut remaining = quantity;
    let mut value = 0.0;
    for &(room, price) in buckets {
        if remaining <= 0 {
            break;
        }
        let part = remaining.min(room.max(0));
        value += part as f64 * price;
        remaining -= part;
    }
    value
}

/// Find a better deal than `deal_to_beat` for `ship` buying in `sector_a`.
///
/// Every sector the ship's company knows is tried as the selling side,
/// `sector_a` included (buy and sell locally, charged one day). Returns
/// `None` when nothing strictly beats the balance per day of `deal_to_beat`,
/// or a balance of zero without one.
pub fn find_best_deal(
    world: &World,
    catalog: &Catalog,
    valuation: &TradeValuation,
    ship_id: SpacecraftId,
    sector_a: SectorId,
    deal_to_beat: Option<&Deal>,
    variations: &WorldVariation,
) -> Option<Deal> {
    let ship = world.spacecraft.get(&ship_id)?;
    let ship_sector = ship.sector?;
    let company = world.companies.get(&ship.company)?;
    let variation_a = variations.get(&sector_a)?;
    let market_a = world.sectors.get(&sector_a)?;

    let mut best: Option<Deal> = None;
    let mut best_balance = deal_to_beat.map_or(0.0, |d| d.money_balance_per_day);

    for &sector_b in &company.known_sectors {
        let (Some(variation_b), Some(market_b)) =
            (variations.get(&sector_b), world.sectors.get(&sector_b))
        else {
            continue;
        };
        let (to_a, to_b) = if sector_a == sector_b {
            (1, 0)
        } else {
            (
                travel_duration(world, ship_sector, sector_a),
                travel_duration(world, sector_a, sector_b),
            )
        };
        let total = to_a + to_b;
        if total <= 0 {
            continue;
        }

        for resource in catalog.resource_ids() {
            let a: ResourceVariation = variation_a.resource(resource);
            let b: ResourceVariation = variation_b.resource(resource);
            if a.is_empty() && b.is_empty() {
                continue;
            }

            let initial = i64::from(ship.cargo.resource_quantity(resource));
            let free = i64::from(ship.cargo.free_space_for_resource(resource));

            let stock_a = a.total_stock() - a.total_flow() * to_a;
            if stock_a <= 0 && initial == 0 {
                continue;
            }
            let can_buy = free.min(stock_a.max(0));
            let capacity_b = b.total_capacity() + b.total_flow() * total - b.incoming_resources;
            let sell = capacity_b.min(can_buy + initial).max(0);
            let buy = (sell - initial).max(0);
            if sell == 0 {
                continue;
            }

            let default_b = market_b.resource_price(catalog, resource, PriceContext::Default) as f64;
            let gain = fill_buckets(
                sell,
                &[
                    (
                        b.owned_capacity + b.owned_flow * total,
                        default_b * valuation.owned_sell_bonus,
                    ),
                    (
                        b.factory_capacity + b.factory_flow * total,
                        market_b.resource_price(catalog, resource, PriceContext::FactoryInput) as f64,
                    ),
                    (b.storage_capacity, default_b),
                ],
            );

            let default_a = market_a.resource_price(catalog, resource, PriceContext::Default) as f64;
            let spend = fill_buckets(
                buy,
                &[
                    (
                        a.owned_stock - a.owned_flow * to_a,
                        default_a * valuation.owned_buy_discount,
                    ),
                    (
                        a.factory_stock - a.factory_flow * to_a,
                        market_a.resource_price(catalog, resource, PriceContext::FactoryOutput) as f64,
                    ),
                    (a.storage_stock, default_a),
                ],
            );

            let balance = (gain - spend) / total as f64;
            if balance > best_balance {
                best_balance = balance;
                best = Some(Deal {
                    resource,
                    sector_a,
                    sector_b,
                    buy_quantity: u32::try_from(buy).unwrap_or(u32::MAX),
                    money_balance_per_day: balance,
                });
            }
        }
    }
    best
}
