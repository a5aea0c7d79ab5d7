//! Daily sector price drift.
//!
//! Each resource drifts toward a target set by how full the sector's
//! trading stations are: empty bays push the price to its maximum, full bays
//! to its minimum. Variation writes the `next` table; `swap_prices`
//! publishes it, so nothing reads a half-updated table.

use sim_core::market::{station_accepts, station_offers};
use sim_core::{Catalog, ResourceId, SectorId, World};
use tracing::trace;

/// Fraction of the gap to the target closed each day.
const DAILY_STEP_DIVISOR: i64 = 10;

/// Stock and total room of `resource` among stations trading it in a sector.
fn sector_fill(
    world: &World,
    catalog: &Catalog,
    sector: SectorId,
    resource: ResourceId,
) -> Option<(u32, u32)> {
    let mut stock = 0u32;
    let mut room = 0u32;
    let mut traded = false;
    for station in world.sector_stations(sector) {
        if !station_offers(station, resource) && !station_accepts(catalog, station, resource) {
            continue;
        }
        traded = true;
        let quantity = station.cargo.resource_quantity(resource);
        stock = stock.saturating_add(quantity);
        room = room.saturating_add(quantity + station.cargo.free_space_for_resource(resource));
    }
    traded.then_some((stock, room))
}

/// Price the sector should settle at for the given fill level.
pub fn target_price(
    min_price: i64,
    max_price: i64,
    default_price: i64,
    fill: Option<(u32, u32)>,
) -> i64 {
    match fill {
        Some((stock, room)) if room > 0 => {
            let ratio = f64::from(stock) / f64::from(room);
            max_price - ((max_price - min_price) as f64 * ratio) as i64
        }
        _ => default_price,
    }
}

/// One day of movement from `current` toward `target`, clamped to the
/// resource's price range. Always moves at least one unit while a gap
/// remains.
pub fn step_toward(current: i64, target: i64, min_price: i64, max_price: i64) -> i64 {
    let gap = target - current;
    let mut step = gap / DAILY_STEP_DIVISOR;
    if step == 0 {
        step = gap.signum();
    }
    (current + step).clamp(min_price, max_price)
}

/// Compute tomorrow's prices of every sector into its `next` table.
pub fn simulate_price_variation(world: &mut World, catalog: &Catalog) {
    let sector_ids: Vec<SectorId> = world.sectors.keys().copied().collect();
    for sector_id in sector_ids {
        let mut next = Vec::with_capacity(catalog.resources.len());
        for description in &catalog.resources {
            let fill = sector_fill(world, catalog, sector_id, description.id);
            let current = world
                .sectors
                .get(&sector_id)
                .map_or(description.default_price, |s| s.base_price(catalog, description.id));
            let target = target_price(
                description.min_price,
                description.max_price,
                description.default_price,
                fill,
            );
            next.push((
                description.id,
                step_toward(current, target, description.min_price, description.max_price),
            ));
        }
        if let Some(sector) = world.sectors.get_mut(&sector_id) {
            for (resource, price) in next {
                sector.prices.next.insert(resource, price);
            }
            trace!(sector = %sector_id, "prices varied");
        }
    }
}

/// Publish the prices computed by the last variation pass.
pub fn swap_prices(world: &mut World) {
    for sector in world.sectors.values_mut() {
        sector.prices.swap();
    }
}

/// Mean current price of a resource over all sectors.
pub fn mean_price(world: &World, catalog: &Catalog, resource: ResourceId) -> i64 {
    if world.sectors.is_empty() {
        return catalog.resource(resource).map_or(0, |r| r.default_price);
    }
    let total: i64 = world
        .sectors
        .values()
        .map(|s| s.base_price(catalog, resource))
        .sum();
    total / world.sectors.len() as i64
}
