//! Ordering cargo ships when trade and construction run short of hulls.

use crate::config::AiConfig;
use sim_core::{
    spacecraft_price, Capabilities, Catalog, CompanyId, SpacecraftId, SpacecraftTypeId, World,
};
use tracing::{debug, info};

/// Order the largest cargo ship some free shipyard can build and the company
/// can comfortably pay for. At most one order a day.
pub fn order_cargo_ships(
    world: &mut World,
    catalog: &Catalog,
    config: &AiConfig,
    company: CompanyId,
) -> Option<(SpacecraftId, SpacecraftTypeId)> {
    let c = world.companies.get(&company)?;
    let money = c.money;

    let mut choice: Option<(SpacecraftId, SpacecraftTypeId, u32)> = None;
    for &sector in &c.known_sectors {
        for station in world.sector_stations(sector) {
            if world.are_at_war(company, station.company) {
                continue;
            }
            let Some(size) = station
                .factories
                .iter()
                .filter(|f| f.active && f.is_free_shipyard())
                .filter_map(|f| f.shipyard_size())
                .max()
            else {
                continue;
            };
            for ship in catalog.ships() {
                if !ship.capabilities.contains(Capabilities::CARGO) || ship.size > size {
                    continue;
                }
                let price = spacecraft_price(catalog, ship.id);
                if price.saturating_mul(config.ship_price_margin) >= money {
                    continue;
                }
                let capacity = ship.cargo_capacity();
                if choice.map_or(true, |(_, _, best)| capacity > best) {
                    choice = Some((station.id, ship.id, capacity));
                }
            }
        }
    }

    let (station, ship_type, _) = choice?;
    match world.order_ship(catalog, company, station, ship_type) {
        Ok(()) => {
            info!(%company, shipyard = %station, kind = %ship_type, "cargo ship ordered");
            Some((station, ship_type))
        }
        Err(err) => {
            debug!(%company, shipyard = %station, %err, "ship order refused");
            None
        }
    }
}
