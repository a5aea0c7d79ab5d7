//! Selling leftover cargo and sending idle ships after deals.

use crate::config::AiConfig;
use sim_core::{Catalog, CompanyId, ResourceId, SectorId, SpacecraftId, World};
use sim_econ::{find_best_deal, Deal, WorldVariation};
use tracing::{debug, info};

/// What the dispatcher did with the idle ships.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dispatch {
    /// Deals committed, one per ship.
    pub deals: Vec<(SpacecraftId, Deal)>,
    /// Ships that found nothing and joined the construction project.
    pub recruited: Vec<SpacecraftId>,
    /// Cargo capacity left with nothing to do.
    pub idle_capacity: i64,
}

/// Sell whatever the company's free cargo ships carry to the stations of
/// the sector they are docked in. Returns the units sold.
pub fn liquidate_cargo(world: &mut World, catalog: &Catalog, company: CompanyId) -> u32 {
    let Some(c) = world.companies.get(&company) else {
        return 0;
    };
    let ships: Vec<SpacecraftId> = c
        .known_sectors
        .iter()
        .flat_map(|&sector| world.sector_ships(sector))
        .filter(|s| {
            s.company == company
                && s.cargo_capacity() > 0
                && s.assigned_to_sector.is_none()
                && s.trade_route.is_none()
                && !c.ai.is_construction_ship(s.id)
        })
        .map(|s| s.id)
        .collect();

    let mut sold = 0;
    for ship in ships {
        let cargo: Vec<(ResourceId, u32)> = world
            .spacecraft
            .get(&ship)
            .map(|s| {
                s.cargo
                    .carried_resources()
                    .into_iter()
                    .map(|r| (r, s.cargo.resource_quantity(r)))
                    .collect()
            })
            .unwrap_or_default();
        for (resource, quantity) in cargo {
            sold += world.give_resources(catalog, ship, resource, quantity);
        }
    }
    sold
}

fn fleet_of(world: &World, ship: SpacecraftId) -> Option<sim_core::FleetId> {
    world.spacecraft.get(&ship).and_then(|s| s.fleet)
}

fn send(world: &mut World, ship: SpacecraftId, destination: SectorId) {
    let Some(fleet) = fleet_of(world, ship) else {
        return;
    };
    if let Err(err) = world.start_travel(fleet, destination) {
        debug!(%ship, %destination, %err, "cannot leave");
    }
}

/// Best deal over every candidate buying sector.
///
/// When the ship is elsewhere and cargo is already heading to the buying
/// sector, that capacity is booked against the sector's stock and the search
/// repeated, until the incoming capacity is used up or the deal stops
/// beating the best one.
fn best_deal_for_ship(
    world: &World,
    catalog: &Catalog,
    config: &AiConfig,
    company: CompanyId,
    ship: SpacecraftId,
    variations: &mut WorldVariation,
) -> Option<Deal> {
    let known: Vec<SectorId> = world
        .companies
        .get(&company)
        .map(|c| c.known_sectors.iter().copied().collect())
        .unwrap_or_default();
    let here = world.spacecraft.get(&ship).and_then(|s| s.sector);

    let mut best: Option<Deal> = None;
    for sector_a in known {
        let mut sector_best = None;
        loop {
            let candidate = find_best_deal(
                world,
                catalog,
                &config.valuation,
                ship,
                sector_a,
                best.as_ref(),
                variations,
            );
            let Some(deal) = candidate else {
                sector_best = None;
                break;
            };
            sector_best = Some(deal);
            let Some(variation_a) = variations.get_mut(&sector_a) else {
                break;
            };
            if here == Some(sector_a)
                || variation_a.incoming_capacity <= 0
                || deal.buy_quantity == 0
            {
                break;
            }
            let used = i64::from(deal.buy_quantity).min(variation_a.incoming_capacity);
            variation_a.incoming_capacity -= used;
            variation_a.resource_mut(deal.resource).owned_stock -= used;
        }
        if sector_best.is_some() {
            best = sector_best;
        }
    }
    best
}

/// Commit `deal` for `ship`: buy now when docked in the buying sector,
/// otherwise head there. The forecast is updated so later ships of the pass
/// see the stock and capacity already claimed.
fn execute_deal(
    world: &mut World,
    catalog: &Catalog,
    company: CompanyId,
    ship: SpacecraftId,
    deal: &Deal,
    variations: &mut WorldVariation,
) -> bool {
    let here = world.spacecraft.get(&ship).and_then(|s| s.sector);
    let wanted = i64::from(deal.buy_quantity);

    if here == Some(deal.sector_a) {
        let mut bought = world.take_useless_resources(
            catalog,
            company,
            deal.sector_a,
            deal.resource,
            deal.buy_quantity,
            false,
        );
        bought += world.take_useless_resources(
            catalog,
            company,
            deal.sector_a,
            deal.resource,
            deal.buy_quantity - bought,
            true,
        );
        if let Some(s) = world.spacecraft.get_mut(&ship) {
            s.cargo.give_resources(deal.resource, bought);
            if bought > 0 {
                s.trading = true;
            }
        }
        if bought != deal.buy_quantity {
            debug!(%ship, resource = %deal.resource, bought, wanted, "purchase fell short");
            if let Some(v) = variations.get_mut(&deal.sector_a) {
                v.resource_mut(deal.resource).forget_supply();
            }
            return false;
        }
        if deal.sector_b != deal.sector_a {
            send(world, ship, deal.sector_b);
        }
        if let Some(v) = variations.get_mut(&deal.sector_a) {
            v.resource_mut(deal.resource).owned_stock -= wanted;
        }
        if let Some(v) = variations.get_mut(&deal.sector_b) {
            v.incoming_capacity += wanted;
            v.resource_mut(deal.resource).owned_capacity -= wanted;
        }
    } else {
        send(world, ship, deal.sector_a);
        if let Some(v) = variations.get_mut(&deal.sector_a) {
            v.resource_mut(deal.resource).owned_stock -= wanted;
        }
        if let Some(v) = variations.get_mut(&deal.sector_b) {
            v.resource_mut(deal.resource).owned_capacity -= wanted;
        }
    }
    true
}

/// Find and commit a deal for every idle ship, in order.
///
/// Ships left without a deal join the construction project when there is
/// one, and otherwise count as idle capacity.
pub fn dispatch_idle_ships(
    world: &mut World,
    catalog: &Catalog,
    config: &AiConfig,
    company: CompanyId,
    idle: &[SpacecraftId],
    variations: &mut WorldVariation,
) -> Dispatch {
    let mut outcome = Dispatch::default();
    for &ship in idle {
        let docked = world
            .spacecraft
            .get(&ship)
            .is_some_and(|s| s.sector.is_some() && s.company == company);
        if !docked {
            continue;
        }
        match best_deal_for_ship(world, catalog, config, company, ship, variations) {
            Some(deal) => {
                info!(
                    %company,
                    %ship,
                    resource = %deal.resource,
                    from = %deal.sector_a,
                    to = %deal.sector_b,
                    quantity = deal.buy_quantity,
                    per_day = deal.money_balance_per_day / 100.0,
                    "deal committed"
                );
                if execute_deal(world, catalog, company, ship, &deal, variations) {
                    outcome.deals.push((ship, deal));
                }
            }
            None => {
                let has_project = world
                    .companies
                    .get(&company)
                    .is_some_and(|c| c.ai.construction_project.is_some());
                if has_project {
                    if let Some(c) = world.companies.get_mut(&company) {
                        c.ai.construction_ships.push(ship);
                    }
                    outcome.recruited.push(ship);
                } else {
                    outcome.idle_capacity += world
                        .spacecraft
                        .get(&ship)
                        .map_or(0, |s| i64::from(s.cargo_capacity()));
                }
                debug!(%company, %ship, "nothing to do");
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::Controller;
    use sim_econ::compute_world_variation;

    struct Fixture {
        world: World,
        catalog: Catalog,
        trader: CompanyId,
        a: SectorId,
        b: SectorId,
    }

    /// A third party's stocked ice mine in A and its water-hungry refinery
    /// in B, three days away.
    fn fixture() -> Fixture {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let trader = world.add_company("trader", "Trader", 10_000_000, Controller::Ai);
        let miner = world.add_company("miner", "Miner", 1_000_000, Controller::Ai);
        let a = world.add_sector(&catalog, "a", "A", 0, 1.0);
        let b = world.add_sector(&catalog, "b", "B", 1000, 1.0);
        for c in world.companies.values_mut() {
            c.discover_sector(a);
            c.discover_sector(b);
        }
        let water = catalog.find_resource("water").unwrap();
        let mine = catalog.find_spacecraft("station-ice-mine").unwrap();
        let refinery = catalog.find_spacecraft("station-refinery").unwrap();
        let m = world.create_spacecraft(&catalog, mine, miner, a).unwrap();
        world.spacecraft.get_mut(&m).unwrap().cargo.give_resources(water, 300);
        world.create_spacecraft(&catalog, refinery, miner, b).unwrap();
        Fixture {
            world,
            catalog,
            trader,
            a,
            b,
        }
    }

    fn omen(f: &mut Fixture, sector: SectorId) -> SpacecraftId {
        let omen = f.catalog.find_spacecraft("ship-omen").unwrap();
        f.world
            .create_spacecraft(&f.catalog, omen, f.trader, sector)
            .unwrap()
    }

    #[test]
    fn docked_ship_buys_then_leaves() {
        let mut f = fixture();
        let sector = f.a;
        let ship = omen(&mut f, sector);
        let water = f.catalog.find_resource("water").unwrap();
        let config = AiConfig::default();
        let mut variations = compute_world_variation(&f.world, &f.catalog, f.trader, 10);
        let before = f.world.companies[&f.trader].money;

        let outcome =
            dispatch_idle_ships(&mut f.world, &f.catalog, &config, f.trader, &[ship], &mut variations);
        assert_eq!(outcome.deals.len(), 1);
        let (_, deal) = outcome.deals[0];
        assert_eq!((deal.sector_a, deal.sector_b, deal.resource), (f.a, f.b, water));
        assert_eq!(deal.buy_quantity, 100);
        assert_eq!(f.world.spacecraft[&ship].cargo.resource_quantity(water), 100);
        assert!(f.world.spacecraft[&ship].sector.is_none());
        // paid the miner the factory output price
        assert_eq!(f.world.companies[&f.trader].money, before - 100 * 1150);
        let vb = variations[&f.b].resource(water);
        assert_eq!(vb.owned_capacity, -100);
        assert_eq!(variations[&f.b].incoming_capacity, 100);
    }

    #[test]
    fn reservations_keep_two_ships_off_the_same_stock() {
        let mut f = fixture();
        let water = f.catalog.find_resource("water").unwrap();
        // only 100 water left for the whole pass
        let mine = f.world.sectors[&f.a].stations[0];
        f.world.spacecraft.get_mut(&mine).unwrap().cargo.take_resources(water, 200);
        let sector = f.b;
        let first = omen(&mut f, sector);
        let sector = f.b;
        let second = omen(&mut f, sector);
        let config = AiConfig::default();
        let mut variations = compute_world_variation(&f.world, &f.catalog, f.trader, 10);

        let outcome = dispatch_idle_ships(
            &mut f.world,
            &f.catalog,
            &config,
            f.trader,
            &[first, second],
            &mut variations,
        );
        let committed: Vec<SpacecraftId> = outcome.deals.iter().map(|(s, _)| *s).collect();
        assert_eq!(committed, vec![first]);
        assert_eq!(outcome.idle_capacity, 100);
    }

    #[test]
    fn liquidation_sells_to_local_buyers() {
        let mut f = fixture();
        let water = f.catalog.find_resource("water").unwrap();
        let sector = f.b;
        let ship = omen(&mut f, sector);
        f.world.spacecraft.get_mut(&ship).unwrap().cargo.give_resources(water, 60);
        let sold = liquidate_cargo(&mut f.world, &f.catalog, f.trader);
        assert_eq!(sold, 60);
        assert!(f.world.spacecraft[&ship].cargo.is_empty());
    }
}
