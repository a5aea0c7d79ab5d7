//! Player-defined haul loops.

use crate::catalog::Catalog;
use crate::ids::{CompanyId, FleetId, ResourceId, SectorId, TradeRouteId};
use crate::world::World;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRouteStep {
    pub sector: SectorId,
    pub unload: Vec<ResourceId>,
    pub load: Vec<ResourceId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeRoute {
    pub id: TradeRouteId,
    pub name: String,
    pub company: CompanyId,
    pub fleet: Option<FleetId>,
    pub steps: Vec<TradeRouteStep>,
    pub current_step: usize,
    pub paused: bool,
}

impl World {
    pub fn create_trade_route(
        &mut self,
        company: CompanyId,
        name: &str,
        steps: Vec<TradeRouteStep>,
    ) -> TradeRouteId {
        let id = TradeRouteId(self.ids.allocate());
        self.trade_routes.insert(
            id,
            TradeRoute {
                id,
                name: name.to_string(),
                company,
                fleet: None,
                steps,
                current_step: 0,
                paused: false,
            },
        );
        if let Some(c) = self.companies.get_mut(&company) {
            c.trade_routes.insert(id);
        }
        id
    }

    /// Put a fleet of the route's company on the route.
    pub fn assign_trade_route_fleet(&mut self, route: TradeRouteId, fleet: FleetId) -> bool {
        let Some(company) = self.trade_routes.get(&route).map(|r| r.company) else {
            return false;
        };
        let Some(ships) = self
            .fleets
            .get(&fleet)
            .filter(|f| f.company == company)
            .map(|f| f.ships.clone())
        else {
            return false;
        };
        for ship in ships {
            if let Some(s) = self.spacecraft.get_mut(&ship) {
                s.trade_route = Some(route);
                s.assigned_to_sector = None;
            }
        }
        if let Some(r) = self.trade_routes.get_mut(&route) {
            r.fleet = Some(fleet);
        }
        true
    }

    /// Advance every active route: a fleet at its current step unloads, loads,
    /// then departs for the next step.
    pub fn simulate_trade_routes(&mut self, catalog: &Catalog) {
        let routes: Vec<TradeRouteId> = self.trade_routes.keys().copied().collect();
        for route_id in routes {
            let Some(route) = self.trade_routes.get(&route_id) else {
                continue;
            };
            if route.paused || route.steps.is_empty() {
                continue;
            }
            let Some(fleet_id) = route.fleet else {
                continue;
            };
            let Some(fleet) = self.fleets.get(&fleet_id) else {
                continue;
            };
            let Some(sector) = fleet.sector else {
                continue;
            };
            let index = route.current_step % route.steps.len();
            let step = route.steps[index].clone();
            let step_count = route.steps.len();
            let ships = fleet.ships.clone();

            if sector != step.sector {
                if let Err(err) = self.start_travel(fleet_id, step.sector) {
                    debug!(route = %route_id, %err, "trade route fleet cannot leave");
                }
                continue;
            }
            for ship in &ships {
                for resource in &step.unload {
                    self.give_resources(catalog, *ship, *resource, u32::MAX);
                }
                for resource in &step.load {
                    self.load_resources(catalog, *ship, *resource, u32::MAX);
                }
            }
            let next = (index + 1) % step_count;
            if let Some(r) = self.trade_routes.get_mut(&route_id) {
                r.current_step = next;
            }
            let next_sector = self
                .trade_routes
                .get(&route_id)
                .map(|r| r.steps[next].sector);
            if let Some(next_sector) = next_sector.filter(|s| *s != sector) {
                if let Err(err) = self.start_travel(fleet_id, next_sector) {
                    debug!(route = %route_id, %err, "trade route fleet cannot leave");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::Controller;

    #[test]
    fn fleet_loads_then_departs() {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let company = world.add_company("haul", "Haul", 0, Controller::Human);
        let a = world.add_sector(&catalog, "a", "A", 0, 1.0);
        let b = world.add_sector(&catalog, "b", "B", 500, 1.0);
        let water = catalog.find_resource("water").unwrap();
        let mine = catalog.find_spacecraft("station-ice-mine").unwrap();
        let omen = catalog.find_spacecraft("ship-omen").unwrap();
        let station = world.create_spacecraft(&catalog, mine, company, a).unwrap();
        world
            .spacecraft
            .get_mut(&station)
            .unwrap()
            .cargo
            .give_resources(water, 500);
        let ship = world.create_spacecraft(&catalog, omen, company, a).unwrap();
        let fleet = world.spacecraft[&ship].fleet.unwrap();
        let route = world.create_trade_route(
            company,
            "water run",
            vec![
                TradeRouteStep {
                    sector: a,
                    unload: vec![],
                    load: vec![water],
                },
                TradeRouteStep {
                    sector: b,
                    unload: vec![water],
                    load: vec![],
                },
            ],
        );
        assert!(world.assign_trade_route_fleet(route, fleet));

        world.simulate_trade_routes(&catalog);
        assert_eq!(world.spacecraft[&ship].cargo.resource_quantity(water), 100);
        assert!(world.fleets[&fleet].is_traveling());
        assert_eq!(world.trade_routes[&route].current_step, 1);
    }
}
