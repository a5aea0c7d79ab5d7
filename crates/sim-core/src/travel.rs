//! Fleet travel between sectors.

use crate::ids::{FleetId, SectorId, SpacecraftId, TravelId};
use crate::world::World;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Orbit distance covered per day, beyond the first day of any trip.
const DISTANCE_PER_DAY: i64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TravelError {
    #[error("unknown fleet {0}")]
    UnknownFleet(FleetId),
    #[error("unknown sector {0}")]
    UnknownSector(SectorId),
    #[error("fleet is already in the destination sector")]
    SameSector,
    #[error("every ship of fleet {0} is disabled")]
    Immobilized(FleetId),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Travel {
    pub id: TravelId,
    pub fleet: FleetId,
    pub origin: SectorId,
    pub destination: SectorId,
    pub departure_date: i64,
    /// Total trip length in days.
    pub duration: i64,
}

impl Travel {
    /// Days left before arrival, never negative.
    pub fn remaining(&self, date: i64) -> i64 {
        (self.departure_date + self.duration - date).max(0)
    }

    pub fn arrival_date(&self) -> i64 {
        self.departure_date + self.duration
    }
}

/// Days needed to go from `from` to `to`; zero when they are the same sector.
pub fn travel_duration(world: &World, from: SectorId, to: SectorId) -> i64 {
    if from == to {
        return 0;
    }
    let orbit = |s: SectorId| world.sectors.get(&s).map_or(0, |s| s.orbit_distance);
    1 + (orbit(from) - orbit(to)).abs() / DISTANCE_PER_DAY
}

impl World {
    /// Send a fleet toward `destination`, redirecting it if already travelling.
    ///
    /// Disabled ships cannot leave; they are split into a fleet of their own
    /// and stay behind.
    pub fn start_travel(
        &mut self,
        fleet_id: FleetId,
        destination: SectorId,
    ) -> Result<TravelId, TravelError> {
        if !self.sectors.contains_key(&destination) {
            return Err(TravelError::UnknownSector(destination));
        }
        let fleet = self
            .fleets
            .get(&fleet_id)
            .ok_or(TravelError::UnknownFleet(fleet_id))?;

        if let Some(travel_id) = fleet.travel {
            let origin = self
                .travels
                .get(&travel_id)
                .map(|t| t.origin)
                .ok_or(TravelError::UnknownFleet(fleet_id))?;
            let duration = travel_duration(self, origin, destination).max(1);
            if let Some(travel) = self.travels.get_mut(&travel_id) {
                travel.destination = destination;
                travel.duration = duration;
            }
            debug!(fleet = %fleet_id, %destination, "travel redirected");
            return Ok(travel_id);
        }

        let origin = fleet.sector.ok_or(TravelError::UnknownFleet(fleet_id))?;
        if origin == destination {
            return Err(TravelError::SameSector);
        }
        let (disabled, mobile): (Vec<SpacecraftId>, Vec<SpacecraftId>) = fleet
            .ships
            .iter()
            .copied()
            .partition(|s| self.spacecraft.get(s).map_or(true, |s| s.disabled));
        if mobile.is_empty() {
            return Err(TravelError::Immobilized(fleet_id));
        }
        let company = fleet.company;
        if !disabled.is_empty() {
            if let Some(f) = self.fleets.get_mut(&fleet_id) {
                f.ships = mobile.clone();
            }
            for ship in &disabled {
                if let Some(s) = self.spacecraft.get_mut(ship) {
                    s.fleet = None;
                }
            }
            self.create_fleet(company, origin, disabled);
        }

        let travel_id = TravelId(self.ids.allocate());
        let duration = travel_duration(self, origin, destination);
        if let Some(sector) = self.sectors.get_mut(&origin) {
            sector.detach_fleet(fleet_id);
            for ship in &mobile {
                sector.detach(*ship);
            }
        }
        for ship in &mobile {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                s.sector = None;
                s.assigned_to_sector = None;
            }
        }
        if let Some(f) = self.fleets.get_mut(&fleet_id) {
            f.sector = None;
            f.travel = Some(travel_id);
        }
        self.travels.insert(
            travel_id,
            Travel {
                id: travel_id,
                fleet: fleet_id,
                origin,
                destination,
                departure_date: self.date,
                duration,
            },
        );
        debug!(fleet = %fleet_id, %origin, %destination, duration, "travel started");
        Ok(travel_id)
    }

    /// Land every fleet whose trip is over.
    pub fn simulate_travels(&mut self) {
        let arrived: Vec<TravelId> = self
            .travels
            .values()
            .filter(|t| t.remaining(self.date) == 0)
            .map(|t| t.id)
            .collect();
        for travel_id in arrived {
            self.end_travel(travel_id);
        }
    }

    pub(crate) fn end_travel(&mut self, travel_id: TravelId) {
        let Some(travel) = self.travels.remove(&travel_id) else {
            return;
        };
        let destination = travel.destination;
        let Some(fleet) = self.fleets.get_mut(&travel.fleet) else {
            return;
        };
        fleet.travel = None;
        fleet.sector = Some(destination);
        let company = fleet.company;
        let ships = fleet.ships.clone();
        for ship in &ships {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                s.sector = Some(destination);
            }
        }
        if let Some(sector) = self.sectors.get_mut(&destination) {
            sector.attach_fleet(travel.fleet);
            for ship in &ships {
                sector.attach(*ship, false);
            }
        }
        if let Some(c) = self.companies.get_mut(&company) {
            if !c.knows_sector(destination) {
                info!(%company, sector = %destination, "sector discovered");
            }
            c.discover_sector(destination);
        }
        debug!(fleet = %travel.fleet, %destination, "fleet arrived");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::company::Controller;

    fn setup() -> (World, FleetId, SpacecraftId, SectorId, SectorId) {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let company = world.add_company("haulers", "Haulers", 0, Controller::Ai);
        let a = world.add_sector(&catalog, "a", "A", 0, 1.0);
        let b = world.add_sector(&catalog, "b", "B", 1000, 1.0);
        let omen = catalog.find_spacecraft("ship-omen").unwrap();
        let ship = world.create_spacecraft(&catalog, omen, company, a).unwrap();
        let fleet = world.spacecraft[&ship].fleet.unwrap();
        (world, fleet, ship, a, b)
    }

    #[test]
    fn duration_grows_with_orbit_distance() {
        let (world, _, _, a, b) = setup();
        assert_eq!(travel_duration(&world, a, a), 0);
        assert_eq!(travel_duration(&world, a, b), 3);
        assert_eq!(travel_duration(&world, b, a), 3);
    }

    #[test]
    fn fleet_arrives_after_duration() {
        let (mut world, fleet, ship, a, b) = setup();
        let travel = world.start_travel(fleet, b).unwrap();
        assert_eq!(world.spacecraft[&ship].sector, None);
        assert!(world.sectors[&a].ships.is_empty());
        assert_eq!(world.travels[&travel].remaining(world.date), 3);

        for _ in 0..2 {
            world.date += 1;
            world.simulate_travels();
        }
        assert!(world.fleets[&fleet].is_traveling());
        world.date += 1;
        world.simulate_travels();
        assert_eq!(world.fleets[&fleet].sector, Some(b));
        assert_eq!(world.spacecraft[&ship].sector, Some(b));
        assert!(world.sectors[&b].ships.contains(&ship));
        assert!(world.travels.is_empty());
    }

    #[test]
    fn same_sector_travel_is_refused() {
        let (mut world, fleet, _, a, _) = setup();
        assert_eq!(world.start_travel(fleet, a), Err(TravelError::SameSector));
    }

    #[test]
    fn disabled_ships_stay_behind() {
        let (mut world, fleet, ship, a, b) = setup();
        world.spacecraft.get_mut(&ship).unwrap().disabled = true;
        assert_eq!(world.start_travel(fleet, b), Err(TravelError::Immobilized(fleet)));
        assert_eq!(world.spacecraft[&ship].sector, Some(a));
    }

    #[test]
    fn remaining_is_clamped() {
        let travel = Travel {
            id: TravelId(0),
            fleet: FleetId(0),
            origin: SectorId(0),
            destination: SectorId(1),
            departure_date: 10,
            duration: 3,
        };
        assert_eq!(travel.remaining(20), 0);
        assert_eq!(travel.arrival_date(), 13);
    }
}
