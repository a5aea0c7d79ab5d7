//! Fleets: groups of ships of one company that move together.
//!
//! Every operation validates all of its preconditions before touching the
//! world, so a rejected call leaves state unchanged.

use crate::ids::{CompanyId, FleetId, SectorId, SpacecraftId, TravelId};
use crate::world::World;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FleetError {
    #[error("unknown fleet {0}")]
    UnknownFleet(FleetId),
    #[error("unknown ship {0}")]
    UnknownShip(SpacecraftId),
    #[error("fleet {0} is travelling")]
    Traveling(FleetId),
    #[error("fleets belong to different companies")]
    CompanyMismatch,
    #[error("fleets or ships are in different sectors")]
    SectorMismatch,
    #[error("ship {0} is not part of fleet {1}")]
    NotInFleet(SpacecraftId, FleetId),
    #[error("ship {0} is already part of fleet {1}")]
    AlreadyInFleet(SpacecraftId, FleetId),
    #[error("cannot remove the last ship of fleet {0}")]
    LastShip(FleetId),
    #[error("stations cannot join fleets")]
    Station,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fleet {
    pub id: FleetId,
    pub name: String,
    pub company: CompanyId,
    pub ships: Vec<SpacecraftId>,
    /// Set while parked; exclusive with `travel`.
    pub sector: Option<SectorId>,
    pub travel: Option<TravelId>,
}

impl Fleet {
    pub fn is_traveling(&self) -> bool {
        self.travel.is_some()
    }
}

impl World {
    pub(crate) fn create_fleet(
        &mut self,
        company: CompanyId,
        sector: SectorId,
        ships: Vec<SpacecraftId>,
    ) -> FleetId {
        let id = FleetId(self.ids.allocate());
        for ship in &ships {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                s.fleet = Some(id);
            }
        }
        let name = format!("Fleet {}", id.0);
        self.fleets.insert(
            id,
            Fleet {
                id,
                name,
                company,
                ships,
                sector: Some(sector),
                travel: None,
            },
        );
        if let Some(c) = self.companies.get_mut(&company) {
            c.fleets.insert(id);
        }
        if let Some(s) = self.sectors.get_mut(&sector) {
            s.attach_fleet(id);
        }
        id
    }

    fn parked_fleet(&self, id: FleetId) -> Result<&Fleet, FleetError> {
        let fleet = self.fleets.get(&id).ok_or(FleetError::UnknownFleet(id))?;
        if fleet.is_traveling() {
            return Err(FleetError::Traveling(id));
        }
        Ok(fleet)
    }

    /// Move `ship` from its current fleet into `fleet`.
    pub fn add_ship(&mut self, fleet: FleetId, ship: SpacecraftId) -> Result<(), FleetError> {
        let target = self.parked_fleet(fleet)?;
        let s = self.spacecraft.get(&ship).ok_or(FleetError::UnknownShip(ship))?;
        if s.is_station() {
            return Err(FleetError::Station);
        }
        if s.company != target.company {
            return Err(FleetError::CompanyMismatch);
        }
        if s.fleet == Some(fleet) {
            return Err(FleetError::AlreadyInFleet(ship, fleet));
        }
        if let Some(current) = s.fleet {
            self.parked_fleet(current)?;
        }
        if s.sector.is_none() || s.sector != target.sector {
            return Err(FleetError::SectorMismatch);
        }

        let previous = s.fleet;
        if let Some(previous) = previous {
            self.detach_ship_from_fleet(previous, ship);
        }
        if let Some(f) = self.fleets.get_mut(&fleet) {
            f.ships.push(ship);
        }
        if let Some(s) = self.spacecraft.get_mut(&ship) {
            s.fleet = Some(fleet);
        }
        Ok(())
    }

    /// Split `ship` out of `fleet` into a new fleet of its own.
    pub fn remove_ship(&mut self, fleet: FleetId, ship: SpacecraftId) -> Result<FleetId, FleetError> {
        let source = self.parked_fleet(fleet)?;
        if !source.ships.contains(&ship) {
            return Err(FleetError::NotInFleet(ship, fleet));
        }
        if source.ships.len() == 1 {
            return Err(FleetError::LastShip(fleet));
        }
        let company = source.company;
        let sector = source.sector.ok_or(FleetError::SectorMismatch)?;
        self.detach_ship_from_fleet(fleet, ship);
        Ok(self.create_fleet(company, sector, vec![ship]))
    }

    /// Move every ship of `other` into `fleet` and dissolve `other`.
    pub fn merge(&mut self, fleet: FleetId, other: FleetId) -> Result<(), FleetError> {
        let target = self.parked_fleet(fleet)?;
        let source = self.parked_fleet(other)?;
        if fleet == other {
            return Ok(());
        }
        if target.company != source.company {
            return Err(FleetError::CompanyMismatch);
        }
        if target.sector != source.sector {
            return Err(FleetError::SectorMismatch);
        }
        let ships = source.ships.clone();
        for ship in &ships {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                s.fleet = Some(fleet);
            }
        }
        if let Some(f) = self.fleets.get_mut(&fleet) {
            f.ships.extend(ships);
        }
        if let Some(f) = self.fleets.get_mut(&other) {
            f.ships.clear();
        }
        self.dissolve_fleet(other);
        Ok(())
    }

    /// Give every ship but the first a fleet of its own.
    pub fn disband(&mut self, fleet: FleetId) -> Result<Vec<FleetId>, FleetError> {
        let source = self.parked_fleet(fleet)?;
        let sector = source.sector.ok_or(FleetError::SectorMismatch)?;
        let company = source.company;
        let others: Vec<SpacecraftId> = source.ships.iter().skip(1).copied().collect();
        let mut created = Vec::with_capacity(others.len());
        for ship in others {
            self.detach_ship_from_fleet(fleet, ship);
            created.push(self.create_fleet(company, sector, vec![ship]));
        }
        Ok(created)
    }

    /// Drop a fleet from every list referencing it. Ships left in it lose their fleet.
    pub fn dissolve_fleet(&mut self, id: FleetId) {
        let Some(fleet) = self.fleets.remove(&id) else {
            return;
        };
        if !fleet.ships.is_empty() {
            warn!(fleet = %id, ships = fleet.ships.len(), "dissolving a non-empty fleet");
        }
        for ship in &fleet.ships {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                s.fleet = None;
            }
        }
        if let Some(sector) = fleet.sector.and_then(|s| self.sectors.get_mut(&s)) {
            sector.detach_fleet(id);
        }
        if let Some(travel) = fleet.travel {
            self.travels.remove(&travel);
        }
        if let Some(company) = self.companies.get_mut(&fleet.company) {
            company.fleets.remove(&id);
        }
        for route in self.trade_routes.values_mut() {
            if route.fleet == Some(id) {
                route.fleet = None;
            }
        }
    }

    fn detach_ship_from_fleet(&mut self, fleet: FleetId, ship: SpacecraftId) {
        let now_empty = match self.fleets.get_mut(&fleet) {
            Some(f) => {
                f.ships.retain(|s| *s != ship);
                f.ships.is_empty()
            }
            None => false,
        };
        if let Some(s) = self.spacecraft.get_mut(&ship) {
            s.fleet = None;
        }
        if now_empty {
            self.dissolve_fleet(fleet);
        }
    }

    /// Put a fleet and its ships in `sector` without travelling.
    ///
    /// Used to repair fleets that ended up neither parked nor travelling.
    pub fn park_fleet(&mut self, fleet: FleetId, sector: SectorId) -> Result<(), FleetError> {
        let f = self.fleets.get(&fleet).ok_or(FleetError::UnknownFleet(fleet))?;
        if f.is_traveling() {
            return Err(FleetError::Traveling(fleet));
        }
        if !self.sectors.contains_key(&sector) {
            return Err(FleetError::SectorMismatch);
        }
        let ships = f.ships.clone();
        let previous = f.sector;
        if let Some(old) = previous.and_then(|s| self.sectors.get_mut(&s)) {
            old.detach_fleet(fleet);
            for ship in &ships {
                old.detach(*ship);
            }
        }
        for ship in &ships {
            if let Some(s) = self.spacecraft.get_mut(ship) {
                if let Some(old) = s.sector.filter(|&old| old != sector) {
                    if let Some(old) = self.sectors.get_mut(&old) {
                        old.detach(*ship);
                    }
                }
                s.sector = Some(sector);
            }
        }
        if let Some(s) = self.sectors.get_mut(&sector) {
            s.attach_fleet(fleet);
            for ship in &ships {
                s.attach(*ship, false);
            }
        }
        if let Some(f) = self.fleets.get_mut(&fleet) {
            f.sector = Some(sector);
        }
        Ok(())
    }

    /// Total cargo capacity of a fleet.
    pub fn fleet_cargo_capacity(&self, fleet: FleetId) -> u32 {
        self.fleets.get(&fleet).map_or(0, |f| {
            f.ships
                .iter()
                .filter_map(|s| self.spacecraft.get(s))
                .map(|s| s.cargo_capacity())
                .sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::company::Controller;

    struct Fixture {
        world: World,
        catalog: Catalog,
        company: CompanyId,
        a: SectorId,
        b: SectorId,
    }

    fn fixture() -> Fixture {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let company = world.add_company("haulers", "Haulers", 0, Controller::Ai);
        let a = world.add_sector(&catalog, "a", "A", 0, 1.0);
        let b = world.add_sector(&catalog, "b", "B", 1000, 1.0);
        Fixture {
            world,
            catalog,
            company,
            a,
            b,
        }
    }

    fn ship(f: &mut Fixture, sector: SectorId) -> (SpacecraftId, FleetId) {
        let omen = f.catalog.find_spacecraft("ship-omen").unwrap();
        let id = f
            .world
            .create_spacecraft(&f.catalog, omen, f.company, sector)
            .unwrap();
        (id, f.world.spacecraft[&id].fleet.unwrap())
    }

    #[test]
    fn add_ship_moves_between_fleets() {
        let mut f = fixture();
        let a = f.a;
        let (s1, f1) = ship(&mut f, a);
        let (s2, f2) = ship(&mut f, a);
        f.world.add_ship(f1, s2).unwrap();
        assert_eq!(f.world.fleets[&f1].ships, vec![s1, s2]);
        assert!(!f.world.fleets.contains_key(&f2));
        assert_eq!(f.world.spacecraft[&s2].fleet, Some(f1));
    }

    #[test]
    fn merge_across_sectors_fails_without_change() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        let (_, f1) = ship(&mut f, a);
        let (_, f2) = ship(&mut f, b);
        assert_eq!(f.world.merge(f1, f2), Err(FleetError::SectorMismatch));
        assert_eq!(f.world.fleets[&f1].ships.len(), 1);
        assert_eq!(f.world.fleets[&f2].ships.len(), 1);
    }

    #[test]
    fn traveling_fleets_reject_every_operation() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        let (s1, f1) = ship(&mut f, a);
        let (s2, f2) = ship(&mut f, a);
        f.world.merge(f1, f2).unwrap();
        let (s3, f3) = ship(&mut f, a);
        f.world.start_travel(f1, b).unwrap();
        let before = f.world.fleets[&f1].ships.clone();

        assert_eq!(f.world.add_ship(f1, s3), Err(FleetError::Traveling(f1)));
        assert_eq!(f.world.remove_ship(f1, s1), Err(FleetError::Traveling(f1)));
        assert_eq!(f.world.merge(f3, f1), Err(FleetError::Traveling(f1)));
        assert_eq!(f.world.disband(f1), Err(FleetError::Traveling(f1)));
        assert_eq!(f.world.fleets[&f1].ships, before);
        assert_eq!(f.world.spacecraft[&s2].fleet, Some(f1));
    }

    #[test]
    fn remove_and_disband_split_fleets() {
        let mut f = fixture();
        let a = f.a;
        let (s1, f1) = ship(&mut f, a);
        let (s2, f2) = ship(&mut f, a);
        let (s3, f3) = ship(&mut f, a);
        f.world.merge(f1, f2).unwrap();
        f.world.merge(f1, f3).unwrap();
        assert_eq!(f.world.fleets[&f1].ships, vec![s1, s2, s3]);

        let split = f.world.remove_ship(f1, s3).unwrap();
        assert_eq!(f.world.fleets[&split].ships, vec![s3]);
        assert_eq!(f.world.remove_ship(split, s3), Err(FleetError::LastShip(split)));

        let created = f.world.disband(f1).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(f.world.fleets[&f1].ships, vec![s1]);
        assert_eq!(f.world.spacecraft[&s2].fleet, Some(created[0]));
    }

    #[test]
    fn park_fleet_moves_ships_without_travel() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        let (s1, f1) = ship(&mut f, a);
        f.world.park_fleet(f1, b).unwrap();
        assert_eq!(f.world.fleets[&f1].sector, Some(b));
        assert_eq!(f.world.spacecraft[&s1].sector, Some(b));
        assert!(f.world.sectors[&b].ships.contains(&s1));
        assert!(f.world.sectors[&b].fleets.contains(&f1));
        assert!(!f.world.sectors[&a].ships.contains(&s1));
        assert!(!f.world.sectors[&a].fleets.contains(&f1));
    }
}
