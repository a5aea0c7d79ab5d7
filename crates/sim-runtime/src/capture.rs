//! Transfer of harpooned ships and besieged stations to their captors.

use serde::Serialize;
use sim_core::{BattleState, Catalog, CompanyId, SectorId, SpacecraftId, World};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub sector: SectorId,
    /// Identity destroyed by the transfer.
    pub original: SpacecraftId,
    /// Identity the captor received.
    pub replacement: SpacecraftId,
    pub from: CompanyId,
    pub to: CompanyId,
    pub station: bool,
}

/// Recreate a docked spacecraft under `captor` with the same type, cargo and
/// placement, then destroy the original.
///
/// Nothing happens unless the spacecraft sits in a sector and the captor
/// exists.
pub fn transfer_spacecraft(
    world: &mut World,
    catalog: &Catalog,
    spacecraft: SpacecraftId,
    captor: CompanyId,
) -> Option<Capture> {
    let original = world.spacecraft.get(&spacecraft)?;
    let sector = original.sector?;
    if !world.companies.contains_key(&captor) || catalog.spacecraft(original.type_id).is_none() {
        return None;
    }
    let from = original.company;
    let station = original.is_station();

    let removed = world.destroy_spacecraft(spacecraft)?;
    let replacement = world
        .create_spacecraft(catalog, removed.type_id, captor, sector)
        .ok()?;
    if let Some(s) = world.spacecraft.get_mut(&replacement) {
        s.cargo = removed.cargo;
        s.location = removed.location;
        s.rotation = removed.rotation;
        s.disabled = removed.disabled;
    }
    info!(
        %sector,
        original = %spacecraft,
        %replacement,
        %from,
        to = %captor,
        station,
        "spacecraft captured"
    );
    Some(Capture {
        sector,
        original: spacecraft,
        replacement,
        from,
        to: captor,
        station,
    })
}

/// Capture every harpooned ship whose harpoon owner is at war with the ship's
/// company and alone with military strength in the sector. Other harpoons are
/// cleared.
pub fn process_ship_captures(world: &mut World, catalog: &Catalog) -> Vec<Capture> {
    let mut pending = Vec::new();
    let mut released = Vec::new();
    for (&sector_id, sector) in &world.sectors {
        for ship in sector.ships.iter().filter_map(|id| world.spacecraft.get(id)) {
            let Some(owner) = ship.harpooned_by else {
                continue;
            };
            if world.are_at_war(owner, ship.company)
                && world.battle_state(sector_id, owner) == BattleState::BattleWon
            {
                pending.push((ship.id, owner));
            } else {
                released.push(ship.id);
            }
        }
    }
    for ship in released {
        if let Some(s) = world.spacecraft.get_mut(&ship) {
            s.harpooned_by = None;
            debug!(%ship, "harpoon released");
        }
    }
    pending
        .into_iter()
        .filter_map(|(ship, owner)| transfer_spacecraft(world, catalog, ship, owner))
        .collect()
}

/// Advance station sieges: while a station's owner is losing the sector,
/// every hostile company that won it adds its capture points; the first to
/// reach the station's resistance takes it. Sieges reset otherwise.
pub fn process_station_captures(world: &mut World, catalog: &Catalog) -> Vec<Capture> {
    let companies: Vec<CompanyId> = world.companies.keys().copied().collect();
    let stations: Vec<(SectorId, SpacecraftId)> = world
        .sectors
        .iter()
        .flat_map(|(&sector, s)| s.stations.iter().map(move |&id| (sector, id)))
        .collect();

    let mut pending = Vec::new();
    for (sector, station_id) in stations {
        let Some(station) = world.spacecraft.get(&station_id) else {
            continue;
        };
        let owner = station.company;
        let resistance = catalog
            .spacecraft(station.type_id)
            .map_or(0, |d| d.capture_resistance);

        if !world.battle_state(sector, owner).is_lost() {
            if let Some(s) = world.spacecraft.get_mut(&station_id) {
                s.capture_points.clear();
            }
            continue;
        }

        for &company in &companies {
            let besieging = world.are_at_war(company, owner)
                && world.battle_state(sector, company) == BattleState::BattleWon;
            let points = world.company_capture_points(sector, company);
            let Some(s) = world.spacecraft.get_mut(&station_id) else {
                break;
            };
            if !besieging {
                s.reset_capture(company);
                continue;
            }
            let captured = s.try_capture(company, points, resistance);
            debug!(
                station = %station_id,
                %company,
                progress = s.capture_points.get(&company).copied().unwrap_or(0),
                resistance,
                "siege progress"
            );
            if captured {
                pending.push((station_id, company));
                break;
            }
        }
    }

    pending
        .into_iter()
        .filter_map(|(station, captor)| transfer_spacecraft(world, catalog, station, captor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::Controller;

    struct Fixture {
        world: World,
        catalog: Catalog,
        raider: CompanyId,
        victim: CompanyId,
        sector: SectorId,
    }

    fn fixture() -> Fixture {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let raider = world.add_company("raider", "Raider", 0, Controller::Ai);
        let victim = world.add_company("victim", "Victim", 0, Controller::Ai);
        let sector = world.add_sector(&catalog, "s", "S", 0, 1.0);
        let ghoul = catalog.find_spacecraft("ship-ghoul").unwrap();
        world.create_spacecraft(&catalog, ghoul, raider, sector).unwrap();
        world
            .companies
            .get_mut(&raider)
            .unwrap()
            .set_hostility_to(victim, true);
        Fixture {
            world,
            catalog,
            raider,
            victim,
            sector,
        }
    }

    #[test]
    fn harpooned_ship_changes_hands_with_its_cargo() {
        let mut f = fixture();
        let omen = f.catalog.find_spacecraft("ship-omen").unwrap();
        let water = f.catalog.find_resource("water").unwrap();
        let ship = f.world.create_spacecraft(&f.catalog, omen, f.victim, f.sector).unwrap();
        {
            let s = f.world.spacecraft.get_mut(&ship).unwrap();
            s.cargo.give_resources(water, 30);
            s.harpooned_by = Some(f.raider);
        }

        let captures = process_ship_captures(&mut f.world, &f.catalog);
        assert_eq!(captures.len(), 1);
        let capture = &captures[0];
        assert_eq!((capture.from, capture.to), (f.victim, f.raider));
        assert!(!f.world.spacecraft.contains_key(&ship));
        let new = &f.world.spacecraft[&capture.replacement];
        assert_eq!(new.company, f.raider);
        assert_eq!(new.cargo.resource_quantity(water), 30);
        assert!(new.harpooned_by.is_none());
        assert_eq!(f.world.company_ships(f.victim).count(), 0);
    }

    #[test]
    fn harpoon_clears_without_a_war_won() {
        let mut f = fixture();
        let omen = f.catalog.find_spacecraft("ship-omen").unwrap();
        let ship = f.world.create_spacecraft(&f.catalog, omen, f.victim, f.sector).unwrap();
        f.world.spacecraft.get_mut(&ship).unwrap().harpooned_by = Some(f.raider);
        f.world
            .companies
            .get_mut(&f.raider)
            .unwrap()
            .set_hostility_to(f.victim, false);

        assert!(process_ship_captures(&mut f.world, &f.catalog).is_empty());
        assert_eq!(f.world.spacecraft[&ship].company, f.victim);
        assert!(f.world.spacecraft[&ship].harpooned_by.is_none());
    }

    #[test]
    fn harpoon_clears_while_the_enemy_still_fights() {
        let mut f = fixture();
        let omen = f.catalog.find_spacecraft("ship-omen").unwrap();
        let ghoul = f.catalog.find_spacecraft("ship-ghoul").unwrap();
        let ship = f.world.create_spacecraft(&f.catalog, omen, f.victim, f.sector).unwrap();
        f.world.create_spacecraft(&f.catalog, ghoul, f.victim, f.sector).unwrap();
        f.world.spacecraft.get_mut(&ship).unwrap().harpooned_by = Some(f.raider);

        assert!(process_ship_captures(&mut f.world, &f.catalog).is_empty());
        assert!(f.world.spacecraft[&ship].harpooned_by.is_none());
    }

    #[test]
    fn station_falls_once_the_siege_reaches_its_resistance() {
        let mut f = fixture();
        let mine = f.catalog.find_spacecraft("station-ice-mine").unwrap();
        let station = f.world.create_spacecraft(&f.catalog, mine, f.victim, f.sector).unwrap();

        // one ghoul brings 10 points a day against a resistance of 100
        for day in 1..10 {
            assert!(process_station_captures(&mut f.world, &f.catalog).is_empty());
            assert_eq!(
                f.world.spacecraft[&station].capture_points[&f.raider],
                10 * day
            );
        }
        let captures = process_station_captures(&mut f.world, &f.catalog);
        assert_eq!(captures.len(), 1);
        assert!(captures[0].station);
        assert_eq!(f.world.spacecraft[&captures[0].replacement].company, f.raider);
        assert_eq!(f.world.company_stations(f.victim).count(), 0);
    }

    #[test]
    fn siege_resets_when_the_owner_recovers() {
        let mut f = fixture();
        let mine = f.catalog.find_spacecraft("station-ice-mine").unwrap();
        let ghoul = f.catalog.find_spacecraft("ship-ghoul").unwrap();
        let station = f.world.create_spacecraft(&f.catalog, mine, f.victim, f.sector).unwrap();
        process_station_captures(&mut f.world, &f.catalog);
        assert_eq!(f.world.spacecraft[&station].capture_points[&f.raider], 10);

        f.world.create_spacecraft(&f.catalog, ghoul, f.victim, f.sector).unwrap();
        process_station_captures(&mut f.world, &f.catalog);
        assert!(f.world.spacecraft[&station].capture_points.is_empty());
    }
}
