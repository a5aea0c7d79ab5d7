//! Built-in starting world used by the CLI, benches and tests.

use crate::catalog::Catalog;
use crate::company::Controller;
use crate::config::SimConfig;
use crate::ids::{CompanyId, SectorId};
use crate::people::People;
use crate::world::{World, WorldError};

struct StationSeed<'a> {
    kind: &'a str,
    company: CompanyId,
    sector: SectorId,
    stock: &'a [(&'a str, u32)],
}

/// Four sectors, one human company and three AI companies with a small
/// production chain spread across sectors.
pub fn demo_world(catalog: &Catalog, config: &SimConfig) -> Result<World, WorldError> {
    let mut world = World::new(config.consumption_history_days);

    let nema = world.add_sector(catalog, "nema", "Nema", 0, 1.0);
    let blue_heart = world.add_sector(catalog, "blue-heart", "Blue Heart", 1000, 0.8);
    let pendulum = world.add_sector(catalog, "pendulum", "Pendulum", 1500, 0.5);
    let frost = world.add_sector(catalog, "frozen-realm", "Frozen Realm", 3000, 0.2);
    for (sector, population, money) in [
        (nema, 5000, 5_000_000),
        (blue_heart, 8000, 8_000_000),
        (pendulum, 0, 2_000_000),
        (frost, 2000, 1_000_000),
    ] {
        if let Some(s) = world.sectors.get_mut(&sector) {
            s.people = People::new(population, money);
        }
    }

    let player = world.add_company("player", "Player Corp", 50_000_000, Controller::Human);
    let miners = world.add_company("miners", "Miners Guild", 100_000_000, Controller::Ai);
    let helix = world.add_company("helix", "Helix Foundries", 100_000_000, Controller::Ai);
    let axis = world.add_company("axis", "Axis Supplies", 100_000_000, Controller::Ai);
    let sector_ids: Vec<SectorId> = world.sectors.keys().copied().collect();
    for company in world.companies.values_mut() {
        company.known_sectors.extend(sector_ids.iter().copied());
    }

    let stations = [
        StationSeed { kind: "station-ice-mine", company: miners, sector: frost, stock: &[("water", 400)] },
        StationSeed { kind: "station-ice-mine", company: miners, sector: nema, stock: &[("water", 200)] },
        StationSeed { kind: "station-refinery", company: miners, sector: nema, stock: &[("water", 160)] },
        StationSeed { kind: "station-farm", company: axis, sector: nema, stock: &[("water", 120)] },
        StationSeed { kind: "station-habitation", company: axis, sector: nema, stock: &[("food", 200), ("fuel", 80)] },
        StationSeed { kind: "station-foundry", company: helix, sector: blue_heart, stock: &[("fuel", 80), ("water", 80)] },
        StationSeed { kind: "station-polymer-plant", company: helix, sector: blue_heart, stock: &[("fuel", 60)] },
        StationSeed { kind: "station-habitation", company: helix, sector: blue_heart, stock: &[("food", 300), ("fuel", 100), ("tools", 40)] },
        StationSeed { kind: "station-tool-factory", company: axis, sector: blue_heart, stock: &[("steel", 60), ("plastics", 40)] },
        StationSeed { kind: "station-hub", company: axis, sector: pendulum, stock: &[("steel", 200), ("plastics", 200)] },
        StationSeed { kind: "station-shipyard", company: helix, sector: pendulum, stock: &[] },
        StationSeed { kind: "station-fuel-depot", company: miners, sector: frost, stock: &[("fuel", 100)] },
        StationSeed { kind: "station-habitation", company: miners, sector: frost, stock: &[("food", 60)] },
        StationSeed { kind: "station-farm", company: player, sector: blue_heart, stock: &[("water", 60)] },
    ];
    for seed in stations {
        let kind = catalog
            .find_spacecraft(seed.kind)
            .ok_or_else(|| WorldError::UnknownIdentifier(seed.kind.to_string()))?;
        let id = world.create_spacecraft(catalog, kind, seed.company, seed.sector)?;
        if let Some(station) = world.spacecraft.get_mut(&id) {
            for (resource, quantity) in seed.stock {
                if let Some(resource) = catalog.find_resource(resource) {
                    station.cargo.give_resources(resource, *quantity);
                }
            }
        }
    }

    let ships: [(&str, CompanyId, SectorId); 10] = [
        ("ship-omen", player, nema),
        ("ship-omen", miners, frost),
        ("ship-atlas", miners, nema),
        ("ship-ghoul", miners, frost),
        ("ship-omen", helix, blue_heart),
        ("ship-omen", helix, pendulum),
        ("ship-atlas", helix, blue_heart),
        ("ship-omen", axis, nema),
        ("ship-omen", axis, blue_heart),
        ("ship-atlas", axis, pendulum),
    ];
    for (kind, company, sector) in ships {
        let kind = catalog
            .find_spacecraft(kind)
            .ok_or_else(|| WorldError::UnknownIdentifier(kind.to_string()))?;
        let id = world.create_spacecraft(catalog, kind, company, sector)?;
        if let Some(p) = world.player.as_mut().filter(|p| p.company == company && p.ship.is_none()) {
            p.ship = Some(id);
        }
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_world_is_consistent() {
        let catalog = Catalog::standard();
        let world = demo_world(&catalog, &SimConfig::default()).unwrap();
        assert_eq!(world.sectors.len(), 4);
        assert_eq!(world.companies.len(), 4);
        assert_eq!(world.companies.values().filter(|c| c.is_ai()).count(), 3);
        assert!(world.player.and_then(|p| p.ship).is_some());
        for sector in world.sectors.values() {
            for id in &sector.stations {
                assert!(world.spacecraft[id].is_station());
            }
            for id in &sector.ships {
                assert_eq!(world.spacecraft[id].sector, Some(sector.id));
            }
        }
        assert!(world.world_money() > 0);
    }
}
