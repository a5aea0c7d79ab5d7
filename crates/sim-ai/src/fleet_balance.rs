//! Assigning cargo ships to in-sector transport, and finding the rest.

use sim_core::{CompanyId, SectorId, SpacecraftId, World};
use tracing::debug;

/// Ships changed by one rebalancing pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rebalance {
    pub assigned: Vec<SpacecraftId>,
    pub unassigned: Vec<SpacecraftId>,
}

/// Cargo ships of `company` free for trading: docked in a known sector,
/// not assigned to local transport, not on a trade route and not
/// committed to a construction project.
pub fn find_idle_cargos(world: &World, company: CompanyId) -> Vec<SpacecraftId> {
    let Some(c) = world.companies.get(&company) else {
        return Vec::new();
    };
    c.known_sectors
        .iter()
        .flat_map(|&sector| world.sector_ships(sector))
        .filter(|ship| {
            ship.company == company
                && ship.assigned_to_sector.is_none()
                && ship.trade_route.is_none()
                && ship.cargo_capacity() > 0
                && !c.ai.is_construction_ship(ship.id)
        })
        .map(|ship| ship.id)
        .collect()
}

/// Release assigned ships, smallest first, while each fits in `surplus`.
pub fn unassign_ships_from_sector(
    world: &mut World,
    company: CompanyId,
    sector: SectorId,
    surplus: u32,
) -> Vec<SpacecraftId> {
    let mut assigned: Vec<(u32, SpacecraftId)> = world
        .sector_ships(sector)
        .filter(|s| s.company == company && s.assigned_to_sector == Some(sector))
        .map(|s| (s.cargo_capacity(), s.id))
        .collect();
    assigned.sort();

    let mut remaining = surplus;
    let mut released = Vec::new();
    for (capacity, id) in assigned {
        if remaining == 0 {
            break;
        }
        if capacity > remaining {
            continue;
        }
        if let Some(ship) = world.spacecraft.get_mut(&id) {
            ship.assigned_to_sector = None;
            remaining -= capacity;
            released.push(id);
        }
    }
    released
}

/// Assign idle ships of the sector until `deficit` is covered.
pub fn assign_ships_to_sector(
    world: &mut World,
    company: CompanyId,
    sector: SectorId,
    deficit: u32,
) -> Vec<SpacecraftId> {
    let candidates: Vec<(u32, SpacecraftId)> = find_idle_cargos(world, company)
        .into_iter()
        .filter_map(|id| world.spacecraft.get(&id))
        .filter(|s| s.sector == Some(sector))
        .map(|s| (s.cargo_capacity(), s.id))
        .collect();

    let mut remaining = i64::from(deficit);
    let mut assigned = Vec::new();
    for (capacity, id) in candidates {
        if remaining <= 0 {
            break;
        }
        if let Some(ship) = world.spacecraft.get_mut(&id) {
            ship.assigned_to_sector = Some(sector);
            remaining -= i64::from(capacity);
            assigned.push(id);
        }
    }
    assigned
}

/// Match assigned transport capacity to local needs in every known sector.
pub fn rebalance_sector_transport(world: &mut World, company: CompanyId) -> Rebalance {
    let sectors: Vec<SectorId> = world
        .companies
        .get(&company)
        .map(|c| c.known_sectors.iter().copied().collect())
        .unwrap_or_default();
    let mut result = Rebalance::default();
    for sector in sectors {
        let balance = world.transport_capacity_balance(sector, company);
        if balance > 0 {
            let surplus = u32::try_from(balance).unwrap_or(u32::MAX);
            result
                .unassigned
                .extend(unassign_ships_from_sector(world, company, sector, surplus));
        } else if balance < 0 {
            let deficit = u32::try_from(-balance).unwrap_or(u32::MAX);
            result
                .assigned
                .extend(assign_ships_to_sector(world, company, sector, deficit));
        }
    }
    if !result.assigned.is_empty() || !result.unassigned.is_empty() {
        debug!(
            %company,
            assigned = result.assigned.len(),
            unassigned = result.unassigned.len(),
            "sector transport rebalanced"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Catalog, Controller};

    struct Fixture {
        world: World,
        catalog: Catalog,
        company: CompanyId,
        sector: SectorId,
    }

    fn fixture() -> Fixture {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let company = world.add_company("c", "C", 0, Controller::Ai);
        let sector = world.add_sector(&catalog, "s", "S", 0, 1.0);
        Fixture {
            world,
            catalog,
            company,
            sector,
        }
    }

    fn spawn(f: &mut Fixture, kind: &str) -> SpacecraftId {
        let kind = f.catalog.find_spacecraft(kind).unwrap();
        f.world
            .create_spacecraft(&f.catalog, kind, f.company, f.sector)
            .unwrap()
    }

    #[test]
    fn deficit_assigns_idle_ships() {
        let mut f = fixture();
        spawn(&mut f, "station-ice-mine");
        spawn(&mut f, "station-refinery");
        let omen = spawn(&mut f, "ship-omen");
        let atlas = spawn(&mut f, "ship-atlas");

        assert_eq!(find_idle_cargos(&f.world, f.company), vec![omen, atlas]);
        let r = rebalance_sector_transport(&mut f.world, f.company);
        // 150 water a cycle needs both hulls once the omen's 100 falls short
        assert_eq!(r.assigned, vec![omen, atlas]);
        assert!(find_idle_cargos(&f.world, f.company).is_empty());
    }

    #[test]
    fn surplus_releases_smallest_first() {
        let mut f = fixture();
        let omen = spawn(&mut f, "ship-omen");
        let atlas = spawn(&mut f, "ship-atlas");
        for id in [omen, atlas] {
            f.world.spacecraft.get_mut(&id).unwrap().assigned_to_sector = Some(f.sector);
        }
        let released = unassign_ships_from_sector(&mut f.world, f.company, f.sector, 500);
        assert_eq!(released, vec![omen]);
        assert_eq!(f.world.spacecraft[&atlas].assigned_to_sector, Some(f.sector));
    }

    #[test]
    fn construction_ships_are_not_idle() {
        let mut f = fixture();
        let omen = spawn(&mut f, "ship-omen");
        spawn(&mut f, "ship-ghoul");
        f.world
            .companies
            .get_mut(&f.company)
            .unwrap()
            .ai
            .construction_ships
            .push(omen);
        assert!(find_idle_cargos(&f.world, f.company).is_empty());
    }
}
