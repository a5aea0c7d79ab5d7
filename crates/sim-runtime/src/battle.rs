//! Automatic resolution of the battles nobody watches.

use serde::Serialize;
use sim_core::{CompanyId, SectorId, SpacecraftId, World};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What one resolution round did in a sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BattleReport {
    pub sector: SectorId,
    /// Company left alone with military strength, if any.
    pub winner: Option<CompanyId>,
    pub disabled: Vec<SpacecraftId>,
    pub harpooned: Vec<SpacecraftId>,
}

impl BattleReport {
    fn quiet(sector: SectorId) -> Self {
        Self {
            sector,
            winner: None,
            disabled: Vec::new(),
            harpooned: Vec::new(),
        }
    }
}

/// Resolves one day of fighting in a sector.
pub trait BattleResolver {
    fn resolve(&mut self, world: &mut World, sector: SectorId) -> BattleReport;
}

/// Deterministic attrition: each day the weaker side of the main engagement
/// loses its weakest armed spacecraft. Once a side has nothing armed left the
/// winner harpoons one of its civilian ships.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttritionBattle;

fn strengths(world: &World, sector: SectorId) -> BTreeMap<CompanyId, u32> {
    let mut strengths = BTreeMap::new();
    let Some(s) = world.sectors.get(&sector) else {
        return strengths;
    };
    for spacecraft in s
        .ships
        .iter()
        .chain(s.stations.iter())
        .filter_map(|id| world.spacecraft.get(id))
    {
        *strengths.entry(spacecraft.company).or_insert(0) += spacecraft.effective_combat_points();
    }
    strengths
}

/// Strongest entry, lowest id on ties.
fn strongest<'a>(
    candidates: impl Iterator<Item = (&'a CompanyId, &'a u32)>,
) -> Option<(CompanyId, u32)> {
    candidates.fold(None, |best, (&company, &strength)| match best {
        Some((_, s)) if s >= strength => best,
        _ => Some((company, strength)),
    })
}

impl BattleResolver for AttritionBattle {
    fn resolve(&mut self, world: &mut World, sector: SectorId) -> BattleReport {
        let mut report = BattleReport::quiet(sector);
        let strengths = strengths(world, sector);

        let attacker = strongest(strengths.iter().filter(|&(&c, &s)| {
            s > 0 && strengths.keys().any(|&other| world.are_at_war(c, other))
        }));
        let Some((attacker, attacker_strength)) = attacker else {
            return report;
        };
        let Some((defender, defender_strength)) =
            strongest(strengths.iter().filter(|&(&c, _)| world.are_at_war(attacker, c)))
        else {
            return report;
        };

        if defender_strength > 0 {
            let loser = if defender_strength <= attacker_strength {
                defender
            } else {
                attacker
            };
            let victim = world
                .sectors
                .get(&sector)
                .into_iter()
                .flat_map(|s| s.ships.iter().chain(s.stations.iter()))
                .filter_map(|id| world.spacecraft.get(id))
                .filter(|s| s.company == loser && s.effective_combat_points() > 0)
                .min_by_key(|s| (s.effective_combat_points(), s.id))
                .map(|s| s.id);
            if let Some(victim) = victim {
                if let Some(s) = world.spacecraft.get_mut(&victim) {
                    s.disabled = true;
                }
                if let Some(s) = world.sectors.get_mut(&sector) {
                    s.bombs += 1;
                }
                debug!(%sector, spacecraft = %victim, company = %loser, "spacecraft disabled");
                report.disabled.push(victim);
            }
            return report;
        }

        report.winner = Some(attacker);
        let prey = world
            .sector_ships(sector)
            .filter(|s| {
                world.are_at_war(attacker, s.company)
                    && !s.is_military()
                    && s.harpooned_by.is_none()
            })
            .map(|s| s.id)
            .next();
        if let Some(prey) = prey {
            if let Some(s) = world.spacecraft.get_mut(&prey) {
                s.harpooned_by = Some(attacker);
            }
            info!(%sector, ship = %prey, by = %attacker, "ship harpooned");
            report.harpooned.push(prey);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Catalog, Controller};

    fn duel() -> (World, Catalog, CompanyId, CompanyId, SectorId) {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let a = world.add_company("a", "A", 0, Controller::Ai);
        let b = world.add_company("b", "B", 0, Controller::Ai);
        let sector = world.add_sector(&catalog, "s", "S", 0, 1.0);
        world.companies.get_mut(&a).unwrap().set_hostility_to(b, true);
        (world, catalog, a, b, sector)
    }

    #[test]
    fn weaker_side_loses_a_ship_a_day() {
        let (mut world, catalog, a, b, sector) = duel();
        let orca = catalog.find_spacecraft("ship-orca").unwrap();
        let ghoul = catalog.find_spacecraft("ship-ghoul").unwrap();
        world.create_spacecraft(&catalog, orca, a, sector).unwrap();
        let g1 = world.create_spacecraft(&catalog, ghoul, b, sector).unwrap();
        let g2 = world.create_spacecraft(&catalog, ghoul, b, sector).unwrap();

        let report = AttritionBattle.resolve(&mut world, sector);
        assert_eq!(report.disabled, vec![g1]);
        assert_eq!(report.winner, None);
        assert_eq!(world.sectors[&sector].bombs, 1);

        let report = AttritionBattle.resolve(&mut world, sector);
        assert_eq!(report.disabled, vec![g2]);
        assert!(world.sector_needs_battle(sector));
    }

    #[test]
    fn lone_winner_harpoons_a_civilian() {
        let (mut world, catalog, a, b, sector) = duel();
        let ghoul = catalog.find_spacecraft("ship-ghoul").unwrap();
        let omen = catalog.find_spacecraft("ship-omen").unwrap();
        world.create_spacecraft(&catalog, ghoul, a, sector).unwrap();
        let prey = world.create_spacecraft(&catalog, omen, b, sector).unwrap();

        let report = AttritionBattle.resolve(&mut world, sector);
        assert_eq!(report.winner, Some(a));
        assert_eq!(report.harpooned, vec![prey]);
        assert_eq!(world.spacecraft[&prey].harpooned_by, Some(a));
        // already tagged, nothing else to grab
        assert!(AttritionBattle.resolve(&mut world, sector).harpooned.is_empty());
    }

    #[test]
    fn peace_means_no_fight() {
        let (mut world, catalog, a, b, sector) = duel();
        world.companies.get_mut(&a).unwrap().set_hostility_to(b, false);
        let ghoul = catalog.find_spacecraft("ship-ghoul").unwrap();
        world.create_spacecraft(&catalog, ghoul, a, sector).unwrap();
        world.create_spacecraft(&catalog, ghoul, b, sector).unwrap();
        assert_eq!(AttritionBattle.resolve(&mut world, sector), BattleReport::quiet(sector));
    }
}
