//! World-wide money flows run once a day: the assistance pool between
//! companies, reputation decay and population wealth migration.

use rand::Rng;
use sim_core::money::scale;
use sim_core::{CompanyId, SectorId, SimConfig, World};
use tracing::{debug, trace};

/// Every company except the player's puts `money / divisor` in a pool that
/// is split evenly among them; the remainder of the split goes to one
/// contributor drawn from `rng`. Returns the pool size.
pub fn mutual_assistance<R: Rng + ?Sized>(world: &mut World, divisor: i64, rng: &mut R) -> i64 {
    let contributors: Vec<CompanyId> = world
        .companies
        .keys()
        .copied()
        .filter(|&c| !world.is_player(c))
        .collect();
    if contributors.is_empty() || divisor <= 0 {
        return 0;
    }

    let mut pool = 0;
    for company in &contributors {
        if let Some(c) = world.companies.get_mut(company) {
            let contribution = c.money / divisor;
            if contribution > 0 && c.take_money(contribution) {
                pool += contribution;
            }
        }
    }

    let count = contributors.len() as i64;
    let share = pool / count;
    let bonus = pool % count;
    let lucky = rng.gen_range(0..contributors.len());
    for (index, company) in contributors.iter().enumerate() {
        if let Some(c) = world.companies.get_mut(company) {
            c.give_money(share);
            if index == lucky {
                c.give_money(bonus);
            }
        }
    }
    debug!(pool, share, bonus, lucky = %contributors[lucky], "assistance shared");
    pool
}

/// Move every non-zero reputation one `step` toward zero without crossing it.
pub fn decay_reputation(world: &mut World, step: f32) {
    for company in world.companies.values_mut() {
        for value in company.reputation.values_mut() {
            if *value > 0.0 {
                *value = (*value - step).max(0.0);
            } else if *value < 0.0 {
                *value = (*value + step).min(0.0);
            }
        }
    }
}

fn move_people_money(world: &mut World, from: SectorId, to: SectorId, amount: i64) -> i64 {
    if amount <= 0 {
        return 0;
    }
    let taken = world
        .sectors
        .get_mut(&from)
        .is_some_and(|s| s.people.take_money(amount));
    if !taken {
        return 0;
    }
    if let Some(s) = world.sectors.get_mut(&to) {
        s.people.pay(amount);
    }
    amount
}

/// Population savings drift between every pair of sectors.
///
/// A side without population leaks `money / empty_sector_leak_divisor` to
/// the other. When both are populated the side with the higher wealth per
/// inhabitant leaks `migration_leak_factor * (share - 0.5)` of its savings,
/// `share` being its part of the pair's summed wealth. Returns the total
/// moved.
pub fn migrate_wealth(world: &mut World, config: &SimConfig) -> i64 {
    let sectors: Vec<SectorId> = world.sectors.keys().copied().collect();
    let mut moved = 0;
    for (i, &a) in sectors.iter().enumerate() {
        for &b in &sectors[i + 1..] {
            let (Some(pa), Some(pb)) = (
                world.sectors.get(&a).map(|s| s.people.clone()),
                world.sectors.get(&b).map(|s| s.people.clone()),
            ) else {
                continue;
            };
            let (from, to, amount) = match (pa.population, pb.population) {
                (0, 0) => continue,
                (0, _) => (a, b, pa.money / config.empty_sector_leak_divisor),
                (_, 0) => (b, a, pb.money / config.empty_sector_leak_divisor),
                _ => {
                    let (wa, wb) = (pa.wealth(), pb.wealth());
                    let total = wa + wb;
                    if total <= 0.0 || wa == wb {
                        continue;
                    }
                    let (from, to, wealth, money) = if wa > wb {
                        (a, b, wa, pa.money)
                    } else {
                        (b, a, wb, pb.money)
                    };
                    let ratio = config.migration_leak_factor * (wealth / total - 0.5);
                    (from, to, scale(money, ratio).min(money / 100))
                }
            };
            let amount = move_people_money(world, from, to, amount);
            if amount > 0 {
                trace!(%from, %to, amount, "wealth migrated");
            }
            moved += amount;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Catalog, Controller, People};

    #[test]
    fn player_keeps_out_of_the_pool() {
        let mut world = World::new(365);
        let player = world.add_company("p", "Player", 1_000_000, Controller::Human);
        let a = world.add_company("a", "A", 1_000_000, Controller::Ai);
        let b = world.add_company("b", "B", 0, Controller::Ai);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let pool = mutual_assistance(&mut world, 1000, &mut rng);
        assert_eq!(pool, 1000);
        assert_eq!(world.companies[&player].money, 1_000_000);
        assert_eq!(world.companies[&a].money, 1_000_000 - 1000 + 500);
        assert_eq!(world.companies[&b].money, 500);
    }

    #[test]
    fn remainder_goes_to_a_single_contributor() {
        let mut world = World::new(365);
        let ids: Vec<CompanyId> = (0..3)
            .map(|i| world.add_company(&format!("c{i}"), "C", 10_000, Controller::Ai))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // 3 x 10 in the pool, 10 each back, nothing left over
        mutual_assistance(&mut world, 1000, &mut rng);
        assert!(ids.iter().all(|c| world.companies[c].money == 10_000));

        world.companies.get_mut(&ids[0]).unwrap().money = 11_000;
        mutual_assistance(&mut world, 1000, &mut rng);
        // pool of 31: 10 each plus 1 for one lucky company
        let without_bonus = [10_999, 10_000, 10_000];
        let bonus: Vec<i64> = ids
            .iter()
            .zip(without_bonus)
            .map(|(c, base)| world.companies[c].money - base)
            .collect();
        assert_eq!(bonus.iter().sum::<i64>(), 1);
        assert!(bonus.iter().all(|b| *b == 0 || *b == 1));
    }

    proptest! {
        #[test]
        fn assistance_conserves_company_money(
            money in proptest::collection::vec(-1_000_000i64..1_000_000_000, 1..8),
            seed in any::<u64>(),
        ) {
            let mut world = World::new(365);
            for (i, m) in money.iter().enumerate() {
                world.add_company(&format!("c{i}"), "C", *m, Controller::Ai);
            }
            let before: i64 = world.companies.values().map(|c| c.money).sum();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            mutual_assistance(&mut world, 1000, &mut rng);
            let after: i64 = world.companies.values().map(|c| c.money).sum();
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn reputation_drifts_back_to_neutral() {
        let mut world = World::new(365);
        let a = world.add_company("a", "A", 0, Controller::Ai);
        let b = world.add_company("b", "B", 0, Controller::Ai);
        let c = world.add_company("c", "C", 0, Controller::Ai);
        {
            let company = world.companies.get_mut(&a).unwrap();
            company.give_reputation(b, 0.015);
            company.give_reputation(c, -5.0);
        }
        decay_reputation(&mut world, 0.01);
        decay_reputation(&mut world, 0.01);
        let company = &world.companies[&a];
        assert_eq!(company.reputation_of(b), 0.0);
        assert!((company.reputation_of(c) + 4.98).abs() < 1e-4);
    }

    fn sectors(people: [(u32, i64); 2]) -> (World, SectorId, SectorId) {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let a = world.add_sector(&catalog, "a", "A", 0, 1.0);
        let b = world.add_sector(&catalog, "b", "B", 0, 1.0);
        world.sectors.get_mut(&a).unwrap().people = People::new(people[0].0, people[0].1);
        world.sectors.get_mut(&b).unwrap().people = People::new(people[1].0, people[1].1);
        (world, a, b)
    }

    #[test]
    fn empty_sector_leaks_a_thousandth() {
        let (mut world, a, b) = sectors([(0, 1_000_000), (100, 0)]);
        let before = world.world_money();
        assert_eq!(migrate_wealth(&mut world, &SimConfig::default()), 1000);
        assert_eq!(world.sectors[&a].people.money, 999_000);
        assert_eq!(world.sectors[&b].people.money, 1000);
        assert_eq!(world.world_money(), before);
    }

    #[test]
    fn wealthier_sector_leaks_toward_the_poorer() {
        // wealth 3000 against 1000: share 0.75, ratio 0.005
        let (mut world, a, b) = sectors([(100, 300_000), (100, 100_000)]);
        assert_eq!(migrate_wealth(&mut world, &SimConfig::default()), 1500);
        assert_eq!(world.sectors[&a].people.money, 298_500);
        assert_eq!(world.sectors[&b].people.money, 101_500);

        let (mut world, a, b) = sectors([(100, 100_000), (100, 100_000)]);
        assert_eq!(migrate_wealth(&mut world, &SimConfig::default()), 0);
        assert_eq!(world.sectors[&a].people.money, world.sectors[&b].people.money);

        let (mut world, _, _) = sectors([(0, 500), (0, 500)]);
        assert_eq!(migrate_wealth(&mut world, &SimConfig::default()), 0);
    }

    #[test]
    fn leak_never_exceeds_one_percent() {
        let (mut world, a, _) = sectors([(1, 1_000_000), (1_000_000, 0)]);
        let moved = migrate_wealth(&mut world, &SimConfig::default());
        assert!(moved <= 10_000);
        assert_eq!(world.sectors[&a].people.money, 1_000_000 - moved);
    }
}
