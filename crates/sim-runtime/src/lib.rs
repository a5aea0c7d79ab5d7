//! Daily world tick.
//!
//! `Simulation::simulate_day` advances the world by exactly one day. Phases
//! run in a fixed order and each one completes before the next starts:
//! AI companies decide against yesterday's world, then the date moves on,
//! captures settle, and production, people, routes and travels advance.
//! The only randomness is drawn from a `ChaCha8Rng` seeded with the
//! configured seed and the date, so a snapshot and a seed fully determine
//! the next day.

pub mod battle;
pub mod capture;
pub mod economy;
pub mod events;
pub mod integrity;

pub use battle::{AttritionBattle, BattleReport, BattleResolver};
pub use capture::{process_ship_captures, process_station_captures, transfer_spacecraft, Capture};
pub use economy::{decay_reputation, migrate_wealth, mutual_assistance};
pub use events::{generate_events, next_blocking_date, EventKind, EventVisibility, WorldEvent};
pub use integrity::{check_integrity, IntegrityReport, IntegrityViolation};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sim_ai::{simulate_company_ai, AiConfig, AiReport};
use sim_core::{Catalog, CompanyId, SectorId, SimConfig, World};
use sim_econ::{simulate_price_variation, swap_prices};
use tracing::{debug, info};

/// What happened during one day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    /// Date reached at the end of the tick.
    pub date: i64,
    pub battles: Vec<BattleReport>,
    pub ai: Vec<AiReport>,
    pub assistance_pool: i64,
    pub captures: Vec<Capture>,
    pub integrity: IntegrityReport,
    pub migrated: i64,
    pub world_money: i64,
}

/// A world together with everything needed to advance it.
pub struct Simulation {
    pub world: World,
    pub catalog: Catalog,
    pub config: SimConfig,
    pub ai_config: AiConfig,
    pub resolver: Box<dyn BattleResolver>,
}

impl Simulation {
    pub fn new(world: World, catalog: Catalog, config: SimConfig, ai_config: AiConfig) -> Self {
        Self {
            world,
            catalog,
            config,
            ai_config,
            resolver: Box::new(AttritionBattle),
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn BattleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Generator for the tick starting on the current date.
    fn day_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.config.rng_seed ^ self.world.date as u64)
    }

    fn resolve_battles(&mut self) -> Vec<BattleReport> {
        let sectors: Vec<SectorId> = self
            .world
            .sectors
            .keys()
            .copied()
            .filter(|&sector| self.world.sector_needs_battle(sector))
            .collect();
        let mut reports = Vec::with_capacity(sectors.len());
        for sector in sectors {
            reports.push(self.resolver.resolve(&mut self.world, sector));
        }
        reports
    }

    fn run_companies(&mut self, rng: &mut ChaCha8Rng) -> Vec<AiReport> {
        let mut companies: Vec<CompanyId> = self
            .world
            .companies
            .values()
            .filter(|c| c.is_ai())
            .map(|c| c.id)
            .collect();
        companies.shuffle(rng);
        debug!(order = ?companies, "AI order");
        companies
            .into_iter()
            .filter_map(|company| {
                simulate_company_ai(
                    &mut self.world,
                    &self.catalog,
                    &self.config,
                    &self.ai_config,
                    company,
                )
            })
            .collect()
    }

    /// Advance the world by one day.
    pub fn simulate_day(&mut self) -> TickReport {
        let mut rng = self.day_rng();

        let battles = self.resolve_battles();
        let ai = self.run_companies(&mut rng);
        for sector in self.world.sectors.values_mut() {
            sector.bombs = 0;
        }
        let assistance_pool = mutual_assistance(
            &mut self.world,
            self.config.mutual_assistance_divisor,
            &mut rng,
        );
        let integrity = check_integrity(&mut self.world);

        self.world.date += 1;
        self.world.consumption.roll();
        self.world.advance_sector_time();
        self.world.clear_daily_flags();

        let mut captures = process_ship_captures(&mut self.world, &self.catalog);
        captures.extend(process_station_captures(&mut self.world, &self.catalog));

        self.world.simulate_factories(&self.catalog);
        self.world.simulate_sector_transport();
        self.world.simulate_people(&self.catalog);
        self.world.simulate_trade_routes(&self.catalog);
        self.world.simulate_travels();

        decay_reputation(&mut self.world, self.config.reputation_decay_step);
        simulate_price_variation(&mut self.world, &self.catalog);
        swap_prices(&mut self.world);
        let migrated = migrate_wealth(&mut self.world, &self.config);

        let report = TickReport {
            date: self.world.date,
            battles,
            ai,
            assistance_pool,
            captures,
            integrity,
            migrated,
            world_money: self.world.world_money(),
        };
        info!(
            date = report.date,
            battles = report.battles.len(),
            captures = report.captures.len(),
            violations = report.integrity.violations.len(),
            world_money = %sim_core::money::to_credits(report.world_money),
            "day simulated"
        );
        report
    }

    /// Run `days` consecutive ticks.
    pub fn run_days(&mut self, days: u32) -> Vec<TickReport> {
        (0..days).map(|_| self.simulate_day()).collect()
    }

    /// Tick until the world date reaches `date`. Nothing happens for dates
    /// already passed.
    pub fn force_date(&mut self, date: i64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        while self.world.date < date {
            reports.push(self.simulate_day());
        }
        reports
    }

    /// Tick at least once, then skip ahead event by event until a blocking
    /// event is reached or `fast_forward_max_days` have passed.
    pub fn fast_forward(&mut self) -> Vec<TickReport> {
        let end = self.world.date + self.config.fast_forward_max_days;
        let mut reports = vec![self.simulate_day()];
        while self.world.date < end {
            let Some(next) = generate_events(&self.world).into_iter().next() else {
                break;
            };
            if next.date <= self.world.date {
                break;
            }
            while self.world.date < next.date.min(end) {
                reports.push(self.simulate_day());
            }
            if next.visibility == EventVisibility::Blocking {
                break;
            }
        }
        info!(days = reports.len(), date = self.world.date, "fast forward done");
        reports
    }
}
