//! Company planner for AI controlled companies.
//!
//! Once a day each AI company resets its combat tactics, revisits its
//! diplomacy, balances the ships serving local transport, sells leftover
//! cargo, then forecasts every known sector and sends its idle ships after
//! the most profitable deals. Ships with nothing to do feed the construction
//! planner, and a shortage of hulls orders new cargo ships.

pub mod config;
pub mod construction;
pub mod diplomacy;
pub mod fleet_balance;
pub mod shipyard;
pub mod trading;

pub use config::AiConfig;
pub use construction::{
    manage_construction_ships, plan_construction, project_score, score_projects, should_switch,
    ConstructionStep, ScoredProject,
};
pub use diplomacy::{simulate_diplomacy, DiplomacyChange};
pub use fleet_balance::{find_idle_cargos, rebalance_sector_transport, Rebalance};
pub use shipyard::order_cargo_ships;
pub use trading::{dispatch_idle_ships, liquidate_cargo, Dispatch};

use serde::Serialize;
use sim_core::company::{CombatGroup, CombatTactic};
use sim_core::{Catalog, CompanyId, SimConfig, SpacecraftId, SpacecraftTypeId, World};
use sim_econ::{compute_world_resource_flow, compute_world_variation};
use tracing::info;

/// Outcome of one company's planning pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AiReport {
    pub company: Option<CompanyId>,
    pub diplomacy: Vec<DiplomacyChange>,
    pub assigned: usize,
    pub unassigned: usize,
    /// Units sold off free ships before dispatch.
    pub liquidated: u32,
    pub deals: usize,
    pub idle_capacity: i64,
    pub construction: ConstructionStep,
    pub ship_order: Option<(SpacecraftId, SpacecraftTypeId)>,
}

fn reset_combat_tactics(world: &mut World, company: CompanyId) {
    if let Some(c) = world.companies.get_mut(&company) {
        for group in CombatGroup::ALL {
            c.ai.combat_tactics.insert(group, CombatTactic::AttackMilitary);
        }
    }
}

/// Run the daily planning pass of an AI company.
///
/// Returns `None` for unknown or human controlled companies. Each step does
/// nothing when its preconditions are not met; the pass never fails.
pub fn simulate_company_ai(
    world: &mut World,
    catalog: &Catalog,
    sim_config: &SimConfig,
    config: &AiConfig,
    company: CompanyId,
) -> Option<AiReport> {
    if !world.companies.get(&company)?.is_ai() {
        return None;
    }
    let mut report = AiReport {
        company: Some(company),
        ..AiReport::default()
    };

    reset_combat_tactics(world, company);
    report.diplomacy = simulate_diplomacy(world, company, sim_config.war_threshold);

    let rebalance = rebalance_sector_transport(world, company);
    report.assigned = rebalance.assigned.len();
    report.unassigned = rebalance.unassigned.len();

    let idle = find_idle_cargos(world, company);
    report.liquidated = liquidate_cargo(world, catalog, company);

    let mut variations = compute_world_variation(world, catalog, company, config.stock_horizon_days);
    let dispatch = dispatch_idle_ships(world, catalog, config, company, &idle, &mut variations);
    report.deals = dispatch.deals.len();
    let mut idle_capacity = dispatch.idle_capacity;

    let world_flow = compute_world_resource_flow(world, catalog, company);
    report.construction = plan_construction(
        world,
        catalog,
        config,
        company,
        &world_flow,
        &mut idle_capacity,
        &mut variations,
    );
    report.idle_capacity = idle_capacity;

    if idle_capacity < 0 {
        report.ship_order = order_cargo_ships(world, catalog, config, company);
    }

    info!(
        %company,
        deals = report.deals,
        idle_capacity,
        liquidated = report.liquidated,
        "company planned"
    );
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::scenario::demo_world;
    use sim_core::Controller;

    #[test]
    fn humans_plan_for_themselves() {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let human = world.add_company("h", "Human", 0, Controller::Human);
        let report = simulate_company_ai(
            &mut world,
            &catalog,
            &SimConfig::default(),
            &AiConfig::default(),
            human,
        );
        assert!(report.is_none());
    }

    #[test]
    fn demo_companies_plan_without_losing_money() {
        let catalog = Catalog::standard();
        let sim_config = SimConfig::default();
        let mut world = demo_world(&catalog, &sim_config).unwrap();
        let before = world.world_money();
        let ai: Vec<CompanyId> = world
            .companies
            .values()
            .filter(|c| c.is_ai())
            .map(|c| c.id)
            .collect();
        for company in ai {
            let report =
                simulate_company_ai(&mut world, &catalog, &sim_config, &AiConfig::default(), company)
                    .unwrap();
            assert_eq!(report.company, Some(company));
            let tactics = &world.companies[&company].ai.combat_tactics;
            assert_eq!(tactics.len(), CombatGroup::ALL.len());
        }
        assert_eq!(world.world_money(), before);
    }
}
