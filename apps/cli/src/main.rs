//! Headless runner: builds the demo world or loads a save, advances it and
//! prints key figures.

use anyhow::{bail, Context, Result};
use sim_ai::AiConfig;
use sim_core::money::{calendar_date, to_credits};
use sim_core::scenario::demo_world;
use sim_core::{validate_world, Catalog, SimConfig, World};
use sim_runtime::{Simulation, TickReport};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    days: u32,
    fast_forward: bool,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    config: Option<PathBuf>,
    ai_config: Option<PathBuf>,
    report: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--days" => {
                let value = it.next().context("--days needs a value")?;
                args.days = value
                    .parse()
                    .with_context(|| format!("invalid day count `{value}`"))?;
            }
            "--fast-forward" => args.fast_forward = true,
            "--load" => args.load = it.next().map(PathBuf::from),
            "--save" => args.save = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--ai-config" => args.ai_config = it.next().map(PathBuf::from),
            "--report" => args.report = it.next().map(PathBuf::from),
            other => bail!("unknown argument `{other}`"),
        }
    }
    Ok(args)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn load_world(args: &Args, catalog: &Catalog, config: &SimConfig) -> Result<World> {
    let world = match &args.load {
        Some(path) => persistence::load_world(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => demo_world(catalog, config)?,
    };
    validate_world(&world, catalog)?;
    Ok(world)
}

fn print_kpis(sim: &Simulation, reports: &[TickReport]) {
    let world = &sim.world;
    let date = calendar_date(world.date)
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("day {}", world.date));
    println!(
        "World OK | date: {} | companies: {} | sectors: {} | spacecraft: {} | travels: {}",
        date,
        world.companies.len(),
        world.sectors.len(),
        world.spacecraft.len(),
        world.travels.len()
    );
    for company in world.companies.values() {
        println!(
            "KPI | {:<16} | money: {:>14} | ships: {:>3} | stations: {:>3} | sectors known: {}",
            company.name,
            to_credits(company.money),
            world.company_ships(company.id).count(),
            world.company_stations(company.id).count(),
            company.known_sectors.len()
        );
    }
    let deals: usize = reports.iter().flat_map(|r| &r.ai).map(|a| a.deals).sum();
    let battles: usize = reports.iter().map(|r| r.battles.len()).sum();
    let captures: usize = reports.iter().map(|r| r.captures.len()).sum();
    let violations: usize = reports.iter().map(|r| r.integrity.violations.len()).sum();
    println!(
        "Run | days: {} | deals: {} | battles: {} | captures: {} | integrity warnings: {} | world money: {}",
        reports.len(),
        deals,
        battles,
        captures,
        violations,
        to_credits(world.world_money())
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    info!(
        git_sha = env!("GIT_SHA"),
        built = env!("BUILD_DATE"),
        ?args,
        "starting CLI"
    );

    let config = match &args.config {
        Some(path) => SimConfig::from_yaml_str(&read(path)?)?,
        None => SimConfig::default(),
    };
    let ai_config = match &args.ai_config {
        Some(path) => AiConfig::from_yaml_str(&read(path)?)?,
        None => AiConfig::default(),
    };
    let catalog = Catalog::standard();
    catalog.validate()?;
    let world = load_world(&args, &catalog, &config)?;

    let mut sim = Simulation::new(world, catalog, config, ai_config);
    let reports = if args.fast_forward {
        sim.fast_forward()
    } else {
        sim.run_days(args.days)
    };

    if let Some(path) = &args.report {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &reports)?;
        info!(path = %path.display(), days = reports.len(), "tick reports written");
    }

    print_kpis(&sim, &reports);

    if let Some(path) = &args.save {
        persistence::save_world(&sim.world, path)
            .with_context(|| format!("cannot save {}", path.display()))?;
    }
    Ok(())
}
