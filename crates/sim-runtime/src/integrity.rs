//! Daily audit of the world's cross references and money.
//!
//! The audit never stops the simulation. Violations are logged and
//! returned; fleets found neither parked nor travelling are parked again in
//! the sector they were last known in, and still reported.

use serde::Serialize;
use sim_core::{CompanyId, FleetId, SectorId, SpacecraftId, World};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum IntegrityViolation {
    #[error("{spacecraft} is listed as a station of {sector} but is not a station")]
    NotAStation {
        sector: SectorId,
        spacecraft: SpacecraftId,
    },
    #[error("world holds {actual} but the reference is {expected}")]
    MoneyDrift { expected: i64, actual: i64 },
    #[error("{company} owns {spacecraft} spacecraft but {ships} ships and {stations} stations")]
    SpacecraftCount {
        company: CompanyId,
        spacecraft: usize,
        ships: usize,
        stations: usize,
    },
    #[error("{ship} in {sector} is in no fleet")]
    ShipWithoutFleet { ship: SpacecraftId, sector: SectorId },
    #[error("{ship} in {sector} is missing from the sector ship list")]
    ShipNotListed { ship: SpacecraftId, sector: SectorId },
    #[error("{ship} is in no sector and in no fleet")]
    ShipLost { ship: SpacecraftId },
    #[error("{ship} of {fleet} is in no sector and not travelling")]
    ShipStranded { ship: SpacecraftId, fleet: FleetId },
    #[error("{fleet} of {company} is empty")]
    EmptyFleet { company: CompanyId, fleet: FleetId },
    #[error("{fleet} of {company} is neither parked nor travelling")]
    FleetNowhere { company: CompanyId, fleet: FleetId },
    #[error("{fleet} of {company} is parked and travelling at once")]
    FleetTwice { company: CompanyId, fleet: FleetId },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub violations: Vec<IntegrityViolation>,
    /// Fleets parked again, with the sector they were put in.
    pub repaired: Vec<(FleetId, SectorId)>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

fn check_stations(world: &World, violations: &mut Vec<IntegrityViolation>) {
    for (&sector, s) in &world.sectors {
        for &spacecraft in &s.stations {
            if !world.spacecraft.get(&spacecraft).is_some_and(|sc| sc.is_station()) {
                violations.push(IntegrityViolation::NotAStation { sector, spacecraft });
            }
        }
    }
}

/// The reference is taken on the first audit, then only moves through
/// `World::record_external_transfer`.
fn check_money(world: &mut World, violations: &mut Vec<IntegrityViolation>) {
    let actual = world.world_money();
    let reference = world.money_reference;
    match reference {
        None => world.money_reference = Some(actual),
        Some(expected) if expected != actual => {
            violations.push(IntegrityViolation::MoneyDrift { expected, actual });
        }
        Some(_) => {}
    }
}

fn check_companies(world: &World, violations: &mut Vec<IntegrityViolation>) -> Vec<FleetId> {
    let mut stranded = Vec::new();
    for (&company, c) in &world.companies {
        let ships = world.company_ships(company).count();
        let stations = world.company_stations(company).count();
        if c.spacecraft.len() != ships + stations {
            violations.push(IntegrityViolation::SpacecraftCount {
                company,
                spacecraft: c.spacecraft.len(),
                ships,
                stations,
            });
        }

        for ship in world.company_ships(company) {
            let fleet = ship.fleet.and_then(|f| world.fleets.get(&f));
            match (ship.sector, fleet) {
                (Some(sector), fleet) => {
                    if fleet.is_none() {
                        violations.push(IntegrityViolation::ShipWithoutFleet {
                            ship: ship.id,
                            sector,
                        });
                    }
                    if !world.sectors.get(&sector).is_some_and(|s| s.ships.contains(&ship.id)) {
                        violations.push(IntegrityViolation::ShipNotListed {
                            ship: ship.id,
                            sector,
                        });
                    }
                }
                (None, None) => violations.push(IntegrityViolation::ShipLost { ship: ship.id }),
                (None, Some(fleet)) if !fleet.is_traveling() => {
                    violations.push(IntegrityViolation::ShipStranded {
                        ship: ship.id,
                        fleet: fleet.id,
                    });
                    stranded.push(fleet.id);
                }
                (None, Some(_)) => {}
            }
        }

        for fleet in c.fleets.iter().filter_map(|f| world.fleets.get(f)) {
            if fleet.ships.is_empty() {
                violations.push(IntegrityViolation::EmptyFleet {
                    company,
                    fleet: fleet.id,
                });
            }
            match (fleet.sector, fleet.travel) {
                (None, None) => {
                    violations.push(IntegrityViolation::FleetNowhere {
                        company,
                        fleet: fleet.id,
                    });
                    stranded.push(fleet.id);
                }
                (Some(_), Some(_)) => violations.push(IntegrityViolation::FleetTwice {
                    company,
                    fleet: fleet.id,
                }),
                _ => {}
            }
        }
    }
    stranded.sort_unstable();
    stranded.dedup();
    stranded
}

/// Sector a stranded fleet should be parked in: its own, one of its ships',
/// or the first sector its company knows.
fn last_known_sector(world: &World, fleet: FleetId) -> Option<SectorId> {
    let f = world.fleets.get(&fleet)?;
    f.sector
        .or_else(|| {
            f.ships
                .iter()
                .filter_map(|s| world.spacecraft.get(s))
                .find_map(|s| s.sector)
        })
        .or_else(|| {
            world
                .companies
                .get(&f.company)
                .and_then(|c| c.known_sectors.iter().next().copied())
        })
}

/// Audit the world, repairing what can be repaired.
pub fn check_integrity(world: &mut World) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    check_stations(world, &mut report.violations);
    check_money(world, &mut report.violations);
    let stranded = check_companies(world, &mut report.violations);

    for violation in &report.violations {
        warn!(date = world.date, %violation, "world integrity failure");
    }

    for fleet in stranded {
        let Some(sector) = last_known_sector(world, fleet) else {
            warn!(%fleet, "no sector to park a stranded fleet in");
            continue;
        };
        match world.park_fleet(fleet, sector) {
            Ok(()) => {
                info!(%fleet, %sector, "stranded fleet parked");
                report.repaired.push((fleet, sector));
            }
            Err(err) => warn!(%fleet, %sector, %err, "cannot park stranded fleet"),
        }
    }
    report
}
