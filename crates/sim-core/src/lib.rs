//! Core domain model of the sector economy.
//!
//! This crate owns the arena-backed [`World`], the read-only [`Catalog`] of
//! game content, configuration, and the collaborators the daily tick drives:
//! cargo bays, fleets and travels, sector markets, factories, populations,
//! battle state and trade routes. Planning lives in `sim-econ` and `sim-ai`;
//! the tick itself in `sim-runtime`.

pub mod battle;
pub mod cargo;
pub mod catalog;
pub mod company;
pub mod config;
pub mod factory;
pub mod fleet;
pub mod ids;
pub mod market;
pub mod money;
pub mod people;
pub mod production;
pub mod scenario;
pub mod sector;
pub mod spacecraft;
pub mod trade_route;
pub mod travel;
pub mod world;

pub use battle::BattleState;
pub use cargo::CargoBay;
pub use catalog::{Capabilities, Catalog, ResourceAmount, SpacecraftKind, SpacecraftSize};
pub use company::{AiState, Company, ConstructionProject, Controller, Hostility};
pub use config::{ConfigError, SimConfig};
pub use factory::Factory;
pub use fleet::{Fleet, FleetError};
pub use ids::*;
pub use market::{spacecraft_price, MarketError};
pub use people::People;
pub use production::ShipyardError;
pub use sector::{PriceContext, Sector};
pub use spacecraft::Spacecraft;
pub use trade_route::{TradeRoute, TradeRouteStep};
pub use travel::{travel_duration, Travel, TravelError};
pub use world::{ConsumptionHistory, PlayerInfo, World, WorldError};

use thiserror::Error;

/// Validation errors for catalog and world invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Catalog entry stored at an index that differs from its id.
    #[error("catalog entry `{0}` is not stored at its own index")]
    CatalogIndex(String),
    /// Price or balance must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// A recipe references a resource missing from the catalog.
    #[error("`{0}` references an unknown resource")]
    UnknownResource(String),
    /// Production time must be at least one day.
    #[error("`{0}` has a non-positive production time")]
    NonPositiveDuration(String),
    /// An identifier points at nothing.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
    /// A light ratio outside (0, 1].
    #[error("sector `{0}` has an invalid light ratio")]
    InvalidLightRatio(String),
}

/// Validate a freshly loaded world against its catalog.
///
/// This is a load-time check; the per-tick audit of cross references lives
/// in the runtime's integrity checker.
pub fn validate_world(world: &World, catalog: &Catalog) -> Result<(), ValidationError> {
    catalog.validate()?;
    for company in world.companies.values() {
        if company.money < 0 {
            return Err(ValidationError::NegativeMoney);
        }
    }
    for sector in world.sectors.values() {
        if !(sector.light_ratio > 0.0 && sector.light_ratio <= 1.0) {
            return Err(ValidationError::InvalidLightRatio(sector.identifier.clone()));
        }
        if sector.people.money < 0 || sector.people.dept < 0 {
            return Err(ValidationError::NegativeMoney);
        }
    }
    for spacecraft in world.spacecraft.values() {
        if catalog.spacecraft(spacecraft.type_id).is_none() {
            return Err(ValidationError::DanglingReference(format!(
                "{} has unknown type {}",
                spacecraft.id, spacecraft.type_id
            )));
        }
        if !world.companies.contains_key(&spacecraft.company) {
            return Err(ValidationError::DanglingReference(format!(
                "{} is owned by unknown {}",
                spacecraft.id, spacecraft.company
            )));
        }
    }
    for travel in world.travels.values() {
        if !world.fleets.contains_key(&travel.fleet)
            || !world.sectors.contains_key(&travel.origin)
            || !world.sectors.contains_key(&travel.destination)
        {
            return Err(ValidationError::DanglingReference(format!(
                "{} references a missing fleet or sector",
                travel.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_world_validates() {
        let catalog = Catalog::standard();
        let world = scenario::demo_world(&catalog, &SimConfig::default()).unwrap();
        validate_world(&world, &catalog).unwrap();
    }

    #[test]
    fn world_snapshot_roundtrip() {
        let catalog = Catalog::standard();
        let world = scenario::demo_world(&catalog, &SimConfig::default()).unwrap();
        let s = serde_json::to_string_pretty(&world).unwrap();
        let back: World = serde_json::from_str(&s).unwrap();
        assert_eq!(back.spacecraft.len(), world.spacecraft.len());
        assert_eq!(back.world_money(), world.world_money());
        validate_world(&back, &catalog).unwrap();
    }

    #[test]
    fn dark_sector_is_rejected() {
        let catalog = Catalog::standard();
        let mut world = World::new(365);
        let sector = world.add_sector(&catalog, "void", "Void", 0, 1.0);
        world.sectors.get_mut(&sector).unwrap().light_ratio = 0.0;
        assert_eq!(
            validate_world(&world, &catalog),
            Err(ValidationError::InvalidLightRatio("void".into()))
        );
    }
}
