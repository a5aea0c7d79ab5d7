//! Read-only game content: resources, factories and spacecraft descriptions.
//!
//! The catalog is built once per session and passed by reference to every
//! component that needs it. Nothing in the simulation mutates it.

use crate::ids::{ResourceId, SpacecraftTypeId};
use crate::ValidationError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capability set of a spacecraft, fixed at construction from its description.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Has a usable cargo bay for trading.
        const CARGO = 1 << 0;
        /// Hosts one or more factories.
        const FACTORY = 1 << 1;
        /// Armed; counts for battle and capture.
        const MILITARY = 1 << 2;
        /// Sells consumer resources to the local population.
        const CONSUMER = 1 << 3;
        /// Buys and sells any resource.
        const STORAGE = 1 << 4;
        /// Stocks maintenance resources for fleets.
        const MAINTENANCE = 1 << 5;
    }
}

/// Whether a description is a movable ship or a fixed station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpacecraftKind {
    Ship,
    Station,
}

/// Hull size class; also the size class of a shipyard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpacecraftSize {
    Small,
    Large,
}

/// A tradeable resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub id: ResourceId,
    /// Stable identifier, e.g. "steel".
    pub identifier: String,
    pub name: String,
    /// Reference price per unit, in hundredths of a credit.
    pub default_price: i64,
    pub min_price: i64,
    pub max_price: i64,
    /// Margin between factory input and factory output prices.
    pub transport_fee: i64,
    /// Units consumed per day per 1000 inhabitants; 0 for non-consumer goods.
    pub consumer_rate: u32,
    /// Used by maintenance stations.
    pub maintenance: bool,
}

/// Quantity of one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: ResourceId,
    pub quantity: u32,
}

impl ResourceAmount {
    pub fn new(resource: ResourceId, quantity: u32) -> Self {
        Self { resource, quantity }
    }
}

/// Production recipe of a factory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactoryDescription {
    pub identifier: String,
    pub name: String,
    /// Consumed per cycle.
    pub inputs: Vec<ResourceAmount>,
    /// Produced per cycle.
    pub outputs: Vec<ResourceAmount>,
    /// Money spent per cycle; paid to the local population.
    pub production_cost: i64,
    /// Cycle length in days (>= 1).
    pub production_time: i64,
    /// Production overhead scales with the inverse of the sector light ratio.
    pub need_sun: bool,
    /// Present when the factory builds ships instead of resources.
    pub shipyard: Option<SpacecraftSize>,
}

impl FactoryDescription {
    pub fn is_shipyard(&self) -> bool {
        self.shipyard.is_some()
    }
}

/// Ship or station type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpacecraftDescription {
    pub id: SpacecraftTypeId,
    pub identifier: String,
    pub name: String,
    pub kind: SpacecraftKind,
    pub size: SpacecraftSize,
    pub capabilities: Capabilities,
    pub cargo_slot_count: u32,
    pub cargo_slot_capacity: u32,
    pub factories: Vec<FactoryDescription>,
    /// Resources consumed to build one.
    pub construction: Vec<ResourceAmount>,
    /// Money consumed to build one.
    pub construction_cost: i64,
    pub combat_points: u32,
    /// Accumulated capture points needed to take over a station.
    pub capture_resistance: u32,
}

impl SpacecraftDescription {
    pub fn is_station(&self) -> bool {
        self.kind == SpacecraftKind::Station
    }

    pub fn cargo_capacity(&self) -> u32 {
        self.cargo_slot_count.saturating_mul(self.cargo_slot_capacity)
    }

    pub fn has_shipyard(&self) -> bool {
        self.factories.iter().any(FactoryDescription::is_shipyard)
    }
}

/// Complete game content.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub resources: Vec<ResourceDescription>,
    pub spacecraft: Vec<SpacecraftDescription>,
}

impl Catalog {
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDescription> {
        self.resources.get(id.0 as usize)
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().map(|r| r.id)
    }

    pub fn find_resource(&self, identifier: &str) -> Option<ResourceId> {
        self.resources
            .iter()
            .find(|r| r.identifier == identifier)
            .map(|r| r.id)
    }

    pub fn spacecraft(&self, id: SpacecraftTypeId) -> Option<&SpacecraftDescription> {
        self.spacecraft.get(id.0 as usize)
    }

    pub fn find_spacecraft(&self, identifier: &str) -> Option<SpacecraftTypeId> {
        self.spacecraft
            .iter()
            .find(|s| s.identifier == identifier)
            .map(|s| s.id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &SpacecraftDescription> + '_ {
        self.spacecraft.iter().filter(|s| s.is_station())
    }

    pub fn ships(&self) -> impl Iterator<Item = &SpacecraftDescription> + '_ {
        self.spacecraft.iter().filter(|s| !s.is_station())
    }

    /// Resources bought by the population from consumer stations.
    pub fn consumer_resources(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|r| r.consumer_rate > 0)
            .map(|r| r.id)
            .collect()
    }

    pub fn maintenance_resources(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|r| r.maintenance)
            .map(|r| r.id)
            .collect()
    }

    /// Cargo capacity needed to ferry every construction resource of a type.
    pub fn construction_capacity(&self, id: SpacecraftTypeId) -> u32 {
        self.spacecraft(id)
            .map(|d| d.construction.iter().map(|a| a.quantity).sum())
            .unwrap_or(0)
    }

    /// Check internal references and numeric ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, r) in self.resources.iter().enumerate() {
            if r.id.0 as usize != index {
                return Err(ValidationError::CatalogIndex(r.identifier.clone()));
            }
            if r.min_price < 0 || r.min_price > r.default_price || r.default_price > r.max_price {
                return Err(ValidationError::NegativeMoney);
            }
        }
        let known = |a: &ResourceAmount| self.resource(a.resource).is_some();
        for (index, s) in self.spacecraft.iter().enumerate() {
            if s.id.0 as usize != index {
                return Err(ValidationError::CatalogIndex(s.identifier.clone()));
            }
            if !s.construction.iter().all(known) {
                return Err(ValidationError::UnknownResource(s.identifier.clone()));
            }
            for f in &s.factories {
                if f.production_time < 1 {
                    return Err(ValidationError::NonPositiveDuration(f.identifier.clone()));
                }
                if !f.inputs.iter().all(known) || !f.outputs.iter().all(known) {
                    return Err(ValidationError::UnknownResource(f.identifier.clone()));
                }
            }
        }
        Ok(())
    }

    /// Default content used by the demo scenario, benches and tests.
    pub fn standard() -> Self {
        let mut c = CatalogBuilder::default();
        let water = c.resource("water", "Water", 1200, 50, 0, false);
        let food = c.resource("food", "Food", 2500, 100, 10, false);
        let fuel = c.resource("fuel", "Fuel", 3000, 100, 4, true);
        let plastics = c.resource("plastics", "Plastics", 2500, 100, 0, false);
        let steel = c.resource("steel", "Steel", 4000, 150, 0, false);
        let tools = c.resource("tools", "Tools", 6000, 200, 2, false);
        let amounts = |list: &[(ResourceId, u32)]| -> Vec<ResourceAmount> {
            list.iter().map(|&(r, q)| ResourceAmount::new(r, q)).collect()
        };

        c.station(
            "station-ice-mine",
            "Ice mine",
            Capabilities::FACTORY,
            (1, 1000),
            vec![factory("ice-extraction", &[], &amounts(&[(water, 150)]), 20_000, 1, false)],
            amounts(&[(steel, 60), (plastics, 40)]),
            1_500_000,
        );
        c.station(
            "station-farm",
            "Hydroponic farm",
            Capabilities::FACTORY,
            (2, 800),
            vec![factory(
                "hydroponics",
                &amounts(&[(water, 60)]),
                &amounts(&[(food, 50)]),
                30_000,
                1,
                true,
            )],
            amounts(&[(steel, 40), (plastics, 60)]),
            1_200_000,
        );
        c.station(
            "station-refinery",
            "Refinery",
            Capabilities::FACTORY,
            (2, 800),
            vec![factory(
                "cracking",
                &amounts(&[(water, 160)]),
                &amounts(&[(fuel, 80)]),
                80_000,
                2,
                false,
            )],
            amounts(&[(steel, 80), (plastics, 40)]),
            2_000_000,
        );
        c.station(
            "station-foundry",
            "Foundry",
            Capabilities::FACTORY,
            (3, 800),
            vec![factory(
                "smelting",
                &amounts(&[(fuel, 40), (water, 40)]),
                &amounts(&[(steel, 40)]),
                60_000,
                2,
                false,
            )],
            amounts(&[(steel, 60), (plastics, 60)]),
            2_000_000,
        );
        c.station(
            "station-polymer-plant",
            "Polymer plant",
            Capabilities::FACTORY,
            (3, 800),
            vec![factory(
                "polymerization",
                &amounts(&[(fuel, 30), (water, 30)]),
                &amounts(&[(plastics, 40)]),
                50_000,
                2,
                false,
            )],
            amounts(&[(steel, 80), (plastics, 20)]),
            1_800_000,
        );
        c.station(
            "station-tool-factory",
            "Tool factory",
            Capabilities::FACTORY,
            (3, 600),
            vec![factory(
                "assembly",
                &amounts(&[(steel, 30), (plastics, 20)]),
                &amounts(&[(tools, 20)]),
                80_000,
                3,
                false,
            )],
            amounts(&[(steel, 100), (plastics, 60)]),
            2_500_000,
        );
        c.station(
            "station-habitation",
            "Habitation",
            Capabilities::CONSUMER,
            (3, 1000),
            vec![],
            amounts(&[(steel, 80), (plastics, 80)]),
            2_000_000,
        );
        c.station(
            "station-hub",
            "Trade hub",
            Capabilities::STORAGE,
            (6, 2000),
            vec![],
            amounts(&[(steel, 120), (plastics, 60)]),
            3_000_000,
        );
        c.station(
            "station-fuel-depot",
            "Fuel depot",
            Capabilities::MAINTENANCE,
            (1, 2000),
            vec![],
            amounts(&[(steel, 60), (plastics, 20)]),
            1_000_000,
        );
        c.station(
            "station-shipyard",
            "Shipyard",
            Capabilities::FACTORY,
            (2, 1000),
            vec![shipyard("light-ship-assembly", SpacecraftSize::Small, 5)],
            amounts(&[(steel, 200), (plastics, 100)]),
            5_000_000,
        );
        c.station(
            "station-heavy-shipyard",
            "Heavy shipyard",
            Capabilities::FACTORY,
            (2, 1000),
            vec![shipyard("heavy-ship-assembly", SpacecraftSize::Large, 10)],
            amounts(&[(steel, 400), (plastics, 200)]),
            9_000_000,
        );

        c.ship(
            "ship-omen",
            "Omen",
            SpacecraftSize::Small,
            Capabilities::CARGO,
            (2, 50),
            amounts(&[(steel, 20), (plastics, 20)]),
            400_000,
            0,
        );
        c.ship(
            "ship-atlas",
            "Atlas",
            SpacecraftSize::Large,
            Capabilities::CARGO,
            (4, 250),
            amounts(&[(steel, 120), (plastics, 80)]),
            2_000_000,
            0,
        );
        c.ship(
            "ship-ghoul",
            "Ghoul",
            SpacecraftSize::Small,
            Capabilities::MILITARY,
            (0, 0),
            amounts(&[(steel, 40), (tools, 5)]),
            800_000,
            10,
        );
        c.ship(
            "ship-orca",
            "Orca",
            SpacecraftSize::Large,
            Capabilities::MILITARY,
            (1, 20),
            amounts(&[(steel, 160), (tools, 20)]),
            3_000_000,
            40,
        );
        c.catalog
    }
}

fn factory(
    identifier: &str,
    inputs: &[ResourceAmount],
    outputs: &[ResourceAmount],
    production_cost: i64,
    production_time: i64,
    need_sun: bool,
) -> FactoryDescription {
    FactoryDescription {
        identifier: identifier.to_string(),
        name: identifier.replace('-', " "),
        inputs: inputs.to_vec(),
        outputs: outputs.to_vec(),
        production_cost,
        production_time,
        need_sun,
        shipyard: None,
    }
}

fn shipyard(identifier: &str, size: SpacecraftSize, build_days: i64) -> FactoryDescription {
    FactoryDescription {
        shipyard: Some(size),
        ..factory(identifier, &[], &[], 0, build_days, false)
    }
}

#[derive(Default)]
struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    fn resource(
        &mut self,
        identifier: &str,
        name: &str,
        price: i64,
        fee: i64,
        consumer_rate: u32,
        maintenance: bool,
    ) -> ResourceId {
        let id = ResourceId(self.catalog.resources.len() as u16);
        self.catalog.resources.push(ResourceDescription {
            id,
            identifier: identifier.to_string(),
            name: name.to_string(),
            default_price: price,
            min_price: price / 2,
            max_price: price * 2,
            transport_fee: fee,
            consumer_rate,
            maintenance,
        });
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn station(
        &mut self,
        identifier: &str,
        name: &str,
        capabilities: Capabilities,
        (slots, slot_capacity): (u32, u32),
        factories: Vec<FactoryDescription>,
        construction: Vec<ResourceAmount>,
        construction_cost: i64,
    ) {
        let id = SpacecraftTypeId(self.catalog.spacecraft.len() as u16);
        self.catalog.spacecraft.push(SpacecraftDescription {
            id,
            identifier: identifier.to_string(),
            name: name.to_string(),
            kind: SpacecraftKind::Station,
            size: SpacecraftSize::Large,
            capabilities,
            cargo_slot_count: slots,
            cargo_slot_capacity: slot_capacity,
            factories,
            construction,
            construction_cost,
            combat_points: 0,
            capture_resistance: 100,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn ship(
        &mut self,
        identifier: &str,
        name: &str,
        size: SpacecraftSize,
        capabilities: Capabilities,
        (slots, slot_capacity): (u32, u32),
        construction: Vec<ResourceAmount>,
        construction_cost: i64,
        combat_points: u32,
    ) {
        let id = SpacecraftTypeId(self.catalog.spacecraft.len() as u16);
        self.catalog.spacecraft.push(SpacecraftDescription {
            id,
            identifier: identifier.to_string(),
            name: name.to_string(),
            kind: SpacecraftKind::Ship,
            size,
            capabilities,
            cargo_slot_count: slots,
            cargo_slot_capacity: slot_capacity,
            factories: vec![],
            construction,
            construction_cost,
            combat_points,
            capture_resistance: 0,
        });
    }
}
