//! Ships and stations.

use crate::cargo::CargoBay;
use crate::catalog::{Capabilities, SpacecraftDescription, SpacecraftKind, SpacecraftSize};
use crate::factory::Factory;
use crate::ids::{CompanyId, FleetId, SectorId, SpacecraftId, SpacecraftTypeId, TradeRouteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spacecraft {
    pub id: SpacecraftId,
    /// Human readable registration, e.g. "MIN-omen-12".
    pub immatriculation: String,
    pub type_id: SpacecraftTypeId,
    pub company: CompanyId,
    pub kind: SpacecraftKind,
    pub size: SpacecraftSize,
    pub capabilities: Capabilities,
    /// `None` while travelling.
    pub sector: Option<SectorId>,
    /// Always `None` for stations.
    pub fleet: Option<FleetId>,
    pub cargo: CargoBay,
    pub factories: Vec<Factory>,
    /// Sector whose internal transport this ship serves.
    pub assigned_to_sector: Option<SectorId>,
    pub trade_route: Option<TradeRouteId>,
    /// Company that tagged this ship for capture.
    pub harpooned_by: Option<CompanyId>,
    /// Progress of companies capturing this station.
    pub capture_points: BTreeMap<CompanyId, u32>,
    pub trading: bool,
    pub repairing: bool,
    pub refilling: bool,
    pub disabled: bool,
    pub combat_points: u32,
    pub location: [f32; 3],
    pub rotation: [f32; 4],
}

impl Spacecraft {
    pub fn from_description(
        id: SpacecraftId,
        immatriculation: String,
        description: &SpacecraftDescription,
        company: CompanyId,
        sector: SectorId,
    ) -> Self {
        Self {
            id,
            immatriculation,
            type_id: description.id,
            company,
            kind: description.kind,
            size: description.size,
            capabilities: description.capabilities,
            sector: Some(sector),
            fleet: None,
            cargo: CargoBay::new(description.cargo_slot_count, description.cargo_slot_capacity),
            factories: description.factories.iter().cloned().map(Factory::new).collect(),
            assigned_to_sector: None,
            trade_route: None,
            harpooned_by: None,
            capture_points: BTreeMap::new(),
            trading: false,
            repairing: false,
            refilling: false,
            disabled: false,
            combat_points: description.combat_points,
            location: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn is_station(&self) -> bool {
        self.kind == SpacecraftKind::Station
    }

    pub fn is_ship(&self) -> bool {
        self.kind == SpacecraftKind::Ship
    }

    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_military(&self) -> bool {
        self.has(Capabilities::MILITARY)
    }

    /// Military strength; disabled hulls do not count.
    pub fn effective_combat_points(&self) -> u32 {
        if self.disabled || !self.is_military() {
            0
        } else {
            self.combat_points
        }
    }

    pub fn cargo_capacity(&self) -> u32 {
        self.cargo.capacity()
    }

    /// Add capture points for `company`; true once `resistance` is reached.
    pub fn try_capture(&mut self, company: CompanyId, points: u32, resistance: u32) -> bool {
        let entry = self.capture_points.entry(company).or_insert(0);
        *entry = entry.saturating_add(points);
        *entry >= resistance
    }

    pub fn reset_capture(&mut self, company: CompanyId) {
        self.capture_points.remove(&company);
    }

    /// Stations keep their trading flag.
    pub fn clear_daily_flags(&mut self) {
        if self.is_ship() {
            self.trading = false;
        }
        self.repairing = false;
        self.refilling = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn capture_points_accumulate_until_resistance() {
        let catalog = Catalog::standard();
        let desc = catalog
            .spacecraft(catalog.find_spacecraft("station-hub").unwrap())
            .unwrap();
        let mut station =
            Spacecraft::from_description(SpacecraftId(1), "HUB-1".into(), desc, CompanyId(0), SectorId(0));
        assert!(!station.try_capture(CompanyId(2), 60, 100));
        assert!(station.try_capture(CompanyId(2), 60, 100));
        station.reset_capture(CompanyId(2));
        assert!(station.capture_points.is_empty());
    }

    #[test]
    fn stations_keep_trading_overnight() {
        let catalog = Catalog::standard();
        let hub = catalog
            .spacecraft(catalog.find_spacecraft("station-hub").unwrap())
            .unwrap();
        let omen = catalog
            .spacecraft(catalog.find_spacecraft("ship-omen").unwrap())
            .unwrap();
        let mut station =
            Spacecraft::from_description(SpacecraftId(1), "HUB-1".into(), hub, CompanyId(0), SectorId(0));
        let mut ship =
            Spacecraft::from_description(SpacecraftId(2), "O-1".into(), omen, CompanyId(0), SectorId(0));
        for s in [&mut station, &mut ship] {
            s.trading = true;
            s.repairing = true;
            s.refilling = true;
            s.clear_daily_flags();
            assert!(!s.repairing && !s.refilling);
        }
        assert!(station.trading);
        assert!(!ship.trading);
    }

    #[test]
    fn disabled_ship_has_no_strength() {
        let catalog = Catalog::standard();
        let desc = catalog
            .spacecraft(catalog.find_spacecraft("ship-ghoul").unwrap())
            .unwrap();
        let mut ship =
            Spacecraft::from_description(SpacecraftId(1), "G-1".into(), desc, CompanyId(0), SectorId(0));
        assert_eq!(ship.effective_combat_points(), 10);
        ship.disabled = true;
        assert_eq!(ship.effective_combat_points(), 0);
    }
}
