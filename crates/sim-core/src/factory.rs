//! Factory state hosted by stations.

use crate::cargo::CargoBay;
use crate::catalog::{FactoryDescription, SpacecraftSize};
use crate::ids::{CompanyId, SpacecraftTypeId};
use serde::{Deserialize, Serialize};

/// Ship ordered from a shipyard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub ship_type: SpacecraftTypeId,
    pub company: CompanyId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Factory {
    pub description: FactoryDescription,
    pub active: bool,
    /// A cycle is under way; inputs and cost have been taken.
    pub producing: bool,
    /// Days elapsed in the current cycle.
    pub progress: i64,
    /// Cost set aside at cycle start, paid out at cycle end.
    pub reserved_money: i64,
    /// Queued ship, shipyards only.
    pub order: Option<ShipOrder>,
    /// Ship being built, shipyards only.
    pub target: Option<ShipOrder>,
}

impl Factory {
    pub fn new(description: FactoryDescription) -> Self {
        Self {
            description,
            active: true,
            producing: false,
            progress: 0,
            reserved_money: 0,
            order: None,
            target: None,
        }
    }

    pub fn is_shipyard(&self) -> bool {
        self.description.is_shipyard()
    }

    pub fn shipyard_size(&self) -> Option<SpacecraftSize> {
        self.description.shipyard
    }

    /// False when output storage is saturated and the factory would stall.
    pub fn needs_production(&self, cargo: &CargoBay) -> bool {
        if self.is_shipyard() {
            return self.order.is_some() || self.target.is_some();
        }
        self.description
            .outputs
            .iter()
            .all(|o| cargo.free_space_for_resource(o.resource) >= o.quantity)
    }

    pub fn has_inputs(&self, cargo: &CargoBay) -> bool {
        self.description
            .inputs
            .iter()
            .all(|i| cargo.resource_quantity(i.resource) >= i.quantity)
    }

    /// Cycle cost, raised in dim sectors for sun-dependent factories.
    pub fn cycle_cost(&self, light_ratio: f32) -> i64 {
        if self.description.need_sun && light_ratio > 0.0 {
            (self.description.production_cost as f64 / light_ratio as f64) as i64
        } else {
            self.description.production_cost
        }
    }

    /// Day on which the running cycle completes, given today's date.
    pub fn completion_date(&self, date: i64) -> Option<i64> {
        if !self.active || !(self.producing || self.target.is_some()) {
            return None;
        }
        Some(date + (self.description.production_time - self.progress).max(1))
    }

    pub fn is_free_shipyard(&self) -> bool {
        self.is_shipyard() && self.order.is_none() && self.target.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn farm() -> Factory {
        let catalog = Catalog::standard();
        let id = catalog.find_spacecraft("station-farm").unwrap();
        Factory::new(catalog.spacecraft(id).unwrap().factories[0].clone())
    }

    #[test]
    fn sun_raises_cost_in_dim_sectors() {
        let f = farm();
        assert_eq!(f.cycle_cost(1.0), 30_000);
        assert_eq!(f.cycle_cost(0.5), 60_000);
    }

    #[test]
    fn saturated_output_stops_production() {
        let f = farm();
        let food = f.description.outputs[0].resource;
        let mut cargo = CargoBay::new(1, 60);
        assert!(f.needs_production(&cargo));
        cargo.give_resources(food, 20);
        assert!(!f.needs_production(&cargo));
    }

    #[test]
    fn idle_factory_has_no_completion_date() {
        let mut f = farm();
        assert_eq!(f.completion_date(10), None);
        f.producing = true;
        assert_eq!(f.completion_date(10), Some(11));
    }
}
