//! Slot-based cargo bay.
//!
//! Every slot holds at most one resource kind at a time, up to the bay's slot
//! capacity. A slot that is emptied becomes free for any resource again.

use crate::ids::ResourceId;
use serde::{Deserialize, Serialize};

/// One cargo slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoSlot {
    pub resource: Option<ResourceId>,
    pub quantity: u32,
}

/// Bounded per-resource storage aboard a spacecraft.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoBay {
    slot_capacity: u32,
    slots: Vec<CargoSlot>,
}

impl CargoBay {
    pub fn new(slot_count: u32, slot_capacity: u32) -> Self {
        Self {
            slot_capacity,
            slots: vec![CargoSlot::default(); slot_count as usize],
        }
    }

    pub fn slot_capacity(&self) -> u32 {
        self.slot_capacity
    }

    pub fn slots(&self) -> &[CargoSlot] {
        &self.slots
    }

    /// Total capacity across all slots.
    pub fn capacity(&self) -> u32 {
        self.slot_capacity.saturating_mul(self.slots.len() as u32)
    }

    pub fn resource_quantity(&self, resource: ResourceId) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.resource == Some(resource))
            .map(|s| s.quantity)
            .sum()
    }

    /// Room for `resource`: headroom in its own slots plus every empty slot.
    pub fn free_space_for_resource(&self, resource: ResourceId) -> u32 {
        self.slots
            .iter()
            .map(|s| match s.resource {
                Some(r) if r == resource => self.slot_capacity - s.quantity,
                Some(_) => 0,
                None => self.slot_capacity,
            })
            .sum()
    }

    pub fn used_cargo_space(&self) -> u32 {
        self.slots.iter().map(|s| s.quantity).sum()
    }

    pub fn free_cargo_space(&self) -> u32 {
        self.capacity() - self.used_cargo_space()
    }

    pub fn is_empty(&self) -> bool {
        self.used_cargo_space() == 0
    }

    /// Resources currently carried, in slot order, without duplicates.
    pub fn carried_resources(&self) -> Vec<ResourceId> {
        let mut out = Vec::new();
        for r in self.slots.iter().filter_map(|s| s.resource) {
            if !out.contains(&r) {
                out.push(r);
            }
        }
        out
    }

    /// Remove up to `quantity` units and return how many were taken.
    pub fn take_resources(&mut self, resource: ResourceId, quantity: u32) -> u32 {
        let mut remaining = quantity;
        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if slot.resource != Some(resource) {
                continue;
            }
            let taken = slot.quantity.min(remaining);
            slot.quantity -= taken;
            remaining -= taken;
            if slot.quantity == 0 {
                slot.resource = None;
            }
        }
        quantity - remaining
    }

    /// Store up to `quantity` units and return how many fit.
    pub fn give_resources(&mut self, resource: ResourceId, quantity: u32) -> u32 {
        let capacity = self.slot_capacity;
        let mut remaining = quantity;
        // Top up slots already holding the resource before opening new ones.
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.resource == Some(resource) {
                let given = (capacity - slot.quantity).min(remaining);
                slot.quantity += given;
                remaining -= given;
            }
        }
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.resource.is_none() && capacity > 0 {
                let given = capacity.min(remaining);
                slot.resource = Some(resource);
                slot.quantity = given;
                remaining -= given;
            }
        }
        quantity - remaining
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = CargoSlot::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WATER: ResourceId = ResourceId(0);
    const STEEL: ResourceId = ResourceId(1);

    #[test]
    fn give_fills_existing_slot_then_empty_ones() {
        let mut bay = CargoBay::new(3, 50);
        assert_eq!(bay.give_resources(WATER, 30), 30);
        assert_eq!(bay.give_resources(WATER, 40), 40);
        assert_eq!(bay.resource_quantity(WATER), 70);
        assert_eq!(bay.free_space_for_resource(STEEL), 50);
        assert_eq!(bay.free_space_for_resource(WATER), 80);
    }

    #[test]
    fn take_releases_empty_slots() {
        let mut bay = CargoBay::new(2, 50);
        bay.give_resources(WATER, 50);
        bay.give_resources(STEEL, 10);
        assert_eq!(bay.free_space_for_resource(STEEL), 40);
        assert_eq!(bay.take_resources(WATER, 80), 50);
        assert_eq!(bay.free_space_for_resource(STEEL), 90);
        assert_eq!(bay.carried_resources(), vec![STEEL]);
    }

    #[test]
    fn full_bay_refuses_more() {
        let mut bay = CargoBay::new(1, 10);
        assert_eq!(bay.give_resources(WATER, 25), 10);
        assert_eq!(bay.give_resources(STEEL, 5), 0);
        assert_eq!(bay.free_cargo_space(), 0);
    }

    proptest! {
        #[test]
        fn quantities_stay_within_capacity(
            ops in proptest::collection::vec((0u16..3, 0u32..200, any::<bool>()), 0..40)
        ) {
            let mut bay = CargoBay::new(4, 60);
            let mut expected = [0u32; 3];
            for (resource, quantity, give) in ops {
                let r = ResourceId(resource);
                if give {
                    expected[resource as usize] += bay.give_resources(r, quantity);
                } else {
                    expected[resource as usize] -= bay.take_resources(r, quantity);
                }
                prop_assert!(bay.used_cargo_space() <= bay.capacity());
            }
            for (index, qty) in expected.iter().enumerate() {
                prop_assert_eq!(bay.resource_quantity(ResourceId(index as u16)), *qty);
            }
        }
    }
}
