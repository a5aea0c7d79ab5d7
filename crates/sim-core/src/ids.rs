//! Stable identifiers for arena entities and catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Company participating in the economy.
    CompanyId, u32, "company"
);
entity_id!(
    /// Sector of space; the only spatial unit relevant to the economy.
    SectorId, u32, "sector"
);
entity_id!(
    /// Ship or station.
    SpacecraftId, u32, "spacecraft"
);
entity_id!(
    /// Group of ships moving together.
    FleetId, u32, "fleet"
);
entity_id!(
    /// In-transit state of a fleet.
    TravelId, u32, "travel"
);
entity_id!(
    /// Automated multi-sector haul loop.
    TradeRouteId, u32, "route"
);
entity_id!(
    /// Index into the resource catalog.
    ResourceId, u16, "resource"
);
entity_id!(
    /// Index into the spacecraft catalog.
    SpacecraftTypeId, u16, "type"
);

/// Monotonic allocator shared by every arena of a world.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Returns a fresh raw identifier; identifiers are never reused.
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let mut ids = IdAllocator::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(b > a);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(SectorId(3).to_string(), "sector#3");
        assert_eq!(ResourceId(1).to_string(), "resource#1");
    }
}
