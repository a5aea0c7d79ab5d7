//! Upcoming world events, used to skip quiet days.

use serde::Serialize;
use sim_core::{FleetId, SectorId, SpacecraftId, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EventVisibility {
    /// Fast forward stops here.
    Blocking,
    /// Worth showing, not worth stopping for.
    Visible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EventKind {
    TravelArrival {
        fleet: FleetId,
        destination: SectorId,
    },
    FactoryCompletion {
        station: SpacecraftId,
        factory: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WorldEvent {
    /// Day on which the event happens.
    pub date: i64,
    pub kind: EventKind,
    pub visibility: EventVisibility,
}

/// Travel arrivals and factory cycle completions, earliest first.
pub fn generate_events(world: &World) -> Vec<WorldEvent> {
    let travels = world.travels.values().map(|t| WorldEvent {
        date: world.date + t.remaining(world.date),
        kind: EventKind::TravelArrival {
            fleet: t.fleet,
            destination: t.destination,
        },
        visibility: EventVisibility::Blocking,
    });
    let factories = world.spacecraft.values().flat_map(|s| {
        s.factories
            .iter()
            .enumerate()
            .filter_map(move |(index, f)| {
                Some(WorldEvent {
                    date: f.completion_date(world.date)?,
                    kind: EventKind::FactoryCompletion {
                        station: s.id,
                        factory: index,
                    },
                    visibility: EventVisibility::Visible,
                })
            })
    });
    let mut events: Vec<WorldEvent> = travels.chain(factories).collect();
    events.sort_by_key(|e| e.date);
    events
}

/// Date of the earliest blocking event, if any.
pub fn next_blocking_date(world: &World) -> Option<i64> {
    generate_events(world)
        .into_iter()
        .find(|e| e.visibility == EventVisibility::Blocking)
        .map(|e| e.date)
}
