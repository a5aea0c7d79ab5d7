//! Economic models for the company planner.
//!
//! This crate provides:
//! - the per-sector supply and demand forecast seen by one company
//! - the two-sector deal search run for each idle cargo ship
//! - the daily sector price drift
//!
//! Everything here reads the world through `sim-core` and is deterministic;
//! the forecast is meant to be rebuilt every planning pass and mutated only
//! by the pass that built it.

pub mod deal;
pub mod forecast;
pub mod pricing;

pub use deal::{find_best_deal, Deal, TradeValuation};
pub use forecast::{
    compute_sector_variation, compute_world_resource_flow, compute_world_variation,
    ResourceVariation, SectorVariation, WorldVariation, DEFAULT_STOCK_HORIZON_DAYS,
};
pub use pricing::{mean_price, simulate_price_variation, swap_prices};
pub use sim_core::market::{buy_context, sell_context};
pub use sim_core::{spacecraft_price, PriceContext};
