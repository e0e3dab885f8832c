//! Market-state snapshots and mutators.
//!
//! This module provides:
//! - [`Curve`]: labelled pillar vector, shared by price/rate curves and
//!   ATM-volatility vectors
//! - [`MarketState`]: the snapshot container with spot/curve/vol/fixing
//!   sections and an asset-class registry
//! - [`MarketDataError`]: structured market data errors
//!
//! ## Working-copy discipline
//!
//! All mutators are in-place. A state that backs a valuation model is a
//! frozen snapshot: callers clone it and mutate the private clone, so a
//! cached result can never desynchronise from the state that produced it.

mod curve;
mod error;
mod state;

pub use curve::{Curve, CurvePoint};
pub use error::MarketDataError;
pub use state::{AssetClass, MarketState};
