//! # risk_scenarios: Scenario Generation
//!
//! Produces the scenario → bumped-model maps the risk engine reduces:
//!
//! - [`historical::HistoricalGenerator`]: deterministic bump sets keyed by
//!   a shared historical date axis — every factor's shock for a date is
//!   applied to the same clone, so each scenario is an internally
//!   consistent joint move.
//! - [`monte_carlo::McGenerator`]: correlated one-step Monte-Carlo factor
//!   returns through the [`path_engine::PathEngine`] seam, one bumped
//!   model per path.
//! - [`presets::PresetStress`]: ready-made single-date stress bump sets.
//!
//! Scenario construction is fan-out work: each worker clones the base
//! market state, mutates its own clone and rebuilds its own model. Missing
//! bump data is warned about and skipped, never an error — partial
//! coverage is expected in production bump sets.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod bumps;
mod error;
pub mod historical;
pub mod monte_carlo;
pub mod path_engine;
pub mod presets;

pub use bumps::{BumpSeries, BumpSet, BumpStyle, BumpTarget, BumpValue};
pub use error::ScenarioError;
pub use historical::HistoricalGenerator;
pub use monte_carlo::{McConfig, McFactorSpec, McGenerator, VolSpec};
pub use path_engine::{CorrelationMatrix, GbmEngine, PathEngine, PathGrid, SimFactor};
pub use presets::PresetStress;
