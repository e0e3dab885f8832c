//! # risk_core: Foundation for the Scenario Risk Engine
//!
//! Bottom layer of the riskcube workspace, providing:
//! - The tagged result cube (`cube`): filter/pivot/difference/total
//! - Market-state snapshots and mutators (`market`)
//! - Portfolio and trade structures (`portfolio`)
//! - The valuation-model contract and a linear reference model (`model`)
//! - Shift types for bump application (`shift`)
//! - Identifier and currency types (`types`)
//!
//! ## Layering
//!
//! `risk_core` has no dependencies on other `risk_*` crates, with minimal
//! external dependencies:
//! - chrono: date arithmetic for as-of dates and curve pillars
//! - num-traits: generic numerics for the shift type
//! - thiserror: structured error types
//! - serde: serialisation support (optional)
//!
//! ## Snapshot discipline
//!
//! A [`market::MarketState`] is an immutable snapshot once it backs a
//! valuation model. Every mutator is in-place, so callers clone first and
//! mutate the private working copy — scenario workers and attribution steps
//! each own their clone and never share a mutable state.
//!
//! ## Example
//!
//! ```
//! use risk_core::cube::{Column, Cube, Row};
//!
//! let mut cube = Cube::new();
//! cube.push(Row::new(125.0).with_text(Column::TradeId, "T001"));
//! cube.push(Row::new(-40.0).with_text(Column::TradeId, "T002"));
//!
//! assert_eq!(cube.total(), 85.0);
//! let t1 = cube.filter_text(Column::TradeId, "T001", false);
//! assert_eq!(t1.total(), 125.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod cube;
pub mod market;
pub mod model;
pub mod portfolio;
pub mod shift;
pub mod types;

pub use cube::{Column, Cube, Row, Tag};
pub use market::{AssetClass, Curve, CurvePoint, MarketDataError, MarketState};
pub use model::{LinearModel, ModelError, PvModel};
pub use portfolio::{ExposureProfile, Portfolio, PortfolioError, Trade, TradeType};
pub use shift::Shift;
pub use types::{Currency, CurrencyError, FactorId, ScenarioId, TradeId};
