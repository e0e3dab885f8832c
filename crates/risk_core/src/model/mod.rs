//! The valuation-model contract.
//!
//! A [`PvModel`] pairs one frozen market snapshot with one portfolio and
//! prices it into a tagged cube. The engine and the attribution waterfall
//! only ever talk to this trait; the actual pricing library sits behind
//! it. [`LinearModel`] is the in-crate reference implementation.

mod linear;

use thiserror::Error;

pub use linear::LinearModel;

use crate::cube::Cube;
use crate::market::{MarketDataError, MarketState};
use crate::portfolio::Portfolio;
use crate::types::{Currency, TradeId};

/// Valuation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Market data lookup failed during pricing.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    /// A trade valued to NaN or infinity. Hard stop: the caller must
    /// abort the run rather than let the value corrupt an aggregate.
    #[error("Non-finite value for trade {trade}")]
    NonFinite {
        /// The trade whose value diverged.
        trade: TradeId,
    },
}

/// One market snapshot paired with one portfolio, priced on demand.
///
/// Implementations must be deterministic given the snapshot and
/// portfolio, and free of side effects. `rebuild` is pure: it returns a
/// new handle and mutates neither input — this is what lets scenario
/// workers and attribution steps thread fresh models through without
/// invalidating anything already cached.
pub trait PvModel: Clone + Send + Sync {
    /// Present value per trade, converted to `ccy`.
    fn pv(&self, ccy: Currency) -> Result<Cube, ModelError>;

    /// Future (undiscounted) value per trade, converted to `ccy`.
    fn fv(&self, ccy: Currency) -> Result<Cube, ModelError>;

    /// The market snapshot backing this model.
    fn state(&self) -> &MarketState;

    /// The portfolio backing this model.
    fn portfolio(&self) -> &Portfolio;

    /// A new model over a different snapshot and portfolio.
    #[must_use]
    fn rebuild(&self, state: MarketState, portfolio: Portfolio) -> Self;
}
