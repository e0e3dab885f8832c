//! Identifier and currency types.

mod currency;
mod ids;

pub use currency::{Currency, CurrencyError};
pub use ids::{FactorId, ScenarioId, TradeId};
