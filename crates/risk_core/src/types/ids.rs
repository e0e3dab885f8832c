//! Identifier newtypes for trades, risk factors and scenarios.
//!
//! Strongly-typed identifiers prevent accidental misuse — a scenario key
//! can never be passed where a trade id is expected.

use std::fmt;

/// Unique identifier for a trade.
///
/// # Examples
///
/// ```
/// use risk_core::types::TradeId;
///
/// let id = TradeId::new("T001");
/// assert_eq!(id.as_str(), "T001");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeId(String);

impl TradeId {
    /// Creates a new trade ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TradeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a market risk factor.
///
/// Factor ids name spots, curves and volatility surfaces in the market
/// state, e.g. `"EURUSD"`, `"IR.USD.OIS"`, `"VOL.EQ.SPX"`. The id itself
/// is opaque to the engine; the asset class is registered separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorId(String);

impl FactorId {
    /// Creates a new factor ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FactorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FactorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identifier for one scenario.
///
/// A scenario key is a historical date, a path index or a bumped-factor
/// label. The reserved key [`ScenarioId::ERROR`] marks the "no result"
/// sentinel returned for an empty scenario set and must never be used as
/// a real scenario key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Sentinel key for "no result".
    pub const ERROR: &'static str = "ERROR";

    /// Creates a new scenario ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel scenario id returned when no scenarios exist.
    #[inline]
    pub fn error() -> Self {
        Self(Self::ERROR.to_string())
    }

    /// Returns true if this is the "no result" sentinel.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.0 == Self::ERROR
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ScenarioId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
