//! Portfolio and trade structures.
//!
//! Trades carry an [`ExposureProfile`]: the factor loadings the reference
//! model prices from. Pricing libraries with richer instrument
//! representations plug in behind [`crate::model::PvModel`] instead.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{Currency, FactorId, TradeId};

/// Trade type classification, used for result tagging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TradeType {
    /// Linear forward exposure.
    Forward,
    /// Interest rate or cross-currency swap.
    Swap,
    /// Vanilla or exotic option.
    Option,
    /// Exchange-traded future.
    Future,
}

impl TradeType {
    /// Type name for display and tagging.
    pub fn name(&self) -> &'static str {
        match self {
            TradeType::Forward => "Forward",
            TradeType::Swap => "Swap",
            TradeType::Option => "Option",
            TradeType::Future => "Future",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-unit factor loadings of a trade.
///
/// The reference model values a trade as the sum of these loadings
/// against the market state (see [`crate::model::LinearModel`]): linear
/// and quadratic in spots, linear in curve pillars, vol levels, elapsed
/// time and published fixings.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExposureProfile {
    /// Constant value component (per unit of notional).
    pub base: f64,
    /// First-order spot loadings by factor.
    pub spot_deltas: BTreeMap<FactorId, f64>,
    /// Second-order spot loadings by factor.
    pub spot_gammas: BTreeMap<FactorId, f64>,
    /// Curve pillar loadings: factor → pillar label → weight.
    pub curve_weights: BTreeMap<FactorId, BTreeMap<String, f64>>,
    /// ATM-vol level loadings by vol factor.
    pub vegas: BTreeMap<FactorId, f64>,
    /// Per-year time decay (positive theta decays value as time passes).
    pub theta: f64,
    /// Weight applied to the sum of published fixings of the underlying.
    pub fixing_weight: f64,
}

impl ExposureProfile {
    /// Creates a profile with only a constant component.
    pub fn with_base(base: f64) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Adds a first-order spot loading (builder style).
    pub fn spot_delta(mut self, factor: impl Into<FactorId>, weight: f64) -> Self {
        self.spot_deltas.insert(factor.into(), weight);
        self
    }

    /// Adds a second-order spot loading (builder style).
    pub fn spot_gamma(mut self, factor: impl Into<FactorId>, weight: f64) -> Self {
        self.spot_gammas.insert(factor.into(), weight);
        self
    }

    /// Adds a curve pillar loading (builder style).
    pub fn curve_weight(
        mut self,
        factor: impl Into<FactorId>,
        label: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.curve_weights
            .entry(factor.into())
            .or_default()
            .insert(label.into(), weight);
        self
    }

    /// Adds an ATM-vol loading (builder style).
    pub fn vega(mut self, factor: impl Into<FactorId>, weight: f64) -> Self {
        self.vegas.insert(factor.into(), weight);
        self
    }

    /// Sets the per-year time decay (builder style).
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Sets the fixing weight (builder style).
    pub fn fixing_weight(mut self, weight: f64) -> Self {
        self.fixing_weight = weight;
        self
    }
}

/// One trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    /// Unique identifier.
    pub id: TradeId,
    /// Type classification.
    pub trade_type: TradeType,
    /// Denomination currency.
    pub currency: Currency,
    /// Primary underlying factor.
    pub underlying: FactorId,
    /// Notional scaling applied to the profile.
    pub notional: f64,
    /// Reserve held against the trade, subtracted from its value.
    pub provision: f64,
    /// Trade inception date (anchor for time decay).
    pub inception: NaiveDate,
    /// Maturity date (discounting horizon).
    pub maturity: NaiveDate,
    /// Factor loadings.
    pub profile: ExposureProfile,
}

impl Trade {
    /// Creates a trade with zero provision.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<TradeId>,
        trade_type: TradeType,
        currency: Currency,
        underlying: impl Into<FactorId>,
        notional: f64,
        inception: NaiveDate,
        maturity: NaiveDate,
        profile: ExposureProfile,
    ) -> Self {
        Self {
            id: id.into(),
            trade_type,
            currency,
            underlying: underlying.into(),
            notional,
            provision: 0.0,
            inception,
            maturity,
            profile,
        }
    }

    /// Sets the provision (builder style).
    pub fn with_provision(mut self, provision: f64) -> Self {
        self.provision = provision;
        self
    }
}

/// A collection of trades with unique ids.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use risk_core::portfolio::{ExposureProfile, Portfolio, Trade, TradeType};
/// use risk_core::types::Currency;
///
/// let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let m = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let trade = Trade::new(
///     "T001", TradeType::Forward, Currency::USD, "SPX",
///     1.0, d, m, ExposureProfile::with_base(10.0),
/// );
/// let portfolio = Portfolio::new(vec![trade]).unwrap();
/// assert_eq!(portfolio.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Portfolio {
    trades: Vec<Trade>,
}

impl Portfolio {
    /// Creates a portfolio, rejecting duplicate trade ids.
    pub fn new(trades: Vec<Trade>) -> Result<Self, PortfolioError> {
        let mut seen = HashSet::new();
        for trade in &trades {
            if !seen.insert(trade.id.clone()) {
                return Err(PortfolioError::DuplicateTrade(trade.id.clone()));
            }
        }
        Ok(Self { trades })
    }

    /// Creates an empty portfolio.
    pub fn empty() -> Self {
        Self { trades: Vec::new() }
    }

    /// The trades, in construction order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Number of trades.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True if the portfolio has no trades.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Looks up a trade by id.
    pub fn trade(&self, id: &TradeId) -> Option<&Trade> {
        self.trades.iter().find(|t| &t.id == id)
    }

    /// All trade ids, in construction order.
    pub fn trade_ids(&self) -> Vec<TradeId> {
        self.trades.iter().map(|t| t.id.clone()).collect()
    }

    /// The subset excluding the given trade ids.
    pub fn excluding(&self, ids: &[TradeId]) -> Portfolio {
        Portfolio {
            trades: self
                .trades
                .iter()
                .filter(|t| !ids.contains(&t.id))
                .cloned()
                .collect(),
        }
    }

    /// The subset retaining only the given trade ids.
    pub fn retaining(&self, ids: &[TradeId]) -> Portfolio {
        Portfolio {
            trades: self
                .trades
                .iter()
                .filter(|t| ids.contains(&t.id))
                .cloned()
                .collect(),
        }
    }

    /// This portfolio's trades with provision levels overridden from
    /// `source` where the same trade id exists there.
    ///
    /// Used by the attribution waterfall to move trade population and
    /// provision levels in separate steps.
    pub fn with_provisions_from(&self, source: &Portfolio) -> Portfolio {
        Portfolio {
            trades: self
                .trades
                .iter()
                .map(|t| {
                    let mut trade = t.clone();
                    if let Some(src) = source.trade(&t.id) {
                        trade.provision = src.provision;
                    }
                    trade
                })
                .collect(),
        }
    }
}

/// Portfolio construction and lookup errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PortfolioError {
    /// Duplicate trade ID encountered.
    #[error("Duplicate trade ID: {0}")]
    DuplicateTrade(TradeId),

    /// Trade not found in portfolio.
    #[error("Trade not found: {0}")]
    TradeNotFound(TradeId),
}
