//! Dated bump registrations for deterministic scenario sets.
//!
//! A [`BumpSeries`] is one risk factor's dated history of shocks; a
//! [`BumpSet`] is the registered collection. The union of all series'
//! dates forms the scenario axis: reusing one canonical date axis across
//! factor types guarantees every scenario is an internally consistent
//! joint shock without factor-level synchronisation logic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use risk_core::shift::Shift;
use risk_core::types::FactorId;

/// Whether a bump is additive or multiplicative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BumpStyle {
    /// Multiplicative: `new = old * (1 + bump)`.
    Relative,
    /// Additive: `new = old + bump`.
    Absolute,
}

impl BumpStyle {
    /// Converts a raw bump number into a [`Shift`].
    #[inline]
    pub fn shift(&self, bump: f64) -> Shift<f64> {
        match self {
            BumpStyle::Relative => Shift::relative(bump),
            BumpStyle::Absolute => Shift::absolute(bump),
        }
    }
}

/// Which market-state section a bump addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BumpTarget {
    /// A flat spot shock.
    Spot,
    /// A curve shock: scalar bumps apply to every pillar, vector bumps
    /// pillar-by-pillar.
    Curve,
    /// An ATM-vol-vector shock, same scalar/vector semantics as curves.
    Vol,
}

impl BumpTarget {
    /// Target name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BumpTarget::Spot => "Spot",
            BumpTarget::Curve => "Curve",
            BumpTarget::Vol => "Vol",
        }
    }
}

/// One bump observation: a flat shock or a per-pillar vector.
#[derive(Clone, Debug, PartialEq)]
pub enum BumpValue {
    /// Flat shock applied to the spot or to every pillar.
    Scalar(f64),
    /// Per-pillar shocks in pillar order.
    Vector(Vec<f64>),
}

/// One factor's dated bump history.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use risk_scenarios::bumps::{BumpSeries, BumpStyle, BumpTarget, BumpValue};
///
/// let d = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
/// let series = BumpSeries::new("SPX", BumpTarget::Spot, BumpStyle::Relative)
///     .with_bump(d, BumpValue::Scalar(-0.031));
/// assert_eq!(series.dates().count(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BumpSeries {
    factor: FactorId,
    target: BumpTarget,
    style: BumpStyle,
    by_date: BTreeMap<NaiveDate, BumpValue>,
}

impl BumpSeries {
    /// Creates an empty series for one factor.
    pub fn new(factor: impl Into<FactorId>, target: BumpTarget, style: BumpStyle) -> Self {
        Self {
            factor: factor.into(),
            target,
            style,
            by_date: BTreeMap::new(),
        }
    }

    /// Registers a bump observation (builder style).
    pub fn with_bump(mut self, date: NaiveDate, value: BumpValue) -> Self {
        self.by_date.insert(date, value);
        self
    }

    /// Registers a bump observation.
    pub fn insert(&mut self, date: NaiveDate, value: BumpValue) {
        self.by_date.insert(date, value);
    }

    /// The factor this series bumps.
    pub fn factor(&self) -> &FactorId {
        &self.factor
    }

    /// The market-state section addressed.
    pub fn target(&self) -> BumpTarget {
        self.target
    }

    /// Additive or multiplicative.
    pub fn style(&self) -> BumpStyle {
        self.style
    }

    /// The bump for a date, if registered.
    pub fn value_on(&self, date: NaiveDate) -> Option<&BumpValue> {
        self.by_date.get(&date)
    }

    /// All registered dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }
}

/// The registered collection of bump series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BumpSet {
    series: Vec<BumpSeries>,
}

impl BumpSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a series (builder style).
    pub fn with_series(mut self, series: BumpSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Adds a series.
    pub fn add(&mut self, series: BumpSeries) {
        self.series.push(series);
    }

    /// The registered series.
    pub fn series(&self) -> &[BumpSeries] {
        &self.series
    }

    /// True if no series are registered.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// The canonical scenario date axis: the sorted union of every
    /// series' dates.
    pub fn scenario_dates(&self) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> =
            self.series.iter().flat_map(|s| s.dates()).collect();
        dates.into_iter().collect()
    }
}
