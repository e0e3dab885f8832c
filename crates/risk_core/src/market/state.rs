//! The market-state snapshot container.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::{Curve, MarketDataError};
use crate::shift::Shift;
use crate::types::{Currency, FactorId};

/// Asset class of a registered risk factor.
///
/// Steps and generators select "their" factors through this registry
/// rather than by parsing id strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssetClass {
    /// Interest rate curves (discounting and projection).
    Rates,
    /// Foreign exchange spots and vols.
    Fx,
    /// Equity spots, forward curves and vols.
    Equity,
    /// Commodity spots, forward curves and vols.
    Commodity,
}

impl AssetClass {
    /// Class name for display.
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Rates => "Rates",
            AssetClass::Fx => "FX",
            AssetClass::Equity => "Equity",
            AssetClass::Commodity => "Commodity",
        }
    }
}

/// A market snapshot: as-of date, spots, curves, ATM-vol vectors and
/// fixings, with an asset-class registry over all factor ids.
///
/// All mutators are in-place; the cloning discipline (clone before
/// mutating, one owner per clone) lives with the caller and is enforced
/// structurally by the scenario workers and attribution steps, which each
/// receive their own owned copy.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use risk_core::market::{AssetClass, MarketState};
/// use risk_core::shift::Shift;
///
/// let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
/// let mut state = MarketState::new(as_of);
/// state.set_spot("EURUSD".into(), AssetClass::Fx, 1.10);
///
/// let mut bumped = state.clone();
/// bumped.shift_spot(&"EURUSD".into(), Shift::relative(-0.10)).unwrap();
///
/// assert_eq!(state.spot(&"EURUSD".into()), Some(1.10));
/// assert!((bumped.spot(&"EURUSD".into()).unwrap() - 0.99).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketState {
    as_of: NaiveDate,
    spots: HashMap<FactorId, f64>,
    curves: HashMap<FactorId, Curve>,
    vols: HashMap<FactorId, Curve>,
    fixings: HashMap<FactorId, BTreeMap<NaiveDate, f64>>,
    classes: HashMap<FactorId, AssetClass>,
}

impl MarketState {
    /// Creates an empty snapshot at the given as-of date.
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            spots: HashMap::new(),
            curves: HashMap::new(),
            vols: HashMap::new(),
            fixings: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    /// The valuation as-of date.
    #[inline]
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Moves the as-of date (time roll). Fixings are unaffected; values
    /// dated after the new as-of simply stop being "known".
    pub fn roll_to(&mut self, as_of: NaiveDate) {
        self.as_of = as_of;
    }

    // ---- registration -------------------------------------------------

    /// Registers (or replaces) a spot observable.
    pub fn set_spot(&mut self, id: FactorId, class: AssetClass, value: f64) {
        self.classes.insert(id.clone(), class);
        self.spots.insert(id, value);
    }

    /// Registers (or replaces) a price/rate curve.
    pub fn add_price_curve(&mut self, id: FactorId, class: AssetClass, curve: Curve) {
        self.classes.insert(id.clone(), class);
        self.curves.insert(id, curve);
    }

    /// Registers (or replaces) an ATM-volatility vector.
    pub fn add_vol_surface(&mut self, id: FactorId, class: AssetClass, vols: Curve) {
        self.classes.insert(id.clone(), class);
        self.vols.insert(id, vols);
    }

    /// Records a published fixing for a factor.
    pub fn add_fixing(&mut self, id: FactorId, date: NaiveDate, value: f64) {
        self.fixings.entry(id).or_default().insert(date, value);
    }

    // ---- lookup -------------------------------------------------------

    /// Spot value, if registered.
    pub fn spot(&self, id: &FactorId) -> Option<f64> {
        self.spots.get(id).copied()
    }

    /// Curve, if registered.
    pub fn curve(&self, id: &FactorId) -> Option<&Curve> {
        self.curves.get(id)
    }

    /// Vol vector, if registered.
    pub fn vol(&self, id: &FactorId) -> Option<&Curve> {
        self.vols.get(id)
    }

    /// Asset class of a registered factor.
    pub fn class_of(&self, id: &FactorId) -> Option<AssetClass> {
        self.classes.get(id).copied()
    }

    /// Sum of fixings published on or before `date` for a factor.
    ///
    /// Zero if the factor has no fixings — unfixed histories are expected.
    pub fn fixings_through(&self, id: &FactorId, date: NaiveDate) -> f64 {
        self.fixings
            .get(id)
            .map(|series| series.range(..=date).map(|(_, v)| v).sum())
            .unwrap_or(0.0)
    }

    /// All fixing series, keyed by factor.
    pub fn fixings(&self) -> &HashMap<FactorId, BTreeMap<NaiveDate, f64>> {
        &self.fixings
    }

    /// Copies every fixing series from another snapshot, replacing any
    /// overlapping dates. Used when rolling a state to a later date.
    pub fn absorb_fixings_from(&mut self, other: &MarketState) {
        for (id, series) in &other.fixings {
            let target = self.fixings.entry(id.clone()).or_default();
            for (date, value) in series {
                target.insert(*date, *value);
            }
        }
    }

    /// Registered spot factors of one asset class, sorted for
    /// deterministic iteration.
    pub fn spot_factors(&self, class: AssetClass) -> Vec<FactorId> {
        let mut out: Vec<FactorId> = self
            .spots
            .keys()
            .filter(|id| self.class_of(id) == Some(class))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Registered curve factors of one asset class, sorted.
    pub fn curve_factors(&self, class: AssetClass) -> Vec<FactorId> {
        let mut out: Vec<FactorId> = self
            .curves
            .keys()
            .filter(|id| self.class_of(id) == Some(class))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Registered vol factors of one asset class, sorted.
    pub fn vol_factors(&self, class: AssetClass) -> Vec<FactorId> {
        let mut out: Vec<FactorId> = self
            .vols
            .keys()
            .filter(|id| self.class_of(id) == Some(class))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Scenario-level price level of a factor: the spot if one is
    /// registered, else the curve mean, else the vol mean.
    pub fn level(&self, id: &FactorId) -> Option<f64> {
        self.spot(id)
            .or_else(|| self.curve(id).map(Curve::mean_level))
            .or_else(|| self.vol(id).map(Curve::mean_level))
    }

    /// FX conversion rate between two currencies.
    ///
    /// Looks up the concatenated pair (`EURUSD` for EUR→USD), falling
    /// back to the inverse pair. Same-currency conversion is 1.
    pub fn fx_rate(&self, from: Currency, to: Currency) -> Result<f64, MarketDataError> {
        if from == to {
            return Ok(1.0);
        }
        let direct = FactorId::new(format!("{}{}", from.code(), to.code()));
        if let Some(rate) = self.spot(&direct) {
            return Ok(rate);
        }
        let inverse = FactorId::new(format!("{}{}", to.code(), from.code()));
        if let Some(rate) = self.spot(&inverse) {
            if rate != 0.0 {
                return Ok(1.0 / rate);
            }
        }
        Err(MarketDataError::MissingFxRate {
            pair: format!("{}{}", from.code(), to.code()),
        })
    }

    // ---- shift application --------------------------------------------

    /// Shifts a registered spot.
    pub fn shift_spot(&mut self, id: &FactorId, shift: Shift<f64>) -> Result<(), MarketDataError> {
        let value = self
            .spots
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?;
        *value = shift.apply(*value);
        Ok(())
    }

    /// Shifts every pillar of a registered curve.
    pub fn shift_curve(&mut self, id: &FactorId, shift: Shift<f64>) -> Result<(), MarketDataError> {
        self.curves
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?
            .shift_all(shift);
        Ok(())
    }

    /// Applies a per-pillar shift vector to a registered curve.
    pub fn shift_curve_vector(
        &mut self,
        id: &FactorId,
        shifts: &[Shift<f64>],
    ) -> Result<(), MarketDataError> {
        self.curves
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?
            .shift_vector(shifts)
    }

    /// Shifts one labelled pillar of a registered curve.
    pub fn shift_curve_point(
        &mut self,
        id: &FactorId,
        label: &str,
        shift: Shift<f64>,
    ) -> Result<(), MarketDataError> {
        let curve = self
            .curves
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?;
        curve.shift_point(id, label, shift)
    }

    /// Shifts every pillar of a registered vol vector.
    pub fn shift_vol(&mut self, id: &FactorId, shift: Shift<f64>) -> Result<(), MarketDataError> {
        self.vols
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?
            .shift_all(shift);
        Ok(())
    }

    /// Applies a per-pillar shift vector to a registered vol vector.
    pub fn shift_vol_vector(
        &mut self,
        id: &FactorId,
        shifts: &[Shift<f64>],
    ) -> Result<(), MarketDataError> {
        self.vols
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?
            .shift_vector(shifts)
    }

    /// Shifts one labelled pillar of a registered vol vector.
    pub fn shift_vol_point(
        &mut self,
        id: &FactorId,
        label: &str,
        shift: Shift<f64>,
    ) -> Result<(), MarketDataError> {
        let vols = self
            .vols
            .get_mut(id)
            .ok_or_else(|| MarketDataError::UnknownFactor(id.clone()))?;
        vols.shift_point(id, label, shift)
    }
}
