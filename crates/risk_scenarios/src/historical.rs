//! Deterministic (historical) scenario generation.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use risk_core::market::MarketState;
use risk_core::model::PvModel;
use risk_core::shift::Shift;
use risk_core::types::ScenarioId;

use crate::bumps::{BumpSeries, BumpSet, BumpTarget, BumpValue};

/// Builds one bumped model per scenario date.
///
/// The scenario axis is the union of all registered series' dates. For
/// each date, a worker clones the base state, applies every factor's bump
/// registered on that date, and rebuilds the model. Each worker owns its
/// clone — the base model is only ever read.
///
/// Missing bump data (no observation for a factor on a date) and unknown
/// factor ids are warnings, never errors: partial coverage is expected in
/// production bump histories.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use risk_core::market::{AssetClass, MarketState};
/// use risk_core::model::{LinearModel, PvModel};
/// use risk_core::portfolio::Portfolio;
/// use risk_scenarios::bumps::{BumpSeries, BumpSet, BumpStyle, BumpTarget, BumpValue};
/// use risk_scenarios::historical::HistoricalGenerator;
/// use risk_core::types::ScenarioId;
///
/// let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
/// let mut state = MarketState::new(as_of);
/// state.set_spot("SPX".into(), AssetClass::Equity, 5000.0);
/// let base = LinearModel::new(state, Portfolio::empty());
///
/// let shock_date = NaiveDate::from_ymd_opt(2024, 8, 5).unwrap();
/// let bumps = BumpSet::new().with_series(
///     BumpSeries::new("SPX", BumpTarget::Spot, BumpStyle::Relative)
///         .with_bump(shock_date, BumpValue::Scalar(-0.03)),
/// );
///
/// let scenarios = HistoricalGenerator::new(bumps).generate(&base);
/// assert_eq!(scenarios.len(), 1);
/// let bumped = &scenarios[&ScenarioId::new("2024-08-05")];
/// assert!((bumped.state().spot(&"SPX".into()).unwrap() - 4850.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct HistoricalGenerator {
    bumps: BumpSet,
}

impl HistoricalGenerator {
    /// Creates a generator over a registered bump set.
    pub fn new(bumps: BumpSet) -> Self {
        Self { bumps }
    }

    /// The registered bump set.
    pub fn bumps(&self) -> &BumpSet {
        &self.bumps
    }

    /// Builds the scenario map, one model per date on the shared axis.
    pub fn generate<M: PvModel>(&self, base: &M) -> BTreeMap<ScenarioId, M> {
        let dates = self.bumps.scenario_dates();
        info!(
            scenarios = dates.len(),
            factors = self.bumps.series().len(),
            "building historical scenario set"
        );

        dates
            .par_iter()
            .map(|date| {
                let mut state = base.state().clone();
                for series in self.bumps.series() {
                    match series.value_on(*date) {
                        Some(value) => apply_bump(&mut state, series, value),
                        None => warn!(
                            factor = %series.factor(),
                            date = %date,
                            "no bump data for factor on scenario date; left unbumped"
                        ),
                    }
                }
                let model = base.rebuild(state, base.portfolio().clone());
                (ScenarioId::new(date.to_string()), model)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

/// Applies one bump observation to a private working state.
///
/// Failures are warnings: an unknown factor, a pillar-count mismatch or a
/// vector bump against a spot leave the factor unbumped.
fn apply_bump(state: &mut MarketState, series: &BumpSeries, value: &BumpValue) {
    let factor = series.factor();
    let result = match (series.target(), value) {
        (BumpTarget::Spot, BumpValue::Scalar(bump)) => {
            state.shift_spot(factor, series.style().shift(*bump))
        }
        (BumpTarget::Curve, BumpValue::Scalar(bump)) => {
            state.shift_curve(factor, series.style().shift(*bump))
        }
        (BumpTarget::Vol, BumpValue::Scalar(bump)) => {
            state.shift_vol(factor, series.style().shift(*bump))
        }
        (BumpTarget::Curve, BumpValue::Vector(bumps)) => {
            let shifts: Vec<Shift<f64>> =
                bumps.iter().map(|b| series.style().shift(*b)).collect();
            state.shift_curve_vector(factor, &shifts)
        }
        (BumpTarget::Vol, BumpValue::Vector(bumps)) => {
            let shifts: Vec<Shift<f64>> =
                bumps.iter().map(|b| series.style().shift(*b)).collect();
            state.shift_vol_vector(factor, &shifts)
        }
        (BumpTarget::Spot, BumpValue::Vector(_)) => {
            warn!(factor = %factor, "vector bump registered against a spot; left unbumped");
            return;
        }
    };
    if let Err(err) = result {
        warn!(factor = %factor, target = series.target().name(), %err, "bump not applied");
    }
}
