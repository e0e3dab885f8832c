//! Bump-and-reprice sensitivity calculation.
//!
//! Produces the risk cube the attribution waterfall consumes: per-trade
//! spot Delta/Gamma (central differences), per-pillar curve Delta, vol
//! Vega and one-day Theta, tagged with [`Column::Measure`],
//! [`Column::Underlying`] and, for curve pillars, [`Column::PointLabel`] /
//! [`Column::PointDate`].

use std::collections::BTreeMap;

use chrono::Days;
use tracing::info;

use risk_core::cube::{measure, Column, Cube, Row};
use risk_core::market::AssetClass;
use risk_core::model::PvModel;
use risk_core::shift::Shift;
use risk_core::types::{Currency, FactorId};

use crate::EngineError;

const ALL_CLASSES: [AssetClass; 4] = [
    AssetClass::Rates,
    AssetClass::Fx,
    AssetClass::Equity,
    AssetClass::Commodity,
];

/// Bump sizes and row filtering for sensitivity calculation.
#[derive(Clone, Copy, Debug)]
pub struct SensitivityConfig {
    /// Spot bump as a fraction of the spot level.
    pub spot_bump: f64,
    /// Absolute per-pillar curve bump.
    pub curve_bump: f64,
    /// Absolute vol bump (vol points).
    pub vol_bump: f64,
    /// Days to roll for the theta estimate.
    pub theta_days: u64,
    /// Sensitivities below this magnitude are dropped from the cube.
    pub threshold: f64,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            spot_bump: 1e-4,
            curve_bump: 1e-4,
            vol_bump: 1e-4,
            theta_days: 1,
            threshold: 1e-10,
        }
    }
}

/// Central-difference sensitivity calculator over a valuation model.
///
/// # Examples
///
/// ```
/// use risk_engine::{SensitivityCalculator, SensitivityConfig};
///
/// let calculator = SensitivityCalculator::new(SensitivityConfig::default());
/// # let _ = calculator;
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SensitivityCalculator {
    config: SensitivityConfig,
}

impl SensitivityCalculator {
    /// Creates a calculator with the given bump configuration.
    pub fn new(config: SensitivityConfig) -> Self {
        Self { config }
    }

    /// Computes the full risk cube for one model.
    pub fn risk_cube<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
    ) -> Result<Cube, EngineError> {
        let mut cube = Cube::new();
        let base = pv_by_trade(model, ccy)?;

        self.spot_sensitivities(model, ccy, &base, &mut cube)?;
        self.curve_sensitivities(model, ccy, &base, &mut cube)?;
        self.vol_sensitivities(model, ccy, &base, &mut cube)?;
        self.theta_sensitivities(model, ccy, &base, &mut cube)?;

        info!(rows = cube.len(), "risk cube computed");
        Ok(cube)
    }

    fn spot_sensitivities<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        base: &BTreeMap<String, f64>,
        cube: &mut Cube,
    ) -> Result<(), EngineError> {
        let state = model.state();
        for class in ALL_CLASSES {
            for factor in state.spot_factors(class) {
                let level = state.spot(&factor).unwrap_or(0.0);
                let h = if level != 0.0 {
                    level.abs() * self.config.spot_bump
                } else {
                    self.config.spot_bump
                };

                let up = self.repriced_spot(model, ccy, &factor, h)?;
                let down = self.repriced_spot(model, ccy, &factor, -h)?;

                for trade in base.keys() {
                    let pv0 = base[trade];
                    let pv_up = up.get(trade).copied().unwrap_or(0.0);
                    let pv_dn = down.get(trade).copied().unwrap_or(0.0);

                    let delta = (pv_up - pv_dn) / (2.0 * h);
                    if delta.abs() > self.config.threshold {
                        cube.push(sensitivity_row(trade, &factor, measure::DELTA, delta));
                    }
                    let gamma = (pv_up - 2.0 * pv0 + pv_dn) / (h * h);
                    if gamma.abs() > self.config.threshold {
                        cube.push(sensitivity_row(trade, &factor, measure::GAMMA, gamma));
                    }
                }
            }
        }
        Ok(())
    }

    fn repriced_spot<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        factor: &FactorId,
        bump: f64,
    ) -> Result<BTreeMap<String, f64>, EngineError> {
        let mut state = model.state().clone();
        state.shift_spot(factor, Shift::absolute(bump)).map_err(
            risk_core::model::ModelError::from,
        )?;
        let bumped = model.rebuild(state, model.portfolio().clone());
        pv_by_trade(&bumped, ccy)
    }

    fn curve_sensitivities<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        base: &BTreeMap<String, f64>,
        cube: &mut Cube,
    ) -> Result<(), EngineError> {
        let state = model.state();
        let h = self.config.curve_bump;
        for class in ALL_CLASSES {
            for factor in state.curve_factors(class) {
                let pillars: Vec<(String, chrono::NaiveDate)> = state
                    .curve(&factor)
                    .map(|c| {
                        c.points()
                            .iter()
                            .map(|p| (p.label.clone(), p.date))
                            .collect()
                    })
                    .unwrap_or_default();

                for (label, date) in pillars {
                    let up = self.repriced_curve_point(model, ccy, &factor, &label, h)?;
                    let down = self.repriced_curve_point(model, ccy, &factor, &label, -h)?;

                    for trade in base.keys() {
                        let pv_up = up.get(trade).copied().unwrap_or(0.0);
                        let pv_dn = down.get(trade).copied().unwrap_or(0.0);
                        let delta = (pv_up - pv_dn) / (2.0 * h);
                        if delta.abs() > self.config.threshold {
                            cube.push(
                                sensitivity_row(trade, &factor, measure::DELTA, delta)
                                    .with_text(Column::PointLabel, label.clone())
                                    .with_date(Column::PointDate, date),
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn repriced_curve_point<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        factor: &FactorId,
        label: &str,
        bump: f64,
    ) -> Result<BTreeMap<String, f64>, EngineError> {
        let mut state = model.state().clone();
        state
            .shift_curve_point(factor, label, Shift::absolute(bump))
            .map_err(risk_core::model::ModelError::from)?;
        let bumped = model.rebuild(state, model.portfolio().clone());
        pv_by_trade(&bumped, ccy)
    }

    fn vol_sensitivities<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        base: &BTreeMap<String, f64>,
        cube: &mut Cube,
    ) -> Result<(), EngineError> {
        let state = model.state();
        let h = self.config.vol_bump;
        for class in ALL_CLASSES {
            for factor in state.vol_factors(class) {
                let up = self.repriced_vol(model, ccy, &factor, h)?;
                let down = self.repriced_vol(model, ccy, &factor, -h)?;
                for trade in base.keys() {
                    let pv_up = up.get(trade).copied().unwrap_or(0.0);
                    let pv_dn = down.get(trade).copied().unwrap_or(0.0);
                    let vega = (pv_up - pv_dn) / (2.0 * h);
                    if vega.abs() > self.config.threshold {
                        cube.push(sensitivity_row(trade, &factor, measure::VEGA, vega));
                    }
                }
            }
        }
        Ok(())
    }

    fn repriced_vol<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        factor: &FactorId,
        bump: f64,
    ) -> Result<BTreeMap<String, f64>, EngineError> {
        let mut state = model.state().clone();
        state
            .shift_vol(factor, Shift::absolute(bump))
            .map_err(risk_core::model::ModelError::from)?;
        let bumped = model.rebuild(state, model.portfolio().clone());
        pv_by_trade(&bumped, ccy)
    }

    fn theta_sensitivities<M: PvModel>(
        &self,
        model: &M,
        ccy: Currency,
        base: &BTreeMap<String, f64>,
        cube: &mut Cube,
    ) -> Result<(), EngineError> {
        let state = model.state();
        let mut rolled = state.clone();
        let horizon = state
            .as_of()
            .checked_add_days(Days::new(self.config.theta_days))
            .unwrap_or(state.as_of());
        rolled.roll_to(horizon);
        let moved = model.rebuild(rolled, model.portfolio().clone());
        let ahead = pv_by_trade(&moved, ccy)?;

        let dt_years = self.config.theta_days as f64 / 365.0;
        if dt_years == 0.0 {
            return Ok(());
        }
        for trade in base.keys() {
            let pv_ahead = ahead.get(trade).copied().unwrap_or(0.0);
            let theta = (pv_ahead - base[trade]) / dt_years;
            if theta.abs() > self.config.threshold {
                cube.push(Row::new(theta)
                    .with_text(Column::TradeId, trade.clone())
                    .with_text(Column::Measure, measure::THETA));
            }
        }
        Ok(())
    }
}

fn sensitivity_row(trade: &str, factor: &FactorId, measure_name: &str, value: f64) -> Row {
    Row::new(value)
        .with_text(Column::TradeId, trade)
        .with_text(Column::Underlying, factor.as_str())
        .with_text(Column::Measure, measure_name)
}

/// Per-trade PV totals, keyed by trade id text.
fn pv_by_trade<M: PvModel>(
    model: &M,
    ccy: Currency,
) -> Result<BTreeMap<String, f64>, EngineError> {
    let cube = model.pv(ccy)?;
    let mut out = BTreeMap::new();
    for row in cube.rows() {
        if let Some(id) = row.text(Column::TradeId) {
            *out.entry(id.to_string()).or_insert(0.0) += row.value();
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use risk_core::market::{Curve, CurvePoint, MarketState};
    use risk_core::model::LinearModel;
    use risk_core::portfolio::{ExposureProfile, Portfolio, Trade, TradeType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn model() -> LinearModel {
        let mut state = MarketState::new(d(2025, 6, 30));
        state.set_spot("SPX".into(), AssetClass::Equity, 5000.0);
        state.add_price_curve(
            "IR.USD.OIS".into(),
            AssetClass::Rates,
            Curve::new(vec![
                CurvePoint::new("1Y", d(2026, 6, 30), 0.040),
                CurvePoint::new("5Y", d(2030, 6, 30), 0.045),
            ])
            .unwrap(),
        );
        state.add_vol_surface(
            "VOL.EQ.SPX".into(),
            AssetClass::Equity,
            Curve::flat("1Y", d(2026, 6, 30), 0.20),
        );

        let trades = vec![
            Trade::new(
                "T1",
                TradeType::Option,
                Currency::USD,
                "SPX",
                2.0,
                d(2025, 6, 30),
                d(2026, 6, 30),
                ExposureProfile::with_base(0.0)
                    .spot_delta("SPX", 0.5)
                    .spot_gamma("SPX", 4e-6)
                    .vega("VOL.EQ.SPX", 25.0)
                    .theta(7.3),
            ),
            Trade::new(
                "T2",
                TradeType::Swap,
                Currency::USD,
                "IR.USD.OIS",
                1.0,
                d(2025, 6, 30),
                d(2030, 6, 30),
                ExposureProfile::with_base(0.0).curve_weight("IR.USD.OIS", "5Y", -10_000.0),
            ),
        ];
        LinearModel::new(state, Portfolio::new(trades).unwrap())
    }

    fn risk_cube() -> Cube {
        SensitivityCalculator::new(SensitivityConfig::default())
            .risk_cube(&model(), Currency::USD)
            .unwrap()
    }

    fn single_value(cube: &Cube, trade: &str, measure_name: &str) -> f64 {
        cube.filter_text(Column::TradeId, trade, false)
            .filter_text(Column::Measure, measure_name, false)
            .total()
    }

    #[test]
    fn test_spot_delta_and_gamma() {
        let cube = risk_cube();
        // notional 2 × (delta 0.5 + gamma-slope 4e-6 × 5000) = 1.04
        assert_relative_eq!(
            single_value(&cube, "T1", measure::DELTA),
            2.0 * (0.5 + 4e-6 * 5000.0),
            max_relative = 1e-6
        );
        // notional 2 × gamma 4e-6
        assert_relative_eq!(
            single_value(&cube, "T1", measure::GAMMA),
            2.0 * 4e-6,
            max_relative = 1e-4
        );
    }

    #[test]
    fn test_curve_pillar_delta_is_tagged_with_point() {
        let cube = risk_cube();
        let t2_delta = cube
            .filter_text(Column::TradeId, "T2", false)
            .filter_text(Column::Measure, measure::DELTA, false);
        assert_eq!(t2_delta.len(), 1);
        let row = &t2_delta.rows()[0];
        assert_eq!(row.text(Column::PointLabel), Some("5Y"));
        assert_eq!(row.text(Column::Underlying), Some("IR.USD.OIS"));
        assert!(row.tag(Column::PointDate).is_some());
        assert_relative_eq!(row.value(), -10_000.0, max_relative = 1e-6);
    }

    #[test]
    fn test_vega() {
        let cube = risk_cube();
        assert_relative_eq!(
            single_value(&cube, "T1", measure::VEGA),
            2.0 * 25.0,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_theta_per_year() {
        let cube = risk_cube();
        // Value decays at notional 2 × theta 7.3 per year.
        assert_relative_eq!(
            single_value(&cube, "T1", measure::THETA),
            -2.0 * 7.3,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_insensitive_pairs_are_dropped() {
        let cube = risk_cube();
        // T2 has no SPX exposure: no Delta row against SPX.
        let t2_spx = cube
            .filter_text(Column::TradeId, "T2", false)
            .filter_text(Column::Underlying, "SPX", false);
        assert!(t2_spx.is_empty());
    }
}
