//! Linear reference valuation model.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{ModelError, PvModel};
use crate::cube::{Column, Cube, Row};
use crate::market::{MarketDataError, MarketState};
use crate::portfolio::{Portfolio, Trade};
use crate::types::{Currency, FactorId};

/// Reference model: each trade is valued as its exposure profile applied
/// to the snapshot, discounted off a per-currency discount curve and
/// converted through FX spots.
///
/// Per unit of notional:
///
/// ```text
/// unit = base
///      + Σ delta_f · spot(f)
///      + ½ Σ gamma_f · spot(f)²
///      + Σ Σ weight_{c,p} · curve(c)[p]
///      + Σ vega_v · mean(vol(v))
///      − theta · yearfrac(inception, as_of)
///      + fixing_weight · Σ fixings(underlying) ≤ as_of
/// ```
///
/// then `value = notional · unit · df(ccy) − provision`, converted to the
/// reporting currency. Trades in a currency without a configured discount
/// curve are valued undiscounted.
///
/// The deliberate simplicity makes first/second-order explains exact for
/// the factor moves the profile is linear/quadratic in, which is what the
/// attribution test-suite leans on.
#[derive(Clone, Debug)]
pub struct LinearModel {
    state: MarketState,
    portfolio: Portfolio,
    discount_curves: BTreeMap<Currency, FactorId>,
}

fn year_fraction(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / 365.0
}

impl LinearModel {
    /// Creates a model with no discount curves configured.
    pub fn new(state: MarketState, portfolio: Portfolio) -> Self {
        Self {
            state,
            portfolio,
            discount_curves: BTreeMap::new(),
        }
    }

    /// Configures the discount curve for a currency (builder style).
    pub fn with_discount_curve(mut self, ccy: Currency, curve: impl Into<FactorId>) -> Self {
        self.discount_curves.insert(ccy, curve.into());
        self
    }

    fn unit_value(&self, trade: &Trade) -> Result<f64, ModelError> {
        let state = &self.state;
        let profile = &trade.profile;
        let mut unit = profile.base;

        for (factor, weight) in &profile.spot_deltas {
            let spot = state
                .spot(factor)
                .ok_or_else(|| MarketDataError::UnknownFactor(factor.clone()))?;
            unit += weight * spot;
        }
        for (factor, weight) in &profile.spot_gammas {
            let spot = state
                .spot(factor)
                .ok_or_else(|| MarketDataError::UnknownFactor(factor.clone()))?;
            unit += 0.5 * weight * spot * spot;
        }
        for (factor, pillars) in &profile.curve_weights {
            let curve = state
                .curve(factor)
                .ok_or_else(|| MarketDataError::UnknownFactor(factor.clone()))?;
            for (label, weight) in pillars {
                let value = curve.value_at(label).ok_or_else(|| {
                    MarketDataError::UnknownPillar {
                        curve: factor.clone(),
                        label: label.clone(),
                    }
                })?;
                unit += weight * value;
            }
        }
        for (factor, weight) in &profile.vegas {
            let vols = state
                .vol(factor)
                .ok_or_else(|| MarketDataError::UnknownFactor(factor.clone()))?;
            unit += weight * vols.mean_level();
        }

        unit -= profile.theta * year_fraction(trade.inception, state.as_of());
        unit += profile.fixing_weight * state.fixings_through(&trade.underlying, state.as_of());

        Ok(unit)
    }

    fn trade_value(
        &self,
        trade: &Trade,
        report_ccy: Currency,
        discounted: bool,
    ) -> Result<f64, ModelError> {
        let mut value = trade.notional * self.unit_value(trade)?;

        if discounted {
            if let Some(curve_id) = self.discount_curves.get(&trade.currency) {
                let curve = self
                    .state
                    .curve(curve_id)
                    .ok_or_else(|| MarketDataError::UnknownFactor(curve_id.clone()))?;
                let tau = year_fraction(self.state.as_of(), trade.maturity).max(0.0);
                value *= (-curve.mean_level() * tau).exp();
            }
        }

        value -= trade.provision;
        value *= self.state.fx_rate(trade.currency, report_ccy)?;

        if !value.is_finite() {
            return Err(ModelError::NonFinite {
                trade: trade.id.clone(),
            });
        }
        Ok(value)
    }

    fn value_cube(&self, ccy: Currency, discounted: bool) -> Result<Cube, ModelError> {
        let mut cube = Cube::new();
        for trade in self.portfolio.trades() {
            let value = self.trade_value(trade, ccy, discounted)?;
            cube.push(
                Row::new(value)
                    .with_text(Column::TradeId, trade.id.as_str())
                    .with_text(Column::TradeType, trade.trade_type.name())
                    .with_text(Column::Currency, ccy.code())
                    .with_text(Column::Underlying, trade.underlying.as_str()),
            );
        }
        Ok(cube)
    }
}

impl PvModel for LinearModel {
    fn pv(&self, ccy: Currency) -> Result<Cube, ModelError> {
        self.value_cube(ccy, true)
    }

    fn fv(&self, ccy: Currency) -> Result<Cube, ModelError> {
        self.value_cube(ccy, false)
    }

    fn state(&self) -> &MarketState {
        &self.state
    }

    fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    fn rebuild(&self, state: MarketState, portfolio: Portfolio) -> Self {
        Self {
            state,
            portfolio,
            discount_curves: self.discount_curves.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{AssetClass, Curve, CurvePoint};
    use crate::portfolio::{ExposureProfile, TradeType};
    use crate::shift::Shift;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn state() -> MarketState {
        let mut state = MarketState::new(d(2025, 6, 30));
        state.set_spot("SPX".into(), AssetClass::Equity, 5000.0);
        state.set_spot("EURUSD".into(), AssetClass::Fx, 1.25);
        state.add_price_curve(
            "IR.USD.OIS".into(),
            AssetClass::Rates,
            Curve::new(vec![
                CurvePoint::new("1Y", d(2026, 6, 30), 0.04),
                CurvePoint::new("2Y", d(2027, 6, 30), 0.04),
            ])
            .unwrap(),
        );
        state.add_vol_surface(
            "VOL.EQ.SPX".into(),
            AssetClass::Equity,
            Curve::flat("1Y", d(2026, 6, 30), 0.20),
        );
        state
    }

    fn spx_delta_trade() -> Trade {
        Trade::new(
            "T1",
            TradeType::Forward,
            Currency::USD,
            "SPX",
            2.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0).spot_delta("SPX", 1.0),
        )
    }

    #[test]
    fn test_undiscounted_linear_value() {
        let model = LinearModel::new(
            state(),
            Portfolio::new(vec![spx_delta_trade()]).unwrap(),
        );
        // No discount curve configured: pv == fv == 2 × 5000.
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), 10_000.0);
        assert_relative_eq!(model.fv(Currency::USD).unwrap().total(), 10_000.0);
    }

    #[test]
    fn test_discounting_applies_per_currency_curve() {
        let model = LinearModel::new(
            state(),
            Portfolio::new(vec![spx_delta_trade()]).unwrap(),
        )
        .with_discount_curve(Currency::USD, "IR.USD.OIS");
        let pv = model.pv(Currency::USD).unwrap().total();
        let expected = 10_000.0 * (-0.04_f64 * 1.0).exp();
        assert_relative_eq!(pv, expected, max_relative = 1e-3);
        // FV stays undiscounted.
        assert_relative_eq!(model.fv(Currency::USD).unwrap().total(), 10_000.0);
    }

    #[test]
    fn test_fx_conversion_of_eur_trade() {
        let trade = Trade::new(
            "T2",
            TradeType::Forward,
            Currency::EUR,
            "SPX",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(100.0),
        );
        let model = LinearModel::new(state(), Portfolio::new(vec![trade]).unwrap());
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), 125.0);
        assert_relative_eq!(model.pv(Currency::EUR).unwrap().total(), 100.0);
    }

    #[test]
    fn test_gamma_and_vega_terms() {
        let trade = Trade::new(
            "T3",
            TradeType::Option,
            Currency::USD,
            "SPX",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0)
                .spot_gamma("SPX", 2e-6)
                .vega("VOL.EQ.SPX", 50.0),
        );
        let model = LinearModel::new(state(), Portfolio::new(vec![trade]).unwrap());
        let expected = 0.5 * 2e-6 * 5000.0_f64.powi(2) + 50.0 * 0.20;
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), expected);
    }

    #[test]
    fn test_theta_decay_on_roll() {
        let trade = Trade::new(
            "T4",
            TradeType::Option,
            Currency::USD,
            "SPX",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(100.0).theta(36.5),
        );
        let portfolio = Portfolio::new(vec![trade]).unwrap();
        let model = LinearModel::new(state(), portfolio.clone());
        let pv0 = model.pv(Currency::USD).unwrap().total();

        let mut rolled = model.state().clone();
        rolled.roll_to(d(2025, 7, 10));
        let later = model.rebuild(rolled, portfolio);
        let pv1 = later.pv(Currency::USD).unwrap().total();
        // 10 days of decay at 36.5 / year = 1.0.
        assert_relative_eq!(pv0 - pv1, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn test_fixings_enter_value_once_published() {
        let trade = Trade::new(
            "T5",
            TradeType::Swap,
            Currency::USD,
            "SOFR",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0).fixing_weight(1000.0),
        );
        let portfolio = Portfolio::new(vec![trade]).unwrap();
        let model = LinearModel::new(state(), portfolio.clone());
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), 0.0);

        let mut with_fixing = model.state().clone();
        with_fixing.add_fixing("SOFR".into(), d(2025, 6, 15), 0.05);
        let fixed = model.rebuild(with_fixing, portfolio);
        assert_relative_eq!(fixed.pv(Currency::USD).unwrap().total(), 50.0);
    }

    #[test]
    fn test_provision_subtracted() {
        let trade = spx_delta_trade().with_provision(500.0);
        let model = LinearModel::new(state(), Portfolio::new(vec![trade]).unwrap());
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), 9_500.0);
    }

    #[test]
    fn test_missing_factor_is_error() {
        let trade = Trade::new(
            "T6",
            TradeType::Forward,
            Currency::USD,
            "NIKKEI",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0).spot_delta("NIKKEI", 1.0),
        );
        let model = LinearModel::new(state(), Portfolio::new(vec![trade]).unwrap());
        assert!(matches!(
            model.pv(Currency::USD),
            Err(ModelError::MarketData(MarketDataError::UnknownFactor(_)))
        ));
    }

    #[test]
    fn test_rebuild_is_pure() {
        let portfolio = Portfolio::new(vec![spx_delta_trade()]).unwrap();
        let model = LinearModel::new(state(), portfolio.clone())
            .with_discount_curve(Currency::USD, "IR.USD.OIS");
        let pv_before = model.pv(Currency::USD).unwrap().total();

        let mut bumped = model.state().clone();
        bumped.shift_spot(&"SPX".into(), Shift::relative(0.10)).unwrap();
        let rebuilt = model.rebuild(bumped, portfolio);

        // Original model untouched; rebuilt model keeps discount config.
        assert_relative_eq!(model.pv(Currency::USD).unwrap().total(), pv_before);
        assert_relative_eq!(
            rebuilt.pv(Currency::USD).unwrap().total(),
            pv_before * 1.10,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_pv_rows_are_tagged_per_trade() {
        let model = LinearModel::new(
            state(),
            Portfolio::new(vec![spx_delta_trade()]).unwrap(),
        );
        let pv = model.pv(Currency::USD).unwrap();
        assert_eq!(pv.len(), 1);
        let row = &pv.rows()[0];
        assert_eq!(row.text(Column::TradeId), Some("T1"));
        assert_eq!(row.text(Column::TradeType), Some("Forward"));
        assert_eq!(row.text(Column::Currency), Some("USD"));
        assert_eq!(row.text(Column::Underlying), Some("SPX"));
    }
}
