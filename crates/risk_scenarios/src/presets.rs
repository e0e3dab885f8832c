//! Preset stress bump sets.
//!
//! Ready-made single-date shocks for common stress analyses. Each preset
//! expands against a concrete market state into a [`BumpSet`] covering
//! every registered factor of the relevant asset class, which then feeds
//! the deterministic generator like any historical bump set.

use chrono::NaiveDate;

use risk_core::market::{AssetClass, MarketState};

use crate::bumps::{BumpSeries, BumpSet, BumpStyle, BumpTarget, BumpValue};

/// Preset stress shocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresetStress {
    /// All rate curves +1bp parallel.
    RatesUp1Bp,
    /// All rate curves +10bp parallel.
    RatesUp10Bp,
    /// All rate curves +100bp parallel.
    RatesUp100Bp,
    /// All rate curves −100bp parallel.
    RatesDown100Bp,
    /// Equity spots −10%.
    EquityDown10Pct,
    /// Equity spots −20%.
    EquityDown20Pct,
    /// FX spots −10% (base currency weakens).
    FxDown10Pct,
    /// All vol vectors +5 points.
    VolUp5Pts,
}

impl PresetStress {
    /// The standard stress battery.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::RatesUp100Bp,
            Self::RatesDown100Bp,
            Self::EquityDown20Pct,
            Self::FxDown10Pct,
            Self::VolUp5Pts,
        ]
    }

    /// Human-readable name, used as the scenario label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RatesUp1Bp => "IR +1bp",
            Self::RatesUp10Bp => "IR +10bp",
            Self::RatesUp100Bp => "IR +100bp",
            Self::RatesDown100Bp => "IR -100bp",
            Self::EquityDown10Pct => "Equity -10%",
            Self::EquityDown20Pct => "Equity -20%",
            Self::FxDown10Pct => "FX -10%",
            Self::VolUp5Pts => "Vol +5pts",
        }
    }

    /// Description for reporting.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RatesUp1Bp => "Parallel interest rate shift +1 basis point",
            Self::RatesUp10Bp => "Parallel interest rate shift +10 basis points",
            Self::RatesUp100Bp => "Parallel interest rate shift +100 basis points",
            Self::RatesDown100Bp => "Parallel interest rate shift -100 basis points",
            Self::EquityDown10Pct => "Equity prices decline 10%",
            Self::EquityDown20Pct => "Equity prices decline 20%",
            Self::FxDown10Pct => "Base currency weakens 10%",
            Self::VolUp5Pts => "Implied volatility increases 5 percentage points",
        }
    }

    /// Expands the preset against a market state into a one-date bump
    /// set over every registered factor of the relevant class.
    pub fn bump_set(&self, state: &MarketState, date: NaiveDate) -> BumpSet {
        let mut set = BumpSet::new();
        match self {
            Self::RatesUp1Bp => rate_shock(state, date, 0.0001, &mut set),
            Self::RatesUp10Bp => rate_shock(state, date, 0.001, &mut set),
            Self::RatesUp100Bp => rate_shock(state, date, 0.01, &mut set),
            Self::RatesDown100Bp => rate_shock(state, date, -0.01, &mut set),
            Self::EquityDown10Pct => spot_shock(state, AssetClass::Equity, date, -0.10, &mut set),
            Self::EquityDown20Pct => spot_shock(state, AssetClass::Equity, date, -0.20, &mut set),
            Self::FxDown10Pct => spot_shock(state, AssetClass::Fx, date, -0.10, &mut set),
            Self::VolUp5Pts => vol_shock(state, date, 0.05, &mut set),
        }
        set
    }
}

fn rate_shock(state: &MarketState, date: NaiveDate, bump: f64, set: &mut BumpSet) {
    for factor in state.curve_factors(AssetClass::Rates) {
        set.add(
            BumpSeries::new(factor, BumpTarget::Curve, BumpStyle::Absolute)
                .with_bump(date, BumpValue::Scalar(bump)),
        );
    }
}

fn spot_shock(
    state: &MarketState,
    class: AssetClass,
    date: NaiveDate,
    bump: f64,
    set: &mut BumpSet,
) {
    for factor in state.spot_factors(class) {
        set.add(
            BumpSeries::new(factor, BumpTarget::Spot, BumpStyle::Relative)
                .with_bump(date, BumpValue::Scalar(bump)),
        );
    }
}

fn vol_shock(state: &MarketState, date: NaiveDate, bump: f64, set: &mut BumpSet) {
    for class in [AssetClass::Fx, AssetClass::Equity, AssetClass::Commodity] {
        for factor in state.vol_factors(class) {
            set.add(
                BumpSeries::new(factor, BumpTarget::Vol, BumpStyle::Absolute)
                    .with_bump(date, BumpValue::Scalar(bump)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::historical::HistoricalGenerator;
    use approx::assert_relative_eq;
    use risk_core::market::{Curve, CurvePoint};
    use risk_core::model::{LinearModel, PvModel};
    use risk_core::portfolio::Portfolio;
    use risk_core::types::ScenarioId;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn state() -> MarketState {
        let mut state = MarketState::new(d(2025, 6, 30));
        state.set_spot("SPX".into(), AssetClass::Equity, 5000.0);
        state.set_spot("EURUSD".into(), AssetClass::Fx, 1.10);
        state.add_price_curve(
            "IR.USD.OIS".into(),
            AssetClass::Rates,
            Curve::new(vec![CurvePoint::new("1Y", d(2026, 6, 30), 0.04)]).unwrap(),
        );
        state.add_vol_surface(
            "VOL.EQ.SPX".into(),
            AssetClass::Equity,
            Curve::flat("1Y", d(2026, 6, 30), 0.20),
        );
        state
    }

    #[test]
    fn test_preset_covers_class_factors() {
        let set = PresetStress::EquityDown20Pct.bump_set(&state(), d(2025, 6, 30));
        assert_eq!(set.series().len(), 1);
        assert_eq!(set.series()[0].factor().as_str(), "SPX");
    }

    #[test]
    fn test_preset_applies_through_generator() {
        let base = LinearModel::new(state(), Portfolio::empty());
        let date = d(2025, 6, 30);
        let set = PresetStress::RatesUp100Bp.bump_set(base.state(), date);
        let scenarios = HistoricalGenerator::new(set).generate(&base);
        let shocked = scenarios[&ScenarioId::new("2025-06-30")].state();
        assert_relative_eq!(
            shocked.curve(&"IR.USD.OIS".into()).unwrap().value_at("1Y").unwrap(),
            0.05
        );
    }

    #[test]
    fn test_vol_preset_hits_vol_vectors() {
        let set = PresetStress::VolUp5Pts.bump_set(&state(), d(2025, 6, 30));
        assert_eq!(set.series().len(), 1);
        assert_eq!(set.series()[0].factor().as_str(), "VOL.EQ.SPX");
    }

    #[test]
    fn test_names_and_battery() {
        assert_eq!(PresetStress::FxDown10Pct.name(), "FX -10%");
        assert!(!PresetStress::standard().is_empty());
        for preset in PresetStress::standard() {
            assert!(!preset.description().is_empty());
        }
    }
}
