//! The ordered attribution waterfall.

use tracing::info;

use risk_core::cube::{Column, Cube};
use risk_core::model::PvModel;
use risk_core::types::Currency;

use crate::ledger::{Ledger, UNEXPLAINED};
use crate::steps::AttributionStep;
use crate::AttributionError;

/// The full waterfall result.
#[derive(Clone, Debug)]
pub struct AttributionReport {
    /// Every booked contribution, tagged by step/sub-step.
    pub ledger: Cube,
    /// Total start valuation.
    pub start_pv: f64,
    /// Total end valuation.
    pub end_pv: f64,
}

impl AttributionReport {
    /// Sum of every booked contribution. After a complete waterfall this
    /// equals `end_pv − start_pv` up to floating-point tolerance.
    pub fn total(&self) -> f64 {
        self.ledger.total()
    }

    /// Sum of the Taylor-explained and activity contributions.
    pub fn explained(&self) -> f64 {
        self.ledger
            .filter_text(Column::SubSubStep, UNEXPLAINED, true)
            .total()
    }

    /// Sum of every residual row.
    pub fn unexplained(&self) -> f64 {
        self.ledger
            .filter_text(Column::SubSubStep, UNEXPLAINED, false)
            .total()
    }
}

/// An ordered list of attribution steps sharing one progressively rolled
/// model.
///
/// Steps run strictly sequentially — each depends on the market-state
/// mutation of the previous one. The per-step explained/unexplained
/// split depends on the order; the final total does not, as long as the
/// closing step runs last.
///
/// # Examples
///
/// ```
/// use risk_attribution::Waterfall;
/// use risk_core::types::Currency;
///
/// let waterfall = Waterfall::standard(Currency::USD);
/// assert_eq!(waterfall.steps().len(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct Waterfall {
    steps: Vec<AttributionStep>,
    reporting_ccy: Currency,
}

impl Waterfall {
    /// The standard step order: Activity → Provisions → TimeRoll →
    /// IrCurve → FxSpot → FxVol → AssetCurve → AssetVega →
    /// ExternalAlignment (no marks) → Final.
    pub fn standard(reporting_ccy: Currency) -> Self {
        Self {
            steps: vec![
                AttributionStep::Activity,
                AttributionStep::Provisions,
                AttributionStep::TimeRoll,
                AttributionStep::IrCurve,
                AttributionStep::FxSpot,
                AttributionStep::FxVol,
                AttributionStep::AssetCurve,
                AttributionStep::AssetVega,
                AttributionStep::ExternalAlignment { marks: Cube::new() },
                AttributionStep::Final,
            ],
            reporting_ccy,
        }
    }

    /// A waterfall with a custom step order. The caller is responsible
    /// for ending with [`AttributionStep::Final`]; without it the ledger
    /// does not close against the end valuation.
    pub fn new(steps: Vec<AttributionStep>, reporting_ccy: Currency) -> Self {
        Self {
            steps,
            reporting_ccy,
        }
    }

    /// Replaces the alignment step's marks cube (builder style).
    pub fn with_marks(mut self, marks: Cube) -> Self {
        for step in &mut self.steps {
            if let AttributionStep::ExternalAlignment { marks: slot } = step {
                *slot = marks;
                break;
            }
        }
        self
    }

    /// The configured steps, in execution order.
    pub fn steps(&self) -> &[AttributionStep] {
        &self.steps
    }

    /// Runs the waterfall from `start` to `end`.
    ///
    /// `risk_cube` supplies the sensitivity rows the Taylor estimates
    /// read (`Measure`/`Underlying`/`PointLabel` convention). The start
    /// model is consumed — each step passes ownership of the working
    /// model to the next.
    pub fn run<M: PvModel>(
        &self,
        start: M,
        end: &M,
        risk_cube: &Cube,
    ) -> Result<AttributionReport, AttributionError> {
        let ccy = self.reporting_ccy;
        let mut model = start;
        let mut last_pv = crate::steps::reprice(&model, ccy, "Start")?;
        let start_pv = last_pv.total();
        let mut ledger = Ledger::new();

        info!(steps = self.steps.len(), "running attribution waterfall");
        for step in &self.steps {
            let (next_model, next_pv) =
                step.apply(model, end, &mut ledger, last_pv, risk_cube, ccy)?;
            model = next_model;
            last_pv = next_pv;
        }

        let end_pv = crate::steps::reprice(end, ccy, "End")?.total();
        Ok(AttributionReport {
            ledger: ledger.into_cube(),
            start_pv,
            end_pv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use risk_core::cube::Row;
    use risk_core::market::{AssetClass, MarketState};
    use risk_core::model::LinearModel;
    use risk_core::portfolio::{ExposureProfile, Portfolio, Trade, TradeType};
    use risk_core::types::Currency;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn spot_state(spx: f64) -> MarketState {
        let mut state = MarketState::new(d(2025, 6, 30));
        state.set_spot("SPX".into(), AssetClass::Equity, spx);
        state
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(vec![Trade::new(
            "T1",
            TradeType::Forward,
            Currency::USD,
            "SPX",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0).spot_delta("SPX", 1.0),
        )])
        .unwrap()
    }

    #[test]
    fn test_single_factor_move_fully_explained_by_delta() {
        let start = LinearModel::new(spot_state(5000.0), portfolio());
        let end = start.rebuild(spot_state(5100.0), portfolio());

        // Exact delta row: the AssetCurve step should explain the whole
        // move and book no residual.
        let risk_cube = Cube::from_rows(vec![Row::new(1.0)
            .with_text(Column::TradeId, "T1")
            .with_text(Column::Underlying, "SPX")
            .with_text(Column::Measure, risk_core::cube::measure::DELTA)]);

        let report = Waterfall::standard(Currency::USD)
            .run(start, &end, &risk_cube)
            .unwrap();

        assert_relative_eq!(report.total(), 100.0, max_relative = 1e-9);
        assert_relative_eq!(report.explained(), 100.0, max_relative = 1e-9);
        assert_relative_eq!(report.unexplained(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(report.end_pv - report.start_pv, 100.0, max_relative = 1e-9);
    }

    #[test]
    fn test_missing_sensitivity_lands_in_residual() {
        let start = LinearModel::new(spot_state(5000.0), portfolio());
        let end = start.rebuild(spot_state(5100.0), portfolio());

        // Empty risk cube: nothing is explained, everything lands in the
        // factor's residual, and the total still closes.
        let report = Waterfall::standard(Currency::USD)
            .run(start, &end, &Cube::new())
            .unwrap();

        assert_relative_eq!(report.total(), 100.0, max_relative = 1e-9);
        assert_relative_eq!(report.explained(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(report.unexplained(), 100.0, max_relative = 1e-9);
    }

    #[test]
    fn test_with_marks_replaces_alignment_cube() {
        let marks = Cube::from_rows(vec![Row::new(42.0).with_text(Column::TradeId, "T1")]);
        let waterfall = Waterfall::standard(Currency::USD).with_marks(marks);
        let has_marks = waterfall.steps().iter().any(|s| {
            matches!(s, AttributionStep::ExternalAlignment { marks } if !marks.is_empty())
        });
        assert!(has_marks);
    }

    #[test]
    fn test_empty_waterfall_books_nothing() {
        let start = LinearModel::new(spot_state(5000.0), portfolio());
        let end = start.rebuild(spot_state(5000.0), portfolio());
        let report = Waterfall::new(vec![AttributionStep::Final], Currency::USD)
            .run(start, &end, &Cube::new())
            .unwrap();
        assert_relative_eq!(report.total(), 0.0, epsilon = 1e-12);
    }
}
