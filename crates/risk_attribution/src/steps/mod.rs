//! The waterfall's step state machine.
//!
//! Steps form a closed variant set with one shared contract: consume the
//! current model and the last intermediate valuation, book contribution
//! rows, and hand back the next `(model, valuation)` pair. Market-state
//! mutation always happens on a clone taken inside the step — the step
//! boundary never passes a mutable reference.

mod activity;
mod alignment;
mod closing;
mod market_steps;
mod time_roll;

use std::collections::BTreeMap;

use risk_core::cube::{Column, Cube};
use risk_core::model::PvModel;
use risk_core::portfolio::Portfolio;
use risk_core::types::Currency;

use crate::ledger::{step_row, Ledger, UNEXPLAINED};
use crate::AttributionError;

/// The ordered step vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// New, terminated and amended trades.
    Activity,
    /// Reserve level changes.
    Provisions,
    /// As-of roll: theta decay and newly published fixings.
    TimeRoll,
    /// Interest rate curve moves, one curve at a time.
    IrCurve,
    /// FX spot moves, one pair at a time.
    FxSpot,
    /// FX volatility moves.
    FxVol,
    /// Asset (equity/commodity) spot and forward-curve moves.
    AssetCurve,
    /// Asset volatility moves.
    AssetVega,
    /// Alignment of selected trades to external marks.
    ExternalAlignment,
    /// The closing catch-all residual against the end valuation.
    Final,
}

impl StepKind {
    /// Step name used in the ledger's `Step` column.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Activity => "Activity",
            StepKind::Provisions => "Provisions",
            StepKind::TimeRoll => "TimeRoll",
            StepKind::IrCurve => "IrCurve",
            StepKind::FxSpot => "FxSpot",
            StepKind::FxVol => "FxVol",
            StepKind::AssetCurve => "AssetCurve",
            StepKind::AssetVega => "AssetVega",
            StepKind::ExternalAlignment => "ExternalAlignment",
            StepKind::Final => "Final",
        }
    }
}

/// One waterfall step.
///
/// The only variant carrying data is [`AttributionStep::ExternalAlignment`],
/// whose marks cube holds the externally sourced per-trade values.
#[derive(Clone, Debug)]
pub enum AttributionStep {
    /// Swap to the end trade population (start provisions carried over).
    Activity,
    /// Carry the end portfolio's provision levels.
    Provisions,
    /// Roll the as-of date and absorb end-state fixings.
    TimeRoll,
    /// Move every rates-class curve to its end shape.
    IrCurve,
    /// Move every FX spot to its end level.
    FxSpot,
    /// Move every FX vol vector to its end shape.
    FxVol,
    /// Move asset spots and forward curves to their end levels.
    AssetCurve,
    /// Move asset vol vectors to their end shapes.
    AssetVega,
    /// Align marked trades to external values.
    ExternalAlignment {
        /// Per-trade external marks (`TradeId` + value, optional
        /// `source` metadata).
        marks: Cube,
    },
    /// Close the waterfall against the end valuation.
    Final,
}

impl AttributionStep {
    /// The step's kind.
    pub fn kind(&self) -> StepKind {
        match self {
            AttributionStep::Activity => StepKind::Activity,
            AttributionStep::Provisions => StepKind::Provisions,
            AttributionStep::TimeRoll => StepKind::TimeRoll,
            AttributionStep::IrCurve => StepKind::IrCurve,
            AttributionStep::FxSpot => StepKind::FxSpot,
            AttributionStep::FxVol => StepKind::FxVol,
            AttributionStep::AssetCurve => StepKind::AssetCurve,
            AttributionStep::AssetVega => StepKind::AssetVega,
            AttributionStep::ExternalAlignment { .. } => StepKind::ExternalAlignment,
            AttributionStep::Final => StepKind::Final,
        }
    }

    /// Runs the step: book rows, mutate the working state for this
    /// step's driver only, and return the next `(model, valuation)`.
    pub(crate) fn apply<M: PvModel>(
        &self,
        model: M,
        end: &M,
        ledger: &mut Ledger,
        last_pv: Cube,
        risk_cube: &Cube,
        ccy: Currency,
    ) -> Result<(M, Cube), AttributionError> {
        match self {
            AttributionStep::Activity => activity::activity(model, end, ledger, last_pv, ccy),
            AttributionStep::Provisions => {
                activity::provisions(model, end, ledger, last_pv, ccy)
            }
            AttributionStep::TimeRoll => {
                time_roll::time_roll(model, end, ledger, last_pv, risk_cube, ccy)
            }
            AttributionStep::IrCurve
            | AttributionStep::FxSpot
            | AttributionStep::FxVol
            | AttributionStep::AssetCurve
            | AttributionStep::AssetVega => market_steps::run(
                self.kind(),
                model,
                end,
                ledger,
                last_pv,
                risk_cube,
                ccy,
            ),
            AttributionStep::ExternalAlignment { marks } => {
                alignment::align(model, ledger, last_pv, marks)
            }
            AttributionStep::Final => closing::close(model, end, ledger, last_pv, ccy),
        }
    }
}

/// Reprices a model, treating any non-finite value as a fatal divergence.
pub(crate) fn reprice<M: PvModel>(
    model: &M,
    ccy: Currency,
    step: &'static str,
) -> Result<Cube, AttributionError> {
    let cube = model.pv(ccy)?;
    if cube.has_non_finite() {
        return Err(AttributionError::NumericalDivergence { step });
    }
    Ok(cube)
}

/// Books the per-trade residual: actual repriced move minus the step's
/// Taylor estimates, over the **union** of repriced and estimated trades.
///
/// Iterating the union is what captures overspill — a factor that moved
/// PnL for a trade the Taylor rows never touched still lands here, and a
/// Taylor estimate for a trade the reprice left unmoved is backed out.
pub(crate) fn append_residuals(
    ledger: &mut Ledger,
    portfolio: &Portfolio,
    step: &'static str,
    sub_step: Option<&str>,
    actual_by_trade: &Cube,
    explained: &BTreeMap<String, f64>,
) {
    let mut residual: BTreeMap<String, f64> = BTreeMap::new();
    for row in actual_by_trade.rows() {
        if let Some(trade) = row.text(Column::TradeId) {
            *residual.entry(trade.to_string()).or_insert(0.0) += row.value();
        }
    }
    for (trade, estimate) in explained {
        *residual.entry(trade.clone()).or_insert(0.0) -= estimate;
    }
    for (trade, value) in residual {
        if value == 0.0 {
            continue;
        }
        let mut row = step_row(step, &trade, portfolio, value)
            .with_text(Column::SubSubStep, UNEXPLAINED);
        if let Some(sub) = sub_step {
            row = row.with_text(Column::SubStep, sub);
        }
        ledger.append(row);
    }
}
