//! External mark alignment.
//!
//! Aligns selected trades' intermediate valuations to externally sourced
//! marks. The step books the per-trade `mark − model` difference and
//! adjusts the intermediate valuation cube by the same amount, so the
//! ledger keeps telescoping; the closing step later reconciles against
//! the end model, re-absorbing the alignment into the catch-all
//! residual. The adjustment rows carry only the trade id tag and align
//! with the model's fully-tagged rows purely through the forgiving
//! difference semantics.

use risk_core::cube::{Column, Cube, Row};
use risk_core::model::PvModel;

use super::StepKind;
use crate::ledger::{step_row, Ledger};
use crate::AttributionError;

pub(crate) fn align<M: PvModel>(
    model: M,
    ledger: &mut Ledger,
    last_pv: Cube,
    marks: &Cube,
) -> Result<(M, Cube), AttributionError> {
    let step = StepKind::ExternalAlignment.name();
    if marks.is_empty() {
        return Ok((model, last_pv));
    }

    let by_trade = last_pv.pivot(Column::TradeId);
    let mut aligned = last_pv;
    for mark in marks.rows() {
        let Some(trade) = mark.text(Column::TradeId) else {
            continue;
        };
        let model_value = by_trade.filter_text(Column::TradeId, trade, false).total();
        let diff = mark.value() - model_value;
        if diff == 0.0 {
            continue;
        }
        let mut booked = step_row(step, trade, model.portfolio(), diff)
            .with_text(Column::SubStep, "Mark");
        if let Some(source) = mark.meta("source") {
            booked = booked.with_meta("source", source);
        }
        ledger.append(booked);
        aligned.push(Row::new(diff).with_text(Column::TradeId, trade));
    }
    Ok((model, aligned))
}
