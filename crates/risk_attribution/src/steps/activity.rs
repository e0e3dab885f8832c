//! Trade activity and provision steps.
//!
//! Both steps move the portfolio, not the market: Activity swaps to the
//! end trade population (carrying the start's provision levels so the
//! Provisions step books those separately), Provisions then carries the
//! end provision levels onto the current population. The per-trade
//! repriced difference is the contribution; there is no Taylor estimate
//! and no residual.

use std::collections::BTreeSet;

use risk_core::cube::{Column, Cube};
use risk_core::model::PvModel;
use risk_core::types::Currency;

use super::{reprice, StepKind};
use crate::ledger::{step_row, Ledger};
use crate::AttributionError;

pub(crate) fn activity<M: PvModel>(
    model: M,
    end: &M,
    ledger: &mut Ledger,
    last_pv: Cube,
    ccy: Currency,
) -> Result<(M, Cube), AttributionError> {
    let step = StepKind::Activity.name();
    let start_ids: BTreeSet<String> = model
        .portfolio()
        .trade_ids()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();
    let start_portfolio = model.portfolio().clone();

    // End population, start provision levels where the trade already
    // existed; new trades arrive with their end provisions.
    let target = end.portfolio().with_provisions_from(model.portfolio());
    let new_model = model.rebuild(model.state().clone(), target);
    let pv = reprice(&new_model, ccy, step)?;

    let end_ids: BTreeSet<String> = new_model
        .portfolio()
        .trade_ids()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();

    let actual = pv.difference(&last_pv).pivot(Column::TradeId);
    for row in actual.rows() {
        let Some(trade) = row.text(Column::TradeId) else {
            continue;
        };
        if row.value() == 0.0 {
            continue;
        }
        let sub_step = if !start_ids.contains(trade) && end_ids.contains(trade) {
            "New"
        } else if !end_ids.contains(trade) {
            "Terminated"
        } else {
            "Amended"
        };
        // Terminated trades only exist in the start portfolio, so the
        // trade-type lookup goes there.
        let lookup = if end_ids.contains(trade) {
            new_model.portfolio()
        } else {
            &start_portfolio
        };
        ledger.append(
            step_row(step, trade, lookup, row.value()).with_text(Column::SubStep, sub_step),
        );
    }
    Ok((new_model, pv))
}

pub(crate) fn provisions<M: PvModel>(
    model: M,
    end: &M,
    ledger: &mut Ledger,
    last_pv: Cube,
    ccy: Currency,
) -> Result<(M, Cube), AttributionError> {
    let step = StepKind::Provisions.name();
    let target = model.portfolio().with_provisions_from(end.portfolio());
    let new_model = model.rebuild(model.state().clone(), target);
    let pv = reprice(&new_model, ccy, step)?;

    let actual = pv.difference(&last_pv).pivot(Column::TradeId);
    for row in actual.rows() {
        let Some(trade) = row.text(Column::TradeId) else {
            continue;
        };
        if row.value() == 0.0 {
            continue;
        }
        ledger.append(
            step_row(step, trade, new_model.portfolio(), row.value())
                .with_text(Column::SubStep, "Reserve"),
        );
    }
    Ok((new_model, pv))
}
