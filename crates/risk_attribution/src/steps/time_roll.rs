//! The time-roll step: theta decay and newly published fixings.

use std::collections::BTreeMap;

use risk_core::cube::{measure, Column, Cube};
use risk_core::model::PvModel;
use risk_core::types::Currency;

use super::{append_residuals, reprice, StepKind};
use crate::ledger::{step_row, Ledger};
use crate::AttributionError;

const SUB_STEP: &str = "Roll";

pub(crate) fn time_roll<M: PvModel>(
    model: M,
    end: &M,
    ledger: &mut Ledger,
    last_pv: Cube,
    risk_cube: &Cube,
    ccy: Currency,
) -> Result<(M, Cube), AttributionError> {
    let step = StepKind::TimeRoll.name();
    let dt_years =
        (end.state().as_of() - model.state().as_of()).num_days() as f64 / 365.0;

    let mut explained: BTreeMap<String, f64> = BTreeMap::new();
    if dt_years != 0.0 {
        for row in risk_cube
            .filter_text(Column::Measure, measure::THETA, false)
            .rows()
        {
            let Some(trade) = row.text(Column::TradeId) else {
                continue;
            };
            let estimate = row.value() * dt_years;
            ledger.append(
                step_row(step, trade, model.portfolio(), estimate)
                    .with_text(Column::SubStep, SUB_STEP)
                    .with_text(Column::SubSubStep, measure::THETA),
            );
            *explained.entry(trade.to_string()).or_insert(0.0) += estimate;
        }
    }

    // Roll the working copy and pick up fixings published since the
    // start as-of; the fixing PnL lands in the residual.
    let mut state = model.state().clone();
    state.roll_to(end.state().as_of());
    state.absorb_fixings_from(end.state());
    let new_model = model.rebuild(state, model.portfolio().clone());
    let pv = reprice(&new_model, ccy, step)?;

    let actual = pv.difference(&last_pv).pivot(Column::TradeId);
    append_residuals(
        ledger,
        new_model.portfolio(),
        step,
        Some(SUB_STEP),
        &actual,
        &explained,
    );
    Ok((new_model, pv))
}
