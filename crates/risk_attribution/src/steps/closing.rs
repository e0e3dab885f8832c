//! The closing step.
//!
//! Whatever difference remains between the fully-rolled end model's
//! valuation and the last intermediate cube is dumped, untagged by
//! sub-step, into the catch-all `Unexplained` bucket. This is what makes
//! the ledger total exactly the start-to-end PnL regardless of how well
//! the preceding steps explained their factors.

use std::collections::BTreeMap;

use risk_core::cube::{Column, Cube};
use risk_core::model::PvModel;
use risk_core::types::Currency;

use super::{append_residuals, reprice, StepKind};
use crate::ledger::Ledger;
use crate::AttributionError;

pub(crate) fn close<M: PvModel>(
    model: M,
    end: &M,
    ledger: &mut Ledger,
    last_pv: Cube,
    ccy: Currency,
) -> Result<(M, Cube), AttributionError> {
    let step = StepKind::Final.name();
    let pv = reprice(end, ccy, step)?;

    let actual = pv.difference(&last_pv).pivot(Column::TradeId);
    // No Taylor estimates here: the whole remainder is residual.
    append_residuals(
        ledger,
        end.portfolio(),
        step,
        None,
        &actual,
        &BTreeMap::new(),
    );

    let final_model = model.rebuild(end.state().clone(), end.portfolio().clone());
    Ok((final_model, pv))
}
