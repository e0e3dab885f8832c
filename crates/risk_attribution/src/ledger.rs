//! The append-only attribution ledger.

use risk_core::cube::{Column, Cube, Row};
use risk_core::portfolio::Portfolio;
use risk_core::types::TradeId;

/// Sub-sub-step marker for residual rows.
pub const UNEXPLAINED: &str = "Unexplained";

/// A growing result cube to which every waterfall step appends rows.
///
/// Rows are tagged with `{TradeId, TradeType, Step, SubStep, SubSubStep,
/// PointLabel, PointDate, Underlying}` as applicable and are never
/// mutated after appending. Summing the ledger after the full waterfall
/// yields the total PnL between the start and end valuations.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    cube: Cube,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one contribution row.
    pub fn append(&mut self, row: Row) {
        self.cube.push(row);
    }

    /// The accumulated rows.
    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    /// Consumes the ledger into its cube.
    pub fn into_cube(self) -> Cube {
        self.cube
    }

    /// Sum of every booked contribution.
    pub fn total(&self) -> f64 {
        self.cube.total()
    }

    /// Number of booked rows.
    pub fn len(&self) -> usize {
        self.cube.len()
    }

    /// True if nothing has been booked yet.
    pub fn is_empty(&self) -> bool {
        self.cube.is_empty()
    }
}

/// Starts a ledger row for a step, resolving the trade type tag from the
/// portfolio when the trade is known there.
pub(crate) fn step_row(
    step: &'static str,
    trade: &str,
    portfolio: &Portfolio,
    value: f64,
) -> Row {
    let mut row = Row::new(value)
        .with_text(Column::TradeId, trade)
        .with_text(Column::Step, step);
    if let Some(t) = portfolio.trade(&TradeId::new(trade)) {
        row = row.with_text(Column::TradeType, t.trade_type.name());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_accumulates() {
        let mut ledger = Ledger::new();
        assert!(ledger.is_empty());
        ledger.append(
            Row::new(12.5)
                .with_text(Column::TradeId, "T1")
                .with_text(Column::Step, "FxSpot"),
        );
        ledger.append(
            Row::new(-2.5)
                .with_text(Column::TradeId, "T1")
                .with_text(Column::Step, "FxSpot")
                .with_text(Column::SubSubStep, UNEXPLAINED),
        );
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total(), 10.0);
    }

    #[test]
    fn test_step_row_resolves_trade_type() {
        let row = step_row("Activity", "T-unknown", &Portfolio::empty(), 1.0);
        assert_eq!(row.text(Column::TradeId), Some("T-unknown"));
        assert_eq!(row.text(Column::TradeType), None);
    }
}
