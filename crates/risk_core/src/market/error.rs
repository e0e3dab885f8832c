//! Market data error types.

use thiserror::Error;

use crate::types::FactorId;

/// Market data operation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketDataError {
    /// Factor id not present in the market state section being addressed.
    #[error("Unknown factor: {0}")]
    UnknownFactor(FactorId),

    /// A vector bump's length does not match the curve's pillar count.
    #[error("Pillar count mismatch: got {got}, curve has {expected}")]
    PillarCountMismatch {
        /// Number of shift entries supplied.
        got: usize,
        /// Number of pillars on the curve.
        expected: usize,
    },

    /// A per-point operation addressed a pillar label the curve lacks.
    #[error("Unknown pillar '{label}' on curve {curve}")]
    UnknownPillar {
        /// The curve factor id.
        curve: FactorId,
        /// The missing pillar label.
        label: String,
    },

    /// No FX spot (direct or inverse) registered for a currency pair.
    #[error("Missing FX rate for pair {pair}")]
    MissingFxRate {
        /// Concatenated currency pair, e.g. `EURUSD`.
        pair: String,
    },

    /// A curve must carry at least one pillar.
    #[error("Curve has no pillars")]
    EmptyCurve,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketDataError::UnknownFactor(FactorId::new("EURUSD"));
        assert_eq!(format!("{}", err), "Unknown factor: EURUSD");

        let err = MarketDataError::PillarCountMismatch { got: 3, expected: 5 };
        assert!(format!("{}", err).contains("got 3"));
    }
}
