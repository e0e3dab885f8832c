//! Scenario generation error types.

use thiserror::Error;

use risk_core::market::MarketDataError;
use risk_core::model::ModelError;

/// Errors from scenario generation.
///
/// Missing bump data is deliberately *not* represented here — partial
/// coverage is warned about and skipped. These variants are genuine
/// configuration or numerical failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScenarioError {
    /// Valuation failed while building or pricing a scenario model.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Market data operation failed outside the warn-and-skip paths.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    /// The correlation matrix is not positive definite.
    #[error("Correlation matrix is not positive definite")]
    NotPositiveDefinite,

    /// A matrix or factor-list dimension does not match.
    #[error("Dimension mismatch: got {got}, expected {expected}")]
    DimensionMismatch {
        /// Supplied dimension.
        got: usize,
        /// Required dimension.
        expected: usize,
    },
}
