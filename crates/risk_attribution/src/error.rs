//! Attribution error types.

use thiserror::Error;

use risk_core::model::ModelError;

/// Errors from the attribution waterfall.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AttributionError {
    /// Valuation failed inside a step.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A step's repricing produced a non-finite value. The run aborts —
    /// a divergent reprice must not leak into the explained/residual
    /// split.
    #[error("Numerical divergence during step {step}")]
    NumericalDivergence {
        /// Name of the step whose reprice diverged.
        step: &'static str,
    },
}
