//! Engine error types.

use thiserror::Error;

use risk_core::model::ModelError;
use risk_core::types::{FactorId, ScenarioId};

/// Errors from scenario reduction.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Valuation failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A scenario repriced to a non-finite value. The whole run aborts:
    /// a silently-zeroed scenario would corrupt the percentile ordering.
    #[error("Numerical divergence in scenario {scenario}")]
    NumericalDivergence {
        /// The scenario whose table contained NaN or infinity.
        scenario: ScenarioId,
    },

    /// The caller-supplied cancellation flag was raised. Checked before
    /// each scenario revaluation; a revaluation in flight is never
    /// interrupted.
    #[error("Run cancelled")]
    Cancelled,

    /// Confidence level outside (0, 1).
    #[error("Invalid confidence level: {ci}")]
    InvalidConfidence {
        /// The offending confidence level.
        ci: f64,
    },

    /// No scenario registered under this id.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(ScenarioId),

    /// The stress factor has no level in the base market state.
    #[error("Unknown stress factor: {0}")]
    UnknownFactor(FactorId),
}
