//! # risk_engine: Scenario Reduction Engine
//!
//! Owns the base valuation, the scenario → result-table cache and every
//! reduction over it:
//!
//! - [`engine::VarEngine`]: VaR/cVaR percentile selection, cached
//!   trade-filter paths, per-trade contributions, stress regression
//! - [`sensitivities::SensitivityCalculator`]: bump-and-reprice risk cube
//!   (the attribution waterfall's sensitivity input)
//! - [`cache::ScenarioCache`]: the thread-safe system of record once
//!   populated — recomputation only on explicit invalidation
//! - [`parallel`]: fan-out configuration and helpers
//! - [`cancel::CancelFlag`]: cooperative per-scenario cancellation
//!
//! ## Concurrency model
//!
//! Scenario repricing is the only parallel stage: each worker prices its
//! own immutable model and writes its own cache key, so the cache needs no
//! read/modify/write coordination. All reduction (sorting, percentile
//! selection, regression) runs single-threaded after the join.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod cache;
pub mod cancel;
pub mod engine;
mod error;
pub mod parallel;
pub mod sensitivities;

pub use cache::ScenarioCache;
pub use cancel::CancelFlag;
pub use engine::{ScenarioPnl, VarConfig, VarEngine, VarOutcome};
pub use error::EngineError;
pub use parallel::ParallelConfig;
pub use sensitivities::{SensitivityCalculator, SensitivityConfig};
