//! # risk_attribution: The PnL-Explain Waterfall
//!
//! Decomposes the change in portfolio value between two valuation states
//! into named, ordered explanatory buckets with an explicit residual.
//!
//! The waterfall is a strictly sequential state machine: each step owns
//! the current model, isolates one driver (trade activity, provisions,
//! time, one curve, one FX spot, one vol surface), books a first/second
//! order Taylor estimate of its PnL into the append-only [`Ledger`],
//! rolls the shared market state forward for that one driver, reprices,
//! and books whatever the estimate missed as `Unexplained`. The closing
//! step absorbs everything still outstanding against the end valuation.
//!
//! The core correctness property: after the full waterfall,
//! `ledger.total() == end.pv() − start.pv()` up to floating-point
//! tolerance, for any step order.
//!
//! Steps are a closed enum — there is no open-ended step registration, so
//! the dispatch is exhaustive and a step that forgets to book its ledger
//! rows cannot be added silently.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

mod error;
pub mod ledger;
pub mod steps;
pub mod waterfall;

pub use error::AttributionError;
pub use ledger::{Ledger, UNEXPLAINED};
pub use steps::{AttributionStep, StepKind};
pub use waterfall::{AttributionReport, Waterfall};
