//! Monte-Carlo scenario generation.
//!
//! One constant-vol surface per simulated factor is fed to the path
//! engine, which evolves all factors jointly over exactly two time points
//! (today, today + horizon). Each path's `close/open − 1` ratio becomes a
//! relative shift on the corresponding spot or curve; paths are the
//! scenario axis.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use risk_core::model::PvModel;
use risk_core::shift::Shift;
use risk_core::types::{FactorId, ScenarioId};

use crate::bumps::BumpTarget;
use crate::path_engine::{CorrelationMatrix, PathEngine, SimFactor};
use crate::ScenarioError;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Volatility specification for one simulated factor.
#[derive(Clone, Debug, PartialEq)]
pub enum VolSpec {
    /// Parametric annualised volatility.
    Flat(f64),
    /// Daily return sample; the constant vol is the annualised sample
    /// standard deviation.
    Empirical(Vec<f64>),
}

impl VolSpec {
    /// The constant annualised volatility this spec resolves to.
    pub fn volatility(&self) -> f64 {
        match self {
            VolSpec::Flat(sigma) => *sigma,
            VolSpec::Empirical(returns) => {
                if returns.len() < 2 {
                    return 0.0;
                }
                let n = returns.len() as f64;
                let mean = returns.iter().sum::<f64>() / n;
                let var = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>()
                    / (n - 1.0);
                var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
            }
        }
    }
}

/// One simulated factor: which observable to shift and with what vol.
#[derive(Clone, Debug, PartialEq)]
pub struct McFactorSpec {
    /// The factor to simulate and shift.
    pub factor: FactorId,
    /// Whether the path return lands on the spot or on the whole curve.
    pub target: BumpTarget,
    /// Constant-vol specification.
    pub vol: VolSpec,
}

impl McFactorSpec {
    /// Simulates a spot factor.
    pub fn spot(factor: impl Into<FactorId>, vol: VolSpec) -> Self {
        Self {
            factor: factor.into(),
            target: BumpTarget::Spot,
            vol,
        }
    }

    /// Simulates a curve factor (the path return shifts every pillar).
    pub fn curve(factor: impl Into<FactorId>, vol: VolSpec) -> Self {
        Self {
            factor: factor.into(),
            target: BumpTarget::Curve,
            vol,
        }
    }
}

/// Monte-Carlo scenario configuration.
#[derive(Clone, Debug)]
pub struct McConfig {
    /// Number of paths (= number of scenarios).
    pub paths: usize,
    /// One-step horizon in days.
    pub horizon_days: f64,
    /// Optional correlation structure; identity when absent.
    pub correlations: Option<CorrelationMatrix>,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            paths: 1_000,
            horizon_days: 1.0,
            correlations: None,
        }
    }
}

/// Builds one bumped model per Monte-Carlo path.
pub struct McGenerator<E: PathEngine> {
    specs: Vec<McFactorSpec>,
    config: McConfig,
    engine: E,
}

impl<E: PathEngine> McGenerator<E> {
    /// Creates a generator over factor specs and a path engine.
    pub fn new(specs: Vec<McFactorSpec>, config: McConfig, engine: E) -> Self {
        Self {
            specs,
            config,
            engine,
        }
    }

    /// Builds the scenario map, one model per path. Scenario ids are the
    /// path indices.
    ///
    /// Factors absent from the base state are warned about and dropped
    /// from the simulation; a bad correlation matrix is a hard error.
    pub fn generate<M: PvModel>(
        &self,
        base: &M,
    ) -> Result<BTreeMap<ScenarioId, M>, ScenarioError> {
        let state = base.state();

        let mut sim_factors = Vec::with_capacity(self.specs.len());
        let mut targets = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            match state.level(&spec.factor) {
                Some(level) => {
                    sim_factors.push(SimFactor::new(
                        spec.factor.clone(),
                        level,
                        spec.vol.volatility(),
                    ));
                    targets.push((spec.factor.clone(), spec.target));
                }
                None => warn!(
                    factor = %spec.factor,
                    "factor not in market state; dropped from simulation"
                ),
            }
        }

        info!(
            factors = sim_factors.len(),
            paths = self.config.paths,
            "simulating Monte-Carlo factor returns"
        );

        let correlations = match &self.config.correlations {
            Some(corr) => {
                if corr.dim() != sim_factors.len() {
                    return Err(ScenarioError::DimensionMismatch {
                        got: corr.dim(),
                        expected: sim_factors.len(),
                    });
                }
                corr.clone()
            }
            None => CorrelationMatrix::identity(sim_factors.len()),
        };

        let horizon = self.config.horizon_days / TRADING_DAYS_PER_YEAR;
        let grid =
            self.engine
                .simulate(&sim_factors, &correlations, horizon, self.config.paths)?;

        let scenarios = (0..grid.paths())
            .into_par_iter()
            .map(|path| {
                let mut working = state.clone();
                for (idx, (factor, target)) in targets.iter().enumerate() {
                    let shift = Shift::relative(grid.factor_return(path, idx));
                    let applied = match target {
                        BumpTarget::Spot => working.shift_spot(factor, shift),
                        BumpTarget::Curve => working.shift_curve(factor, shift),
                        BumpTarget::Vol => working.shift_vol(factor, shift),
                    };
                    if let Err(err) = applied {
                        warn!(factor = %factor, %err, "path shift not applied");
                    }
                }
                let model = base.rebuild(working, base.portfolio().clone());
                (ScenarioId::new(path.to_string()), model)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        Ok(scenarios)
    }
}
