//! The Monte-Carlo path-engine seam.
//!
//! Scenario generation reuses one general-purpose path engine rather than
//! a bespoke simulator, so the VaR scenario set is distributionally
//! consistent with whatever stochastic model prices path-dependent trades
//! elsewhere. The engine is consumed through [`PathEngine`]; [`GbmEngine`]
//! is the seeded reference implementation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use risk_core::types::FactorId;

use crate::ScenarioError;

/// A factor handed to the path engine: current level and constant vol.
#[derive(Clone, Debug, PartialEq)]
pub struct SimFactor {
    /// Factor identifier.
    pub id: FactorId,
    /// Level at the open time point.
    pub spot: f64,
    /// Constant (annualised) volatility over the horizon.
    pub vol: f64,
}

impl SimFactor {
    /// Creates a simulated factor.
    pub fn new(id: impl Into<FactorId>, spot: f64, vol: f64) -> Self {
        Self {
            id: id.into(),
            spot,
            vol,
        }
    }
}

/// A correlation matrix over the simulated factors, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    n: usize,
    data: Vec<f64>,
}

impl CorrelationMatrix {
    /// The identity matrix (independent factors).
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { n, data }
    }

    /// Creates a matrix from row-major entries.
    pub fn new(n: usize, data: Vec<f64>) -> Result<Self, ScenarioError> {
        if data.len() != n * n {
            return Err(ScenarioError::DimensionMismatch {
                got: data.len(),
                expected: n * n,
            });
        }
        Ok(Self { n, data })
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Entry at (row, col).
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    /// Lower-triangular Cholesky factor, row-major.
    ///
    /// Fails with [`ScenarioError::NotPositiveDefinite`] if any pivot is
    /// non-positive.
    pub fn cholesky(&self) -> Result<Vec<f64>, ScenarioError> {
        let n = self.n;
        let mut lower = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.at(i, j);
                for k in 0..j {
                    sum -= lower[i * n + k] * lower[j * n + k];
                }
                if i == j {
                    if sum <= 0.0 {
                        return Err(ScenarioError::NotPositiveDefinite);
                    }
                    lower[i * n + j] = sum.sqrt();
                } else {
                    lower[i * n + j] = sum / lower[j * n + j];
                }
            }
        }
        Ok(lower)
    }
}

/// Simulated factor fixings over exactly two time points.
#[derive(Clone, Debug)]
pub struct PathGrid {
    factors: Vec<FactorId>,
    open: Vec<f64>,
    close: Vec<Vec<f64>>,
}

impl PathGrid {
    /// Creates a grid from open levels and per-path close levels.
    pub fn new(factors: Vec<FactorId>, open: Vec<f64>, close: Vec<Vec<f64>>) -> Self {
        Self {
            factors,
            open,
            close,
        }
    }

    /// Simulated factor ids, in grid order.
    pub fn factors(&self) -> &[FactorId] {
        &self.factors
    }

    /// Number of paths.
    pub fn paths(&self) -> usize {
        self.close.len()
    }

    /// The return `close/open − 1` of one factor on one path.
    pub fn factor_return(&self, path: usize, factor_idx: usize) -> f64 {
        self.close[path][factor_idx] / self.open[factor_idx] - 1.0
    }
}

/// The external path-simulation contract: evolve all factors jointly from
/// the open time point to the close time point, once per path.
pub trait PathEngine {
    /// Simulates `paths` joint evolutions over `horizon` years.
    fn simulate(
        &self,
        factors: &[SimFactor],
        correlations: &CorrelationMatrix,
        horizon: f64,
        paths: usize,
    ) -> Result<PathGrid, ScenarioError>;
}

/// Seeded geometric-Brownian-motion reference engine.
///
/// Drift-free one-step evolution:
/// `close = open · exp(−½σ²h + σ√h·ε)` with `ε` drawn from correlated
/// standard normals (Cholesky of the supplied correlation matrix). The
/// same seed always reproduces the same grid.
#[derive(Clone, Debug)]
pub struct GbmEngine {
    seed: u64,
}

impl GbmEngine {
    /// Creates an engine with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The configured seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl PathEngine for GbmEngine {
    fn simulate(
        &self,
        factors: &[SimFactor],
        correlations: &CorrelationMatrix,
        horizon: f64,
        paths: usize,
    ) -> Result<PathGrid, ScenarioError> {
        let n = factors.len();
        if correlations.dim() != n {
            return Err(ScenarioError::DimensionMismatch {
                got: correlations.dim(),
                expected: n,
            });
        }
        let lower = correlations.cholesky()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sqrt_h = horizon.sqrt();

        let mut close = Vec::with_capacity(paths);
        let mut draws = vec![0.0_f64; n];
        for _ in 0..paths {
            for draw in draws.iter_mut() {
                *draw = StandardNormal.sample(&mut rng);
            }
            let mut row = Vec::with_capacity(n);
            for (i, factor) in factors.iter().enumerate() {
                let mut eps = 0.0;
                for (k, draw) in draws.iter().enumerate().take(i + 1) {
                    eps += lower[i * n + k] * draw;
                }
                let sigma = factor.vol;
                let growth = (-0.5 * sigma * sigma * horizon + sigma * sqrt_h * eps).exp();
                row.push(factor.spot * growth);
            }
            close.push(row);
        }

        Ok(PathGrid::new(
            factors.iter().map(|f| f.id.clone()).collect(),
            factors.iter().map(|f| f.spot).collect(),
            close,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cholesky_identity() {
        let lower = CorrelationMatrix::identity(3).cholesky().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(lower[i * 3 + j], expected);
            }
        }
    }

    #[test]
    fn test_cholesky_two_factor() {
        let rho = 0.6;
        let corr = CorrelationMatrix::new(2, vec![1.0, rho, rho, 1.0]).unwrap();
        let lower = corr.cholesky().unwrap();
        assert_relative_eq!(lower[0], 1.0);
        assert_relative_eq!(lower[2], rho);
        assert_relative_eq!(lower[3], (1.0 - rho * rho).sqrt());
    }

    #[test]
    fn test_cholesky_rejects_non_positive_definite() {
        // Correlation 1.5 is not a valid correlation matrix.
        let corr = CorrelationMatrix::new(2, vec![1.0, 1.5, 1.5, 1.0]).unwrap();
        assert_eq!(corr.cholesky().unwrap_err(), ScenarioError::NotPositiveDefinite);
    }

    #[test]
    fn test_dimension_checks() {
        assert!(CorrelationMatrix::new(2, vec![1.0, 0.0, 0.0]).is_err());
        let engine = GbmEngine::new(7);
        let factors = vec![SimFactor::new("SPX", 5000.0, 0.2)];
        let err = engine
            .simulate(&factors, &CorrelationMatrix::identity(2), 1.0 / 252.0, 4)
            .unwrap_err();
        assert!(matches!(err, ScenarioError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_same_seed_reproduces_grid() {
        let factors = vec![
            SimFactor::new("SPX", 5000.0, 0.2),
            SimFactor::new("EURUSD", 1.10, 0.1),
        ];
        let corr = CorrelationMatrix::identity(2);
        let a = GbmEngine::new(42)
            .simulate(&factors, &corr, 1.0 / 252.0, 16)
            .unwrap();
        let b = GbmEngine::new(42)
            .simulate(&factors, &corr, 1.0 / 252.0, 16)
            .unwrap();
        for p in 0..16 {
            for f in 0..2 {
                assert_eq!(a.factor_return(p, f), b.factor_return(p, f));
            }
        }
    }

    #[test]
    fn test_returns_are_centred_for_small_vol() {
        let factors = vec![SimFactor::new("SPX", 5000.0, 0.2)];
        let corr = CorrelationMatrix::identity(1);
        let grid = GbmEngine::new(1)
            .simulate(&factors, &corr, 1.0 / 252.0, 4000)
            .unwrap();
        let mean: f64 =
            (0..grid.paths()).map(|p| grid.factor_return(p, 0)).sum::<f64>() / 4000.0;
        // Drift-free evolution: daily mean return well inside one sigma.
        assert!(mean.abs() < 0.2 / (252.0_f64).sqrt());
    }

    #[test]
    fn test_perfect_correlation_moves_factors_together() {
        let factors = vec![
            SimFactor::new("A", 100.0, 0.2),
            SimFactor::new("B", 50.0, 0.2),
        ];
        let corr = CorrelationMatrix::new(2, vec![1.0, 0.999, 0.999, 1.0]).unwrap();
        let grid = GbmEngine::new(3)
            .simulate(&factors, &corr, 1.0 / 252.0, 200)
            .unwrap();
        for p in 0..grid.paths() {
            let ra = grid.factor_return(p, 0);
            let rb = grid.factor_return(p, 1);
            assert!(ra.signum() == rb.signum() || ra.abs() < 1e-4 || rb.abs() < 1e-4);
        }
    }
}
