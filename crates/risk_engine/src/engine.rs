//! The VaR engine: percentile, contribution and stress reductions.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::{info, warn};

use risk_core::cube::{Column, Cube, Tag};
use risk_core::model::PvModel;
use risk_core::portfolio::Portfolio;
use risk_core::types::{Currency, FactorId, ScenarioId, TradeId};

use crate::cache::ScenarioCache;
use crate::cancel::CancelFlag;
use crate::parallel::{self, ParallelConfig};
use crate::EngineError;

/// Engine configuration, passed in explicitly — no ambient defaults.
#[derive(Clone, Debug)]
pub struct VarConfig {
    /// Currency all scenario tables are priced in.
    pub reporting_ccy: Currency,
    /// Fan-out configuration.
    pub parallel: ParallelConfig,
    /// Caller-supplied cancellation flag.
    pub cancel: CancelFlag,
}

impl VarConfig {
    /// Creates a config with default fan-out and no cancellation wired.
    pub fn new(reporting_ccy: Currency) -> Self {
        Self {
            reporting_ccy,
            parallel: ParallelConfig::default(),
            cancel: CancelFlag::new(),
        }
    }

    /// Overrides the fan-out configuration (builder style).
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Wires a cancellation flag (builder style).
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One scenario's PnL against the base valuation.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioPnl {
    /// Scenario key.
    pub scenario: ScenarioId,
    /// `scenarioPV − basePV` in the reporting currency.
    pub pnl: f64,
}

/// Result of a VaR reduction.
///
/// For an empty scenario set the engine returns the sentinel outcome
/// (`var = cvar = 0`, scenario id [`ScenarioId::ERROR`]) and logs a
/// warning; callers must treat it as "no result", not as a real scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct VarOutcome {
    /// PnL at the percentile index.
    pub var: f64,
    /// Mean PnL of scenarios strictly more extreme than the index
    /// (falls back to `var` when that set is empty).
    pub cvar: f64,
    /// The scenario sitting at the percentile index.
    pub scenario: ScenarioId,
}

impl VarOutcome {
    fn no_result() -> Self {
        Self {
            var: 0.0,
            cvar: 0.0,
            scenario: ScenarioId::error(),
        }
    }

    /// True if this is the empty-scenario-set sentinel.
    pub fn is_no_result(&self) -> bool {
        self.scenario.is_error()
    }
}

/// Owns the base valuation, the scenario models and the result cache,
/// and reduces them into risk measures.
///
/// Scenario repricing fans out across workers; each worker prices one
/// immutable model and writes one cache key. All reductions run after
/// the join, single-threaded, over cached tables only.
#[derive(Debug)]
pub struct VarEngine<M: PvModel> {
    base: M,
    scenarios: BTreeMap<ScenarioId, M>,
    cache: ScenarioCache,
    base_pv: RwLock<Option<Cube>>,
    config: VarConfig,
}

impl<M: PvModel> VarEngine<M> {
    /// Creates an engine over a base model and a scenario map.
    pub fn new(
        base: M,
        scenarios: BTreeMap<ScenarioId, M>,
        config: VarConfig,
    ) -> Self {
        Self {
            base,
            scenarios,
            cache: ScenarioCache::new(),
            base_pv: RwLock::new(None),
            config,
        }
    }

    /// Number of registered scenarios.
    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Registered scenario keys, sorted.
    pub fn scenario_ids(&self) -> Vec<ScenarioId> {
        self.scenarios.keys().cloned().collect()
    }

    /// The base model.
    pub fn base(&self) -> &M {
        &self.base
    }

    /// Read access to the scenario cache.
    pub fn cache(&self) -> &ScenarioCache {
        &self.cache
    }

    /// Explicit invalidation of every cached table, including the base.
    pub fn invalidate(&self) {
        self.cache.clear();
        *self
            .base_pv
            .write()
            .expect("base pv lock poisoned") = None;
    }

    // ---- cache population ---------------------------------------------

    fn base_pv(&self) -> Result<Cube, EngineError> {
        if let Some(cube) = self
            .base_pv
            .read()
            .expect("base pv lock poisoned")
            .clone()
        {
            return Ok(cube);
        }
        let cube = self.base.pv(self.config.reporting_ccy)?;
        if cube.has_non_finite() {
            return Err(EngineError::NumericalDivergence {
                scenario: ScenarioId::new("base"),
            });
        }
        *self
            .base_pv
            .write()
            .expect("base pv lock poisoned") = Some(cube.clone());
        Ok(cube)
    }

    /// Prices every uncached scenario and fills the cache.
    ///
    /// Cancellation is checked before each scenario; a table containing
    /// a non-finite value aborts the whole run.
    pub fn ensure_cache(&self) -> Result<(), EngineError> {
        let pending: Vec<(&ScenarioId, &M)> = self
            .scenarios
            .iter()
            .filter(|(id, _)| !self.cache.contains(id))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        info!(scenarios = pending.len(), "repricing scenario set");

        let ccy = self.config.reporting_ccy;
        let price = |entry: &(&ScenarioId, &M)| -> Result<(ScenarioId, Cube), EngineError> {
            let (id, model) = *entry;
            if self.config.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let cube = model.pv(ccy)?;
            if cube.has_non_finite() {
                return Err(EngineError::NumericalDivergence {
                    scenario: id.clone(),
                });
            }
            Ok((id.clone(), cube))
        };

        let results: Vec<Result<(ScenarioId, Cube), EngineError>> =
            if self.config.parallel.should_parallelize(pending.len()) {
                parallel::process_in_batches(&pending, self.config.parallel.batch_size, price)
            } else {
                pending.iter().map(price).collect()
            };

        for result in results {
            let (id, cube) = result?;
            self.cache.insert(id, cube);
        }
        Ok(())
    }

    fn cached(&self, id: &ScenarioId) -> Result<Cube, EngineError> {
        self.cache
            .get(id)
            .ok_or_else(|| EngineError::UnknownScenario(id.clone()))
    }

    // ---- reductions ---------------------------------------------------

    fn check_ci(ci: f64) -> Result<(), EngineError> {
        if !(0.0..1.0).contains(&ci) || ci == 0.0 {
            return Err(EngineError::InvalidConfidence { ci });
        }
        Ok(())
    }

    /// Sorts ascending and selects the percentile index
    /// `floor(n · (1 − ci))`, clamped to `[0, n − 1]`.
    fn reduce(mut pnls: Vec<ScenarioPnl>, ci: f64) -> VarOutcome {
        let n = pnls.len();
        pnls.sort_by(|a, b| a.pnl.total_cmp(&b.pnl));
        let index = ((n as f64) * (1.0 - ci)).floor() as usize;
        let index = index.min(n - 1);
        let var = pnls[index].pnl;
        let tail = &pnls[..index];
        let cvar = if tail.is_empty() {
            var
        } else {
            tail.iter().map(|p| p.pnl).sum::<f64>() / tail.len() as f64
        };
        VarOutcome {
            var,
            cvar,
            scenario: pnls[index].scenario.clone(),
        }
    }

    /// Per-scenario PnL against the base, in key order.
    pub fn scenario_pnls(&self) -> Result<Vec<ScenarioPnl>, EngineError> {
        self.ensure_cache()?;
        let base_total = self.base_pv()?.total();
        let mut pnls = Vec::with_capacity(self.scenarios.len());
        for id in self.scenarios.keys() {
            pnls.push(ScenarioPnl {
                scenario: id.clone(),
                pnl: self.cached(id)?.total() - base_total,
            });
        }
        Ok(pnls)
    }

    /// The scenario with the largest loss, if any scenarios exist.
    pub fn worst_case(&self) -> Result<Option<ScenarioPnl>, EngineError> {
        let pnls = self.scenario_pnls()?;
        Ok(pnls
            .into_iter()
            .min_by(|a, b| a.pnl.total_cmp(&b.pnl)))
    }

    /// VaR/cVaR of the full portfolio at confidence `ci`.
    pub fn var(&self, ci: f64) -> Result<VarOutcome, EngineError> {
        Self::check_ci(ci)?;
        if self.scenarios.is_empty() {
            warn!("VaR requested with zero scenarios; returning no-result sentinel");
            return Ok(VarOutcome::no_result());
        }
        Ok(Self::reduce(self.scenario_pnls()?, ci))
    }

    /// VaR with the given trades excluded, computed on the pure-cache
    /// path: cached tables are filtered by trade id and re-summed, and
    /// the equally-filtered base PV subtracted. Numerically equivalent
    /// to a from-scratch reprice of the reduced portfolio.
    pub fn var_excluding_trades(
        &self,
        ci: f64,
        trade_ids: &[TradeId],
    ) -> Result<VarOutcome, EngineError> {
        self.var_filtered(ci, trade_ids, true)
    }

    /// VaR of only the given trades, on the pure-cache path.
    pub fn var_for_trades(
        &self,
        ci: f64,
        trade_ids: &[TradeId],
    ) -> Result<VarOutcome, EngineError> {
        self.var_filtered(ci, trade_ids, false)
    }

    fn var_filtered(
        &self,
        ci: f64,
        trade_ids: &[TradeId],
        exclude: bool,
    ) -> Result<VarOutcome, EngineError> {
        Self::check_ci(ci)?;
        if self.scenarios.is_empty() {
            warn!("VaR requested with zero scenarios; returning no-result sentinel");
            return Ok(VarOutcome::no_result());
        }
        self.ensure_cache()?;

        let tags: Vec<Tag> = trade_ids.iter().map(|id| Tag::from(id.as_str())).collect();
        let base_total = self
            .base_pv()?
            .filter_any(Column::TradeId, &tags, exclude)
            .total();

        let mut pnls = Vec::with_capacity(self.scenarios.len());
        for id in self.scenarios.keys() {
            let filtered = self
                .cached(id)?
                .filter_any(Column::TradeId, &tags, exclude)
                .total();
            pnls.push(ScenarioPnl {
                scenario: id.clone(),
                pnl: filtered - base_total,
            });
        }
        Ok(Self::reduce(pnls, ci))
    }

    /// VaR of an arbitrary trade subset by from-scratch repricing.
    ///
    /// Rebuilds every scenario model against `portfolio` and reprices.
    /// Does not touch the cache — the cache stays the system of record
    /// for the full portfolio.
    pub fn var_for_portfolio(
        &self,
        ci: f64,
        portfolio: &Portfolio,
    ) -> Result<VarOutcome, EngineError> {
        Self::check_ci(ci)?;
        if self.scenarios.is_empty() {
            warn!("VaR requested with zero scenarios; returning no-result sentinel");
            return Ok(VarOutcome::no_result());
        }
        let ccy = self.config.reporting_ccy;

        let base_sub = self
            .base
            .rebuild(self.base.state().clone(), portfolio.clone());
        let base_cube = base_sub.pv(ccy)?;
        if base_cube.has_non_finite() {
            return Err(EngineError::NumericalDivergence {
                scenario: ScenarioId::new("base"),
            });
        }
        let base_total = base_cube.total();

        let items: Vec<(&ScenarioId, &M)> = self.scenarios.iter().collect();
        let price = |entry: &(&ScenarioId, &M)| -> Result<ScenarioPnl, EngineError> {
            let (id, model) = *entry;
            if self.config.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let subset = model.rebuild(model.state().clone(), portfolio.clone());
            let cube = subset.pv(ccy)?;
            if cube.has_non_finite() {
                return Err(EngineError::NumericalDivergence {
                    scenario: id.clone(),
                });
            }
            Ok(ScenarioPnl {
                scenario: id.clone(),
                pnl: cube.total() - base_total,
            })
        };

        let results: Vec<Result<ScenarioPnl, EngineError>> =
            if self.config.parallel.should_parallelize(items.len()) {
                parallel::parallel_map(&items, price)
            } else {
                items.iter().map(price).collect()
            };

        let pnls = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self::reduce(pnls, ci))
    }

    /// Per-trade PnL contribution of one scenario: the difference of its
    /// table against the base table, pivoted by trade id.
    ///
    /// Populates the cache lazily for just this scenario if needed.
    pub fn contributions(&self, scenario: &ScenarioId) -> Result<Cube, EngineError> {
        let model = self
            .scenarios
            .get(scenario)
            .ok_or_else(|| EngineError::UnknownScenario(scenario.clone()))?;
        let table = match self.cache.get(scenario) {
            Some(table) => table,
            None => {
                let table = model.pv(self.config.reporting_ccy)?;
                if table.has_non_finite() {
                    return Err(EngineError::NumericalDivergence {
                        scenario: scenario.clone(),
                    });
                }
                self.cache.insert(scenario.clone(), table.clone());
                table
            }
        };
        let base = self.base_pv()?;
        Ok(table.difference(&base).pivot(Column::TradeId))
    }

    /// Stress PnL for shocking one factor by `shock` (relative).
    ///
    /// Regresses scenario PnL against the factor's scenario-level price
    /// level (the base level at zero PnL is itself a regression sample),
    /// optionally restricted to the `n_nearest` samples closest to the
    /// shocked level, and evaluates the fitted line at
    /// `base_level · (1 + shock)`.
    pub fn stress(
        &self,
        factor: &FactorId,
        shock: f64,
        n_nearest: Option<usize>,
    ) -> Result<f64, EngineError> {
        let base_level = self
            .base
            .state()
            .level(factor)
            .ok_or_else(|| EngineError::UnknownFactor(factor.clone()))?;
        self.ensure_cache()?;
        let base_total = self.base_pv()?.total();

        let mut samples: Vec<(f64, f64)> = vec![(base_level, 0.0)];
        for (id, model) in &self.scenarios {
            if let Some(level) = model.state().level(factor) {
                samples.push((level, self.cached(id)?.total() - base_total));
            }
        }

        let target = base_level * (1.0 + shock);
        if let Some(n) = n_nearest {
            let keep = n.max(2).min(samples.len());
            samples.sort_by(|a, b| {
                (a.0 - target).abs().total_cmp(&(b.0 - target).abs())
            });
            samples.truncate(keep);
        }
        Ok(fit_and_predict(&samples, target))
    }
}

/// Ordinary least squares through the samples, evaluated at `x`.
///
/// Degenerate regressors (all levels equal) collapse to the mean PnL.
fn fit_and_predict(samples: &[(f64, f64)], x: f64) -> f64 {
    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / n;
    let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / n;
    let mut var = 0.0;
    let mut cov = 0.0;
    for (level, pnl) in samples {
        let dx = level - mean_x;
        var += dx * dx;
        cov += dx * (pnl - mean_y);
    }
    if var <= f64::EPSILON * mean_x.abs().max(1.0) {
        return mean_y;
    }
    mean_y + (cov / var) * (x - mean_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use risk_core::cube::Row;
    use risk_core::market::{AssetClass, MarketState};
    use risk_core::model::{LinearModel, ModelError};
    use risk_core::portfolio::{ExposureProfile, Trade, TradeType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn state_with_spot(spot: f64) -> MarketState {
        let mut state = MarketState::new(d(2025, 6, 30));
        state.set_spot("SPX".into(), AssetClass::Equity, spot);
        state
    }

    fn trade(id: &str, delta: f64) -> Trade {
        Trade::new(
            id,
            TradeType::Forward,
            Currency::USD,
            "SPX",
            1.0,
            d(2025, 6, 30),
            d(2026, 6, 30),
            ExposureProfile::with_base(0.0).spot_delta("SPX", delta),
        )
    }

    /// Base PV 100; scenarios move the spot to 50 / 90 / 105, so the
    /// scenario PnLs are −50 / −10 / +5.
    fn worked_engine() -> VarEngine<LinearModel> {
        let portfolio = Portfolio::new(vec![trade("T1", 0.6), trade("T2", 0.4)]).unwrap();
        let base = LinearModel::new(state_with_spot(100.0), portfolio.clone());
        let mut scenarios = BTreeMap::new();
        for (key, spot) in [("s-down", 50.0), ("s-mid", 90.0), ("s-up", 105.0)] {
            scenarios.insert(
                ScenarioId::new(key),
                base.rebuild(state_with_spot(spot), portfolio.clone()),
            );
        }
        VarEngine::new(base, scenarios, VarConfig::new(Currency::USD))
    }

    #[test]
    fn test_worked_var_example() {
        let engine = worked_engine();
        let outcome = engine.var(0.67).unwrap();
        // floor(3 × 0.33) = 0: the worst scenario is selected, and the
        // strictly-more-extreme set is empty so cVaR falls back.
        assert_relative_eq!(outcome.var, -50.0, max_relative = 1e-12);
        assert_relative_eq!(outcome.cvar, -50.0, max_relative = 1e-12);
        assert_eq!(outcome.scenario, ScenarioId::new("s-down"));
    }

    #[test]
    fn test_cvar_averages_the_tail() {
        let engine = worked_engine();
        // ci = 0.1: index = floor(3 × 0.9) = 2 → var = +5,
        // cvar = mean(−50, −10) = −30.
        let outcome = engine.var(0.1).unwrap();
        assert_relative_eq!(outcome.var, 5.0, max_relative = 1e-12);
        assert_relative_eq!(outcome.cvar, -30.0, max_relative = 1e-12);
    }

    #[test]
    fn test_var_loss_is_monotone_in_confidence() {
        let engine = worked_engine();
        let mut previous = f64::INFINITY;
        for ci in [0.10, 0.34, 0.50, 0.67, 0.90, 0.99] {
            let var = engine.var(ci).unwrap().var;
            assert!(
                var <= previous + 1e-12,
                "VaR must grow more extreme as ci rises: {} then {}",
                previous,
                var
            );
            previous = var;
        }
    }

    #[test]
    fn test_empty_scenario_set_returns_sentinel() {
        let portfolio = Portfolio::new(vec![trade("T1", 1.0)]).unwrap();
        let base = LinearModel::new(state_with_spot(100.0), portfolio);
        let engine = VarEngine::new(base, BTreeMap::new(), VarConfig::new(Currency::USD));
        let outcome = engine.var(0.95).unwrap();
        assert!(outcome.is_no_result());
        assert_eq!(outcome.var, 0.0);
        assert_eq!(outcome.cvar, 0.0);
        assert_eq!(outcome.scenario.as_str(), "ERROR");
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let engine = worked_engine();
        assert!(matches!(
            engine.var(0.0),
            Err(EngineError::InvalidConfidence { .. })
        ));
        assert!(matches!(
            engine.var(1.0),
            Err(EngineError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn test_cache_filter_matches_subset_reprice() {
        let engine = worked_engine();
        let excluded = vec![TradeId::new("T2")];

        // Pure-cache path vs from-scratch subset reprice.
        let cached = engine.var_excluding_trades(0.67, &excluded).unwrap();
        let subset = engine.base().portfolio().excluding(&excluded);
        let repriced = engine.var_for_portfolio(0.67, &subset).unwrap();

        assert_relative_eq!(cached.var, repriced.var, max_relative = 1e-9);
        assert_relative_eq!(cached.cvar, repriced.cvar, max_relative = 1e-9);
        // T1 carries 60% of the delta: the filtered loss is 60% of −50.
        assert_relative_eq!(cached.var, -30.0, max_relative = 1e-9);
    }

    #[test]
    fn test_inclusive_filter_complements_exclusive() {
        let engine = worked_engine();
        let ids = vec![TradeId::new("T2")];
        let only_t2 = engine.var_for_trades(0.67, &ids).unwrap();
        assert_relative_eq!(only_t2.var, -20.0, max_relative = 1e-9);
    }

    #[test]
    fn test_contributions_pivot_by_trade() {
        let engine = worked_engine();
        let contributions = engine.contributions(&ScenarioId::new("s-down")).unwrap();
        let t1 = contributions.filter_text(Column::TradeId, "T1", false);
        let t2 = contributions.filter_text(Column::TradeId, "T2", false);
        assert_relative_eq!(t1.total(), -30.0, max_relative = 1e-9);
        assert_relative_eq!(t2.total(), -20.0, max_relative = 1e-9);
    }

    #[test]
    fn test_contributions_unknown_scenario() {
        let engine = worked_engine();
        assert!(matches!(
            engine.contributions(&ScenarioId::new("nope")),
            Err(EngineError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_cache_is_populated_once_and_invalidated_explicitly() {
        let engine = worked_engine();
        assert!(engine.cache().is_empty());
        engine.var(0.67).unwrap();
        assert_eq!(engine.cache().len(), 3);
        engine.invalidate();
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_cancellation_aborts_before_scenarios() {
        let portfolio = Portfolio::new(vec![trade("T1", 1.0)]).unwrap();
        let base = LinearModel::new(state_with_spot(100.0), portfolio.clone());
        let mut scenarios = BTreeMap::new();
        scenarios.insert(
            ScenarioId::new("s1"),
            base.rebuild(state_with_spot(90.0), portfolio),
        );
        let cancel = CancelFlag::new();
        cancel.cancel();
        let config = VarConfig::new(Currency::USD).with_cancel(cancel);
        let engine = VarEngine::new(base, scenarios, config);
        assert_eq!(engine.var(0.95).unwrap_err(), EngineError::Cancelled);
    }

    #[test]
    fn test_worst_case_and_scenario_pnls() {
        let engine = worked_engine();
        let pnls = engine.scenario_pnls().unwrap();
        assert_eq!(pnls.len(), 3);
        let worst = engine.worst_case().unwrap().unwrap();
        assert_eq!(worst.scenario, ScenarioId::new("s-down"));
        assert_relative_eq!(worst.pnl, -50.0, max_relative = 1e-12);
    }

    #[test]
    fn test_stress_zero_shock_is_zero() {
        let engine = worked_engine();
        // PnL is exactly linear in the spot level, so the fitted line
        // passes through the base sample (level, 0).
        let stress = engine.stress(&"SPX".into(), 0.0, None).unwrap();
        assert_relative_eq!(stress, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stress_linear_extrapolation() {
        let engine = worked_engine();
        // Unit delta portfolio: a −20% spot shock predicts −20 PnL.
        let stress = engine.stress(&"SPX".into(), -0.20, None).unwrap();
        assert_relative_eq!(stress, -20.0, max_relative = 1e-9);
    }

    #[test]
    fn test_stress_nearest_sample_restriction() {
        let engine = worked_engine();
        let all = engine.stress(&"SPX".into(), 0.05, None).unwrap();
        let near = engine.stress(&"SPX".into(), 0.05, Some(2)).unwrap();
        // Linear PnL: both fits land on the same line.
        assert_relative_eq!(all, near, max_relative = 1e-9);
        assert_relative_eq!(all, 5.0, max_relative = 1e-9);
    }

    #[test]
    fn test_stress_unknown_factor() {
        let engine = worked_engine();
        assert!(matches!(
            engine.stress(&"NIKKEI".into(), 0.1, None),
            Err(EngineError::UnknownFactor(_))
        ));
    }

    // ---- divergence containment --------------------------------------

    /// Minimal model that reprices to NaN, standing in for a calibration
    /// blow-up inside an external pricing library.
    #[derive(Clone, Debug)]
    struct DivergentModel {
        state: MarketState,
        portfolio: Portfolio,
    }

    impl PvModel for DivergentModel {
        fn pv(&self, _ccy: Currency) -> Result<Cube, ModelError> {
            Ok(Cube::from_rows(vec![
                Row::new(f64::NAN).with_text(Column::TradeId, "T1")
            ]))
        }

        fn fv(&self, ccy: Currency) -> Result<Cube, ModelError> {
            self.pv(ccy)
        }

        fn state(&self) -> &MarketState {
            &self.state
        }

        fn portfolio(&self) -> &Portfolio {
            &self.portfolio
        }

        fn rebuild(&self, state: MarketState, portfolio: Portfolio) -> Self {
            Self { state, portfolio }
        }
    }

    #[test]
    fn test_divergent_scenario_aborts_whole_run() {
        let model = DivergentModel {
            state: state_with_spot(100.0),
            portfolio: Portfolio::empty(),
        };
        let mut scenarios = BTreeMap::new();
        scenarios.insert(ScenarioId::new("s1"), model.clone());
        let engine = VarEngine::new(model, scenarios, VarConfig::new(Currency::USD));
        assert!(matches!(
            engine.var(0.95),
            Err(EngineError::NumericalDivergence { .. })
        ));
    }
}
