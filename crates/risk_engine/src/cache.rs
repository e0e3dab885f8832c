//! The scenario result cache.

use std::collections::HashMap;
use std::sync::RwLock;

use risk_core::cube::Cube;
use risk_core::types::ScenarioId;

/// Thread-safe map of scenario id → repriced result table.
///
/// Once populated the cache is the system of record for percentile and
/// contribution reductions; recomputation from models only happens after
/// an explicit [`ScenarioCache::clear`], never implicitly.
///
/// Workers write disjoint keys (one scenario per worker), so a plain
/// `RwLock<HashMap>` suffices — there is no read/modify/write race to
/// coordinate.
#[derive(Debug, Default)]
pub struct ScenarioCache {
    inner: RwLock<HashMap<ScenarioId, Cube>>,
}

impl ScenarioCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a scenario's table, replacing any previous entry.
    pub fn insert(&self, id: ScenarioId, cube: Cube) {
        self.inner
            .write()
            .expect("scenario cache lock poisoned")
            .insert(id, cube);
    }

    /// The cached table for a scenario, if present.
    pub fn get(&self, id: &ScenarioId) -> Option<Cube> {
        self.inner
            .read()
            .expect("scenario cache lock poisoned")
            .get(id)
            .cloned()
    }

    /// True if the scenario is cached.
    pub fn contains(&self, id: &ScenarioId) -> bool {
        self.inner
            .read()
            .expect("scenario cache lock poisoned")
            .contains_key(id)
    }

    /// Number of cached scenarios.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("scenario cache lock poisoned")
            .len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit invalidation: drops every cached table.
    pub fn clear(&self) {
        self.inner
            .write()
            .expect("scenario cache lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::cube::{Column, Row};

    fn table(value: f64) -> Cube {
        Cube::from_rows(vec![Row::new(value).with_text(Column::TradeId, "T1")])
    }

    #[test]
    fn test_insert_get_clear() {
        let cache = ScenarioCache::new();
        assert!(cache.is_empty());

        cache.insert(ScenarioId::new("2024-08-05"), table(-50.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&ScenarioId::new("2024-08-05")));
        assert_eq!(cache.get(&ScenarioId::new("2024-08-05")).unwrap().total(), -50.0);
        assert!(cache.get(&ScenarioId::new("2024-08-06")).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let cache = ScenarioCache::new();
        let id = ScenarioId::new("0");
        cache.insert(id.clone(), table(1.0));
        cache.insert(id.clone(), table(2.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id).unwrap().total(), 2.0);
    }

    #[test]
    fn test_disjoint_parallel_writes() {
        use rayon::prelude::*;
        let cache = ScenarioCache::new();
        (0..64).into_par_iter().for_each(|i| {
            cache.insert(ScenarioId::new(i.to_string()), table(i as f64));
        });
        assert_eq!(cache.len(), 64);
        assert_eq!(cache.get(&ScenarioId::new("63")).unwrap().total(), 63.0);
    }
}
