//! Per-request search context.
//!
//! A [`SearchEngine`] owns everything one search session needs: sizing, the labeling, a backend
//! handle and optionally a prepared oracle. Oracles are immutable and can be handed to many
//! engines at once with [`SearchEngine::with_oracle`]; every query builds its own registers and
//! circuit, so engines never share mutable state.

use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::amplification::{prepare_circuit, IterationPlan};
use crate::backend::Backend;
use crate::circuit::Circuit;
use crate::config::SearchConfig;
use crate::database::DatabaseOracle;
use crate::errors::{CircuitError, CircuitResult, SearchError};
use crate::extractor::extract;
use crate::labeling::{Label, Labeling, SeededLabeling};
use crate::marker::QueryMarker;

/// Where a single query is in its pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryStage {
    /// Nothing done yet.
    #[default]
    Idle,
    /// A collection oracle is available.
    OracleReady,
    /// The query's marker is built.
    MarkerBuilt,
    /// The iteration plan is fixed.
    IterationsComputed,
    /// The measured circuit is built.
    CircuitPrepared,
    /// The circuit was handed to a backend.
    Submitted,
    /// An index was decoded from the outcome.
    ResultExtracted,
}

impl QueryStage {
    /// The only stage reachable from this one.
    pub fn next(self) -> Option<Self> {
        match self {
            QueryStage::Idle => Some(QueryStage::OracleReady),
            QueryStage::OracleReady => Some(QueryStage::MarkerBuilt),
            QueryStage::MarkerBuilt => Some(QueryStage::IterationsComputed),
            QueryStage::IterationsComputed => Some(QueryStage::CircuitPrepared),
            QueryStage::CircuitPrepared => Some(QueryStage::Submitted),
            QueryStage::Submitted => Some(QueryStage::ResultExtracted),
            QueryStage::ResultExtracted => None,
        }
    }

    /// True for the last stage.
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl Display for QueryStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Tracks a query's stage and refuses to skip any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryProgress {
    stage: QueryStage,
}

impl QueryProgress {
    /// Progress starting at [`QueryStage::Idle`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    pub fn stage(&self) -> QueryStage {
        self.stage
    }

    /// Move to `to`, which must directly follow the current stage.
    pub fn advance(&mut self, to: QueryStage) -> CircuitResult<()> {
        if self.stage.next() != Some(to) {
            return Err(CircuitError::new(format!(
                "Query cannot move from {} to {}",
                self.stage, to
            )));
        }
        tracing::debug!(from = %self.stage, to = %to, "Query stage advanced.");
        self.stage = to;
        Ok(())
    }
}

/// A query whose circuit is built but not yet submitted.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    circuit: Circuit,
    plan: IterationPlan,
    target: Label,
    progress: QueryProgress,
}

impl PreparedQuery {
    /// The measured search circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Iteration count and rotation used.
    pub fn plan(&self) -> &IterationPlan {
        &self.plan
    }

    /// Label of the query.
    pub fn target(&self) -> Label {
        self.target
    }

    /// Stage the query has reached.
    pub fn stage(&self) -> QueryStage {
        self.progress.stage()
    }
}

/// Result of [`SearchEngine::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchOutcome {
    /// The sampled index holds the query.
    Found(usize),
    /// The sampled index holds something else, so the query is not in the collection.
    NotFound {
        /// What the backend returned.
        sampled: usize,
    },
}

impl SearchOutcome {
    /// The position when found.
    pub fn position(&self) -> Option<usize> {
        match self {
            SearchOutcome::Found(index) => Some(*index),
            SearchOutcome::NotFound { .. } => None,
        }
    }
}

/// Search context holding sizing, labeling, backend and the current collection's oracle.
#[derive(Debug)]
pub struct SearchEngine<B, L: ?Sized = SeededLabeling> {
    settings: SearchConfig,
    labeling: Arc<L>,
    backend: B,
    oracle: Option<Arc<DatabaseOracle>>,
}

impl<B: Backend> SearchEngine<B, SeededLabeling> {
    /// Engine labeling items with the seeded SHA-256 labeling described by `settings`.
    pub fn new(settings: SearchConfig, backend: B) -> Self {
        let labeling = SeededLabeling::with_seed(settings.label_width, settings.label_seed);
        Self::with_labeling(settings, Arc::new(labeling), backend)
    }
}

impl<B: Backend, L: Labeling + ?Sized> SearchEngine<B, L> {
    /// Engine with a caller-provided labeling.
    pub fn with_labeling(settings: SearchConfig, labeling: Arc<L>, backend: B) -> Self {
        Self {
            settings,
            labeling,
            backend,
            oracle: None,
        }
    }

    /// Use an already built oracle instead of encoding a collection.
    pub fn with_oracle(mut self, oracle: Arc<DatabaseOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Sizing and behavior settings.
    pub fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    /// Labeling applied to items and queries.
    pub fn labeling(&self) -> &Arc<L> {
        &self.labeling
    }

    /// Backend circuits are submitted to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The oracle queries currently run against.
    pub fn oracle(&self) -> Option<&Arc<DatabaseOracle>> {
        self.oracle.as_ref()
    }

    /// Encode `collection` and make it the target of subsequent queries.
    ///
    /// Label collisions are logged, or rejected when `reject_collisions` is set.
    pub fn update_collection<T>(
        &mut self,
        collection: &[T],
    ) -> Result<Arc<DatabaseOracle>, SearchError>
    where
        T: AsRef<[u8]>,
    {
        let oracle = DatabaseOracle::build(collection, &*self.labeling, self.settings.index_width)?;
        if self.settings.reject_collisions {
            oracle.ensure_injective()?;
        } else {
            for (first, second) in oracle.collisions() {
                tracing::warn!(first, second, "Collection items share a label.");
            }
        }
        let oracle = Arc::new(oracle);
        self.oracle = Some(Arc::clone(&oracle));
        tracing::debug!(
            items = oracle.len(),
            capacity = oracle.capacity(),
            "Collection encoded."
        );
        Ok(oracle)
    }

    /// Build the measured search circuit for `query`.
    pub fn prepare<Q>(&self, query: &Q) -> Result<PreparedQuery, SearchError>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let mut progress = QueryProgress::new();
        let oracle = self.oracle.as_ref().ok_or(SearchError::NoCollection)?;
        progress.advance(QueryStage::OracleReady)?;

        let marker = QueryMarker::new(Arc::clone(oracle), Arc::clone(&self.labeling))?;
        let target = marker.target_label(query);
        progress.advance(QueryStage::MarkerBuilt)?;

        let plan = IterationPlan::new(
            oracle.index_width(),
            self.settings.expected_marked,
            self.settings.exact,
        )?;
        progress.advance(QueryStage::IterationsComputed)?;

        let width = NonZeroUsize::new(oracle.index_width())
            .ok_or_else(|| CircuitError::new("Oracle has an empty index register"))?;
        let circuit = prepare_circuit(width, &plan, |b, index, phase| {
            marker.mark(b, index, query, phase)
        })?;
        progress.advance(QueryStage::CircuitPrepared)?;

        Ok(PreparedQuery {
            circuit,
            plan,
            target,
            progress,
        })
    }

    /// Submit a prepared query and return the sampled index.
    pub fn execute(&self, prepared: &mut PreparedQuery) -> Result<usize, SearchError> {
        prepared.progress.advance(QueryStage::Submitted)?;
        let index = extract(&prepared.circuit, &self.backend, self.settings.shots)?;
        prepared.progress.advance(QueryStage::ResultExtracted)?;
        Ok(index)
    }

    /// Run a search for `query` and return the sampled index.
    ///
    /// If the query is not in the collection the result is an arbitrary index; use
    /// [`SearchEngine::locate`] to tell the two apart.
    pub fn search<Q>(&self, query: &Q) -> Result<usize, SearchError>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let mut prepared = self.prepare(query)?;
        let index = self.execute(&mut prepared)?;
        tracing::info!(index, iterations = prepared.plan.iterations, "Search finished.");
        Ok(index)
    }

    /// Run a search and check the item at the sampled index against the query.
    ///
    /// The comparison is on item bytes, so an absent query whose label collides with a stored
    /// item's is still reported as not found.
    pub fn locate<Q>(&self, query: &Q) -> Result<SearchOutcome, SearchError>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let mut prepared = self.prepare(query)?;
        let sampled = self.execute(&mut prepared)?;
        let stored = self.oracle.as_ref().and_then(|oracle| oracle.item(sampled));
        let outcome = if stored == Some(query.as_ref()) {
            SearchOutcome::Found(sampled)
        } else {
            SearchOutcome::NotFound { sampled }
        };
        tracing::info!(?outcome, "Locate finished.");
        Ok(outcome)
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::backend::StatevectorBackend;

    #[test]
    fn test_stages_cannot_be_skipped() {
        let mut progress = QueryProgress::new();
        assert!(progress.advance(QueryStage::MarkerBuilt).is_err());
        assert!(progress.advance(QueryStage::OracleReady).is_ok());
        assert!(progress.advance(QueryStage::OracleReady).is_err());
        assert_eq!(progress.stage(), QueryStage::OracleReady);
    }

    #[test]
    fn test_stage_order() {
        let mut stage = QueryStage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert!(stage.is_terminal());
    }

    #[test]
    fn test_query_without_collection() {
        let engine = SearchEngine::new(SearchConfig::default(), StatevectorBackend::<f64>::new());
        assert!(matches!(
            engine.search("Gallia"),
            Err(SearchError::NoCollection)
        ));
    }

    #[test]
    fn test_prepared_query_stops_before_submission() -> Result<(), SearchError> {
        let mut engine =
            SearchEngine::new(SearchConfig::default(), StatevectorBackend::<f64>::seeded(1));
        engine.update_collection(&["a", "b", "c"])?;
        let mut prepared = engine.prepare("b")?;
        assert_eq!(prepared.stage(), QueryStage::CircuitPrepared);
        assert_eq!(prepared.plan().iterations, 2);
        assert!(prepared.circuit().measured().is_some());
        let _ = engine.execute(&mut prepared)?;
        assert_eq!(prepared.stage(), QueryStage::ResultExtracted);
        assert!(engine.execute(&mut prepared).is_err());
        Ok(())
    }

    #[test]
    fn test_label_twin_is_not_found() -> Result<(), SearchError> {
        // "w7" shares its 6-bit label with "omnis" at index 2.
        let words = ["Gallia", "est", "omnis", "divisa", "in", "partes", "tres", "quarum"];
        let mut engine =
            SearchEngine::new(SearchConfig::default(), StatevectorBackend::<f64>::seeded(1));
        engine.update_collection(&words)?;
        assert_eq!(
            engine.labeling().label("w7"),
            engine.labeling().label("omnis")
        );
        assert_eq!(engine.search("w7")?, 2);
        assert_eq!(engine.locate("w7")?, SearchOutcome::NotFound { sampled: 2 });
        assert_eq!(engine.locate("omnis")?, SearchOutcome::Found(2));
        Ok(())
    }

    #[test]
    fn test_rejects_collisions_when_asked() {
        let settings = SearchConfig {
            reject_collisions: true,
            ..SearchConfig::default()
        };
        let mut engine = SearchEngine::new(settings, StatevectorBackend::<f64>::new());
        let words = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog"];
        assert!(matches!(
            engine.update_collection(&words),
            Err(SearchError::LabelCollision { .. })
        ));
        assert!(engine.oracle().is_none());
    }
}
