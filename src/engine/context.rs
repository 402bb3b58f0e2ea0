use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::sequence_engine::{EngineStatus, SequenceEngine, TrainReport};
use super::error::EngineError;
use super::lifecycle::EngineState;
use crate::config::EngineConfig;
use crate::data::BarSource;
use crate::notifications::{EngineEvent, EventBus};
use crate::tree::{NodeId, NodeView, TreeSnapshot};
use crate::types::{PriceBar, Synthesis};

/// Shared handle the transports hold. Owns at most one engine; until
/// `initialize` runs every operation reports `UNINITIALIZED`.
#[derive(Clone)]
pub struct EngineContext {
    engine: Arc<RwLock<Option<Arc<SequenceEngine>>>>,
    events: EventBus,
    source: Arc<dyn BarSource>,
    defaults: EngineConfig,
}

impl EngineContext {
    pub fn new(source: Arc<dyn BarSource>, events: EventBus, defaults: EngineConfig) -> Self {
        Self {
            engine: Arc::new(RwLock::new(None)),
            events,
            source,
            defaults,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Builds a fresh engine, discarding any previous tree. `None` uses the
    /// configured defaults.
    pub async fn initialize(&self, config: Option<EngineConfig>) -> Result<EngineConfig, EngineError> {
        let config = config.unwrap_or_else(|| self.defaults.clone());
        let engine = SequenceEngine::initialize(config.clone(), self.events.clone())
            .map_err(|e| self.report(e))?;

        let mut slot = self.engine.write().await;
        if slot.is_some() {
            info!("Replacing existing engine");
        }
        *slot = Some(Arc::new(engine));
        Ok(config)
    }

    async fn engine(&self, operation: &'static str) -> Result<Arc<SequenceEngine>, EngineError> {
        self.engine.read().await.clone().ok_or(EngineError::InvalidState {
            operation,
            state: EngineState::Uninitialized,
        })
    }

    pub async fn load_data(&self, name: &str) -> Result<usize, EngineError> {
        let engine = self.engine("loadData").await?;
        engine.check_can_load()?;

        let bars = self.source.fetch_bars(name).await.map_err(|e| self.report(e))?;
        let name = name.to_string();
        self.blocking(move || engine.load_bars(&name, bars)).await
    }

    /// Training holds the engine's writer lock for its whole run, so it goes
    /// to the blocking pool and the runtime keeps serving.
    pub async fn train(&self) -> Result<TrainReport, EngineError> {
        let engine = self.engine("train").await?;
        self.blocking(move || engine.train()).await
    }

    pub async fn process_new_data(&self, bar: PriceBar) -> Result<Synthesis, EngineError> {
        let engine = self.engine("processNewData").await?;
        engine.process_new_data(bar).map_err(|e| self.report(e))
    }

    pub async fn tree_snapshot(&self) -> Result<TreeSnapshot, EngineError> {
        let engine = self.engine("getTree").await?;
        self.blocking(move || Ok(engine.tree_snapshot())).await
    }

    pub async fn node(&self, id: NodeId) -> Result<Option<NodeView>, EngineError> {
        let engine = self.engine("getNode").await?;
        Ok(engine.node(id))
    }

    pub async fn status(&self) -> EngineStatus {
        match self.engine.read().await.as_ref() {
            Some(engine) => engine.status(),
            None => EngineStatus::uninitialized(),
        }
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::task::spawn_blocking(work).await {
            Ok(result) => result.map_err(|e| self.report(e)),
            Err(e) => Err(self.report(EngineError::Worker {
                reason: e.to_string(),
            })),
        }
    }

    /// Mirrors a failure onto the event stream before handing it back.
    fn report(&self, error: EngineError) -> EngineError {
        warn!("{}", error);
        self.events.publish(EngineEvent::Error {
            message: error.to_string(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::MockBarSource;
    use crate::types::bar::fixtures::bars_from_closes;

    fn config() -> EngineConfig {
        EngineConfig {
            num_bins: 4,
            sequence_length: 2,
            confidence_threshold: 0.6,
            lookahead_days: 1,
            take_profit_threshold: 0.02,
        }
    }

    fn context_with(source: MockBarSource) -> EngineContext {
        EngineContext::new(Arc::new(source), EventBus::new(64), config())
    }

    fn scenario_source() -> MockBarSource {
        let mut source = MockBarSource::new();
        source
            .expect_fetch_bars()
            .returning(|_| Ok(bars_from_closes(&[100.0, 102.0, 101.0, 104.0, 99.0])));
        source
    }

    #[tokio::test]
    async fn test_operations_before_initialize() {
        let ctx = context_with(MockBarSource::new());

        let err = ctx.load_data("x.csv").await.unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState {
                operation: "loadData",
                state: EngineState::Uninitialized
            }
        );
        assert!(ctx.train().await.is_err());
        assert!(ctx.tree_snapshot().await.is_err());
        assert_eq!(ctx.status().await.state, EngineState::Uninitialized);
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let ctx = context_with(scenario_source());
        let mut events = ctx.events().subscribe();

        ctx.initialize(None).await.unwrap();
        assert_eq!(ctx.load_data("scenario.csv").await.unwrap(), 5);
        let report = ctx.train().await.unwrap();
        assert_eq!(report.sequences, 2);

        let tree = ctx.tree_snapshot().await.unwrap();
        assert_eq!(tree.root.weight, 2);

        let status = ctx.status().await;
        assert_eq!(status.state, EngineState::Trained);
        assert_eq!(status.node_count, 5);

        let mut names = Vec::new();
        while let Some(event) = events.try_next() {
            names.push(event.name());
        }
        assert_eq!(names.first(), Some(&"ENGINE_INITIALIZED"));
        assert_eq!(names.last(), Some(&"TRAIN_COMPLETE"));
        assert_eq!(names.iter().filter(|n| **n == "NODE_CREATED").count(), 4);
    }

    #[tokio::test]
    async fn test_source_failure_is_published() {
        let mut source = MockBarSource::new();
        source
            .expect_fetch_bars()
            .returning(|name| Err(EngineError::source_missing(name, "not found")));
        let ctx = context_with(source);
        let mut events = ctx.events().subscribe();
        ctx.initialize(None).await.unwrap();

        let err = ctx.load_data("missing.csv").await.unwrap_err();
        assert!(matches!(err, EngineError::DataLoad { missing: true, .. }));

        let mut saw_error = false;
        while let Some(event) = events.try_next() {
            saw_error |= matches!(event, EngineEvent::Error { .. });
        }
        assert!(saw_error);
        assert_eq!(ctx.status().await.state, EngineState::Initialized);
    }

    #[tokio::test]
    async fn test_reinitialize_discards_tree() {
        let ctx = context_with(scenario_source());
        ctx.initialize(None).await.unwrap();
        ctx.load_data("scenario.csv").await.unwrap();
        ctx.train().await.unwrap();

        ctx.initialize(None).await.unwrap();
        let status = ctx.status().await;
        assert_eq!(status.state, EngineState::Initialized);
        assert_eq!(status.node_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_keeps_previous_engine() {
        let ctx = context_with(scenario_source());
        ctx.initialize(None).await.unwrap();

        let mut bad = config();
        bad.confidence_threshold = 1.5;
        assert!(matches!(
            ctx.initialize(Some(bad)).await,
            Err(EngineError::InvalidConfig { .. })
        ));
        assert_eq!(ctx.status().await.state, EngineState::Initialized);
    }

    #[tokio::test]
    async fn test_decisions_published() {
        let ctx = context_with(scenario_source());
        let mut events = ctx.events().subscribe();
        ctx.initialize(None).await.unwrap();
        ctx.load_data("scenario.csv").await.unwrap();
        ctx.train().await.unwrap();
        while events.try_next().is_some() {}

        let mut bar = bars_from_closes(&[101.0])[0];
        bar.timestamp += chrono::Duration::days(30);
        assert_eq!(ctx.process_new_data(bar).await.unwrap(), Synthesis::None);

        match events.try_next() {
            Some(EngineEvent::DecisionTriggered { decision, data, .. }) => {
                assert_eq!(decision, Synthesis::None);
                assert_eq!(data.close, 101.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_bar_is_published() {
        let ctx = context_with(scenario_source());
        let mut events = ctx.events().subscribe();
        ctx.initialize(None).await.unwrap();
        ctx.load_data("scenario.csv").await.unwrap();
        while events.try_next().is_some() {}

        let bar = bars_from_closes(&[101.0])[0];
        let err = ctx.process_new_data(bar).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { operation: "processNewData", .. }));

        match events.try_next() {
            Some(EngineEvent::Error { message }) => assert_eq!(message, err.to_string()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_status_served_while_training() {
        let mut source = MockBarSource::new();
        source.expect_fetch_bars().returning(|_| {
            let closes: Vec<f64> = (0..20_000)
                .map(|i| 100.0 * (1.0 + 0.03 * ((i * 7 % 11) as f64 / 10.0 - 0.5)))
                .collect();
            Ok(bars_from_closes(&closes))
        });
        let ctx = context_with(source);
        ctx.initialize(None).await.unwrap();
        ctx.load_data("large.csv").await.unwrap();

        let trainer = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.train().await }
        });
        while !trainer.is_finished() {
            let status = ctx.status().await;
            assert!(matches!(status.state, EngineState::DataLoaded | EngineState::Trained));
            tokio::task::yield_now().await;
        }

        let report = trainer.await.unwrap().unwrap();
        assert_eq!(ctx.tree_snapshot().await.unwrap().root.weight, report.sequences as u64);
    }
}

