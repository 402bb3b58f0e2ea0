use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info};

use super::error::EngineError;
use super::inference::LiveInference;
use super::lifecycle::EngineState;
use crate::config::EngineConfig;
use crate::notifications::{EngineEvent, EventBus};
use crate::tree::{
    Binner, NodeId, NodeView, OutcomeLabeler, SequenceExtractor, SequenceTree, SynthesisEngine,
    TreeSnapshot,
};
use crate::types::{return_series, validate_series, PriceBar, Synthesis};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainReport {
    pub source: String,
    pub bars: usize,
    pub sequences: usize,
    pub nodes_created: usize,
    pub node_count: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub state: EngineState,
    pub config: Option<EngineConfig>,
    pub node_count: usize,
    pub trained_sequences: u64,
    pub bin_edges: Option<Vec<f64>>,
    pub live_bars: u64,
}

impl EngineStatus {
    pub fn uninitialized() -> Self {
        Self {
            state: EngineState::Uninitialized,
            config: None,
            node_count: 0,
            trained_sequences: 0,
            bin_edges: None,
            live_bars: 0,
        }
    }
}

#[derive(Debug)]
struct LoadedBatch {
    source: String,
    bars: Vec<PriceBar>,
}

/// Held for the whole of `train`, which makes training the only writer.
#[derive(Debug, Default)]
struct Lifecycle {
    pending: Option<LoadedBatch>,
}

/// One model: config, frozen bin boundaries, the tree and the live window.
pub struct SequenceEngine {
    config: EngineConfig,
    tree: SequenceTree,
    binner: OnceLock<Binner>,
    state: RwLock<EngineState>,
    lifecycle: Mutex<Lifecycle>,
    live: Mutex<LiveInference>,
    trained_sequences: AtomicU64,
    /// Set once the first batch has been fully inserted.
    trained: AtomicBool,
    events: EventBus,
}

impl SequenceEngine {
    pub fn initialize(config: EngineConfig, events: EventBus) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|errors| EngineError::InvalidConfig { errors })?;

        info!(
            "Engine initialized: bins={}, sequence_length={}, confidence={}, lookahead={}, take_profit={}",
            config.num_bins,
            config.sequence_length,
            config.confidence_threshold,
            config.lookahead_days,
            config.take_profit_threshold
        );
        events.publish(EngineEvent::EngineInitialized {
            config: config.clone(),
        });

        Ok(Self {
            tree: SequenceTree::new(
                config.sequence_length,
                SynthesisEngine::new(config.confidence_threshold),
            ),
            live: Mutex::new(LiveInference::new(config.sequence_length)),
            binner: OnceLock::new(),
            state: RwLock::new(EngineState::Initialized),
            lifecycle: Mutex::new(Lifecycle::default()),
            trained_sequences: AtomicU64::new(0),
            trained: AtomicBool::new(false),
            config,
            events,
        })
    }

    pub fn state(&self) -> EngineState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: EngineState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn check_can_load(&self) -> Result<(), EngineError> {
        self.state().require_load()
    }

    /// Stages `bars` for the next `train`, replacing any batch not yet trained.
    /// Nothing changes when validation fails.
    pub fn load_bars(&self, source: &str, bars: Vec<PriceBar>) -> Result<usize, EngineError> {
        let mut lifecycle = lock(&self.lifecycle);
        self.check_can_load()?;
        validate_series(&bars).map_err(|reason| EngineError::data_load(source, reason))?;

        let count = bars.len();
        lifecycle.pending = Some(LoadedBatch {
            source: source.to_string(),
            bars,
        });
        self.set_state(EngineState::DataLoaded);

        info!("Loaded {} bars from {}", count, source);
        self.events.publish(EngineEvent::DataLoaded {
            source: source.to_string(),
            bars: count,
        });
        Ok(count)
    }

    /// Runs extraction, labelling and insertion over the staged batch. The
    /// tree only grows; earlier batches keep their counts.
    pub fn train(&self) -> Result<TrainReport, EngineError> {
        let started = Instant::now();
        let mut lifecycle = lock(&self.lifecycle);
        let state = self.state();
        state.require_train()?;
        let batch = lifecycle.pending.take().ok_or(EngineError::InvalidState {
            operation: "train",
            state,
        })?;

        match self.train_batch(&batch, started) {
            Ok(report) => {
                self.set_state(EngineState::Trained);
                self.trained.store(true, Ordering::Release);
                Ok(report)
            }
            Err(e) => {
                lifecycle.pending = Some(batch);
                Err(e)
            }
        }
    }

    fn train_batch(&self, batch: &LoadedBatch, started: Instant) -> Result<TrainReport, EngineError> {
        let closes: Vec<f64> = batch.bars.iter().map(|b| b.close).collect();
        let returns = return_series(&batch.bars);

        let needed = self.config.sequence_length + self.config.lookahead_days;
        if returns.len() < needed {
            return Err(EngineError::InsufficientData {
                bars: closes.len(),
                required: self.config.min_bars(),
            });
        }

        let binner = self.fitted_binner(&returns, &batch.source)?;
        let bins: Vec<usize> = returns.iter().map(|&r| binner.bin(r)).collect();

        let extractor = SequenceExtractor::new(self.config.sequence_length, self.config.lookahead_days);
        let sequences = extractor.extract(&bins, &closes)?;
        let labeler = OutcomeLabeler::new(self.config.take_profit_threshold);

        info!(
            "Training on {} sequences from {} ({} bars)",
            sequences.len(),
            batch.source,
            closes.len()
        );

        let mut nodes_created = 0;
        for sequence in &sequences {
            let outcome = labeler.label(sequence.reference_close, sequence.outcome_window);
            nodes_created += self.tree.insert(sequence.bins, outcome, |node| {
                self.events.publish(EngineEvent::NodeCreated(node));
            });
        }

        self.trained_sequences
            .fetch_add(sequences.len() as u64, Ordering::Relaxed);
        if let Some(&last) = closes.last() {
            lock(&self.live).seed(last);
        }

        let report = TrainReport {
            source: batch.source.clone(),
            bars: closes.len(),
            sequences: sequences.len(),
            nodes_created,
            node_count: self.tree.node_count(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Training complete: {} sequences, {} new nodes, {} total, {}ms",
            report.sequences, report.nodes_created, report.node_count, report.elapsed_ms
        );
        self.events.publish(EngineEvent::TrainComplete {
            report: report.clone(),
        });
        Ok(report)
    }

    /// Boundaries come from the first trained batch and never move afterwards.
    fn fitted_binner(&self, returns: &[f64], source: &str) -> Result<&Binner, EngineError> {
        if let Some(binner) = self.binner.get() {
            return Ok(binner);
        }
        let fitted = Binner::fit(returns, self.config.num_bins)
            .ok_or_else(|| EngineError::data_load(source, "no finite returns to fit bins"))?;
        debug!("Bin edges fitted: {:?}", fitted.edges());
        Ok(self.binner.get_or_init(|| fitted))
    }

    /// Live decision for one new bar. Never blocks on training beyond a
    /// single node's lock. Rejected until the first train has completed,
    /// even though bin edges exist as soon as that train starts inserting.
    pub fn process_new_data(&self, bar: PriceBar) -> Result<Synthesis, EngineError> {
        let not_trained = || EngineError::InvalidState {
            operation: "processNewData",
            state: self.state(),
        };
        if !self.trained.load(Ordering::Acquire) {
            return Err(not_trained());
        }
        let binner = self.binner.get().ok_or_else(not_trained)?;

        let decision = lock(&self.live).decide(&bar, binner, &self.tree)?;
        debug!("Bar close={} at {} -> {}", bar.close, bar.timestamp, decision);

        self.events.publish(EngineEvent::DecisionTriggered {
            decision,
            data: bar,
            timestamp: chrono::Utc::now(),
        });
        Ok(decision)
    }

    /// Waits for any running `train` so the copy never mixes two batches.
    pub fn tree_snapshot(&self) -> TreeSnapshot {
        let _lifecycle = lock(&self.lifecycle);
        self.tree.snapshot()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeView> {
        self.tree.node(id).map(|node| NodeView::capture(&node))
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state(),
            config: Some(self.config.clone()),
            node_count: self.tree.node_count(),
            trained_sequences: self.trained_sequences.load(Ordering::Relaxed),
            bin_edges: self.binner.get().map(Binner::edges),
            live_bars: lock(&self.live).bars_seen(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
