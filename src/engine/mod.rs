pub mod error;
pub mod locks;
pub mod metrics;
mod pipeline;

pub use pipeline::IngestOutcome;

use std::sync::Arc;

use crate::cache::{InMemoryStateCache, StateCache};
use crate::config::Settings;
use crate::ledger::InfractionLedger;
use crate::services::escalation::EscalationPolicy;
use crate::services::rate_window::RateWindowTracker;
use crate::services::sanction::{
    ActionSink, DeadLetter, DeadLetterQueue, LoggingSink, SanctionExecutor,
};
use crate::services::toxicity::{KeywordScorer, ToxicityGate, ToxicityScorer};

use self::error::Error;
use self::locks::KeyLocks;
use self::metrics::{EngineMetrics, MetricsSnapshot};

/// The moderation engine: normalization, detection, escalation and sanction
/// execution behind one ingest surface. Construction wires the collaborators
/// together; per-event behavior lives in the pipeline module.
pub struct Engine {
    pub(crate) settings: Settings,
    pub(crate) windows: RateWindowTracker,
    pub(crate) toxicity: ToxicityGate,
    pub(crate) policy: EscalationPolicy,
    pub(crate) ledger: Arc<dyn InfractionLedger>,
    pub(crate) cache: Arc<dyn StateCache>,
    pub(crate) executor: SanctionExecutor,
    pub(crate) locks: KeyLocks,
    pub(crate) metrics: Arc<EngineMetrics>,
    dead_letters: Arc<DeadLetterQueue>,
}

impl Engine {
    pub fn new(
        settings: Settings,
        ledger: Arc<dyn InfractionLedger>,
        cache: Arc<dyn StateCache>,
        scorer: Arc<dyn ToxicityScorer>,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let dead_letters = Arc::new(DeadLetterQueue::new());
        let executor = SanctionExecutor::new(
            ledger.clone(),
            cache.clone(),
            sink,
            metrics.clone(),
            dead_letters.clone(),
            settings.ledger_retry_attempts,
            settings.sink_retry_attempts,
            settings.ledger_op_timeout(),
        );

        Self {
            windows: RateWindowTracker::new(
                settings.spam_threshold_messages,
                settings.spam_window(),
            ),
            toxicity: ToxicityGate::new(
                scorer,
                settings.toxicity_threshold,
                settings.scorer_timeout(),
                metrics.clone(),
            ),
            policy: settings.policy(),
            ledger,
            cache,
            executor,
            locks: KeyLocks::new(),
            metrics,
            dead_letters,
            settings,
        }
    }

    /// Self-contained engine over an in-memory ledger, default scorer and
    /// logging sink. Used for local runs without a database.
    pub fn in_memory(settings: Settings, ledger: Arc<dyn InfractionLedger>) -> Self {
        let cache = Arc::new(InMemoryStateCache::new(settings.cache_ttl()));
        Self::new(
            settings,
            ledger,
            cache,
            Arc::new(KeywordScorer::new()),
            Arc::new(LoggingSink),
        )
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.drain()
    }

    pub fn pending_dead_letters(&self) -> usize {
        self.dead_letters.len()
    }

    /// Attach an audit consumer; only the first caller gets the stream.
    pub fn audit_stream(
        &self,
    ) -> Option<tokio::sync::mpsc::UnboundedReceiver<crate::services::sanction::AuditRecord>> {
        self.executor.audit_stream()
    }

    /// Ledger and cache calls made while a per-key lock is held must go
    /// through here: the lock can never be wedged by a hung store.
    pub(crate) async fn bounded<T>(
        &self,
        what: &'static str,
        fut: impl std::future::Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout(self.settings.ledger_op_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::OperationTimeout(what)),
        }
    }
}
