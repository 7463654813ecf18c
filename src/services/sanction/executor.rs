use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::StateCache;
use crate::constants::defaults::LEDGER_RETRY_BACKOFF_MS;
use crate::db::models::{Infraction, InfractionKind, Issuer};
use crate::engine::error::Error;
use crate::engine::metrics::{inc, EngineMetrics};
use crate::events::ModKey;
use crate::ledger::InfractionLedger;
use crate::services::escalation::SanctionDecision;
use crate::services::sanction::{DeadLetterQueue, PlatformAction};
use crate::services::sanction::sink::ActionSink;

/// Audit trail entry emitted for every applied sanction.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub infraction_id: Uuid,
    pub guild_id: i64,
    pub user_id: i64,
    pub kind: InfractionKind,
    pub duration_secs: Option<u64>,
    pub reason: String,
    pub moderator_id: Option<i64>,
    pub superseded: u64,
}

#[derive(Debug, Clone)]
pub enum ExecutionResult {
    Applied(Infraction),
    /// The decision was already recorded for this source event; replay is a
    /// no-op.
    Duplicate(Uuid),
}

/// Applies a decided sanction: records it in the ledger, updates the cache,
/// emits the platform action and the audit event. The caller holds the
/// per-key critical section; every I/O call in here is bounded by
/// `op_timeout` so the key can never be locked indefinitely.
pub struct SanctionExecutor {
    ledger: Arc<dyn InfractionLedger>,
    cache: Arc<dyn StateCache>,
    sink: Arc<dyn ActionSink>,
    metrics: Arc<EngineMetrics>,
    dead_letters: Arc<DeadLetterQueue>,
    ledger_retry_attempts: u32,
    sink_retry_attempts: u32,
    op_timeout: Duration,
    audit_tx: OnceCell<UnboundedSender<AuditRecord>>,
}

impl SanctionExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn InfractionLedger>,
        cache: Arc<dyn StateCache>,
        sink: Arc<dyn ActionSink>,
        metrics: Arc<EngineMetrics>,
        dead_letters: Arc<DeadLetterQueue>,
        ledger_retry_attempts: u32,
        sink_retry_attempts: u32,
        op_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            cache,
            sink,
            metrics,
            dead_letters,
            ledger_retry_attempts: ledger_retry_attempts.max(1),
            sink_retry_attempts: sink_retry_attempts.max(1),
            op_timeout,
            audit_tx: OnceCell::new(),
        }
    }

    /// Attach an audit consumer. Only the first caller gets the stream.
    pub fn audit_stream(&self) -> Option<UnboundedReceiver<AuditRecord>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.audit_tx.set(tx).ok().map(|_| rx)
    }

    pub async fn execute(
        &self,
        key: ModKey,
        decision: &SanctionDecision,
        issued_by: Issuer,
        source_event_id: Option<Uuid>,
    ) -> Result<ExecutionResult, Error> {
        // Replay guard: a decision already executed for this event no-ops
        if let Some(event_id) = source_event_id {
            if let Some(existing) = self
                .bounded("ledger lookup", self.ledger.find_by_source_event(event_id))
                .await?
            {
                inc(&self.metrics.duplicate_decisions);
                return Ok(ExecutionResult::Duplicate(existing.id));
            }
        }

        let now = Utc::now();
        let infraction = Infraction {
            id: Uuid::new_v4(),
            guild_id: key.guild_id,
            user_id: key.user_id,
            kind: decision.kind,
            reason: decision.reason.clone(),
            issued_by,
            source_event_id,
            issued_at: now,
            expires_at: decision
                .duration
                .map(|d| now + chrono::Duration::seconds(d.as_secs() as i64)),
            active: true,
        };

        let superseded = self.record(key, &infraction).await?;
        self.write_through(key, &infraction).await;
        self.dispatch(PlatformAction::for_infraction(&infraction)).await;

        inc(&self.metrics.sanctions_issued);
        info!(
            infraction_id = %infraction.id,
            guild_id = key.guild_id,
            user_id = key.user_id,
            kind = infraction.kind.as_str(),
            duration_secs = decision.duration.map(|d| d.as_secs()),
            reason = %infraction.reason,
            superseded,
            "sanction applied"
        );
        if let Some(tx) = self.audit_tx.get() {
            let _ = tx.send(AuditRecord {
                infraction_id: infraction.id,
                guild_id: key.guild_id,
                user_id: key.user_id,
                kind: infraction.kind,
                duration_secs: decision.duration.map(|d| d.as_secs()),
                reason: infraction.reason.clone(),
                moderator_id: issued_by.moderator_id(),
                superseded,
            });
        }

        Ok(ExecutionResult::Applied(infraction))
    }

    /// Supersede-then-append as one retried unit. Deactivation is idempotent,
    /// so a retry after a partial failure converges.
    async fn record(&self, key: ModKey, infraction: &Infraction) -> Result<u64, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .bounded("ledger append", self.record_once(key, infraction))
                .await;
            match result {
                Ok(superseded) => return Ok(superseded),
                Err(e) if attempt < self.ledger_retry_attempts => {
                    warn!(
                        attempt,
                        error = %e,
                        infraction_id = %infraction.id,
                        "ledger write failed, retrying"
                    );
                    sleep(Duration::from_millis(LEDGER_RETRY_BACKOFF_MS * attempt as u64)).await;
                }
                Err(e) => {
                    self.dead_letters.park(
                        key,
                        infraction.kind,
                        infraction.reason.clone(),
                        e.to_string(),
                    );
                    inc(&self.metrics.dead_letters);
                    error!(
                        attempts = attempt,
                        error = %e,
                        guild_id = key.guild_id,
                        user_id = key.user_id,
                        kind = infraction.kind.as_str(),
                        "ledger write exhausted retries; sanction parked in dead-letter queue"
                    );
                    return Err(Error::LedgerWrite { attempts: attempt });
                }
            }
        }
    }

    async fn record_once(&self, key: ModKey, infraction: &Infraction) -> Result<u64, Error> {
        // At most one active mute/ban per key: a new one supersedes the old
        let superseded = match infraction.kind {
            InfractionKind::Mute | InfractionKind::Ban => {
                self.ledger
                    .deactivate_active_of_kind(key.guild_id, key.user_id, infraction.kind)
                    .await?
            }
            _ => 0,
        };
        self.ledger.append(infraction).await?;
        Ok(superseded)
    }

    /// Write-through cache update. Failure never propagates: the entry is
    /// invalidated instead so the next read rebuilds from the ledger.
    async fn write_through(&self, key: ModKey, infraction: &Infraction) {
        match self.cache.get(key).await {
            Ok(Some(mut state)) => {
                if infraction.kind == InfractionKind::Mute {
                    // The new mute superseded any prior one
                    state.active_mute = None;
                }
                state.apply(infraction);
                if let Err(e) = self.cache.put(key, state).await {
                    inc(&self.metrics.cache_invalidations);
                    warn!(error = %e, "cache put failed, invalidating entry");
                    let _ = self.cache.invalidate(key).await;
                }
            }
            Ok(None) => {} // rebuilt lazily on the next read
            Err(e) => {
                inc(&self.metrics.cache_invalidations);
                warn!(error = %e, "cache read failed during write-through, invalidating");
                let _ = self.cache.invalidate(key).await;
            }
        }
    }

    /// Emit the platform action with bounded retries. Permanent failure is
    /// logged for manual moderator follow-up; the ledger record stands
    /// regardless.
    pub(crate) async fn dispatch(&self, action: PlatformAction) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.bounded("sink apply", self.sink.apply(&action)).await {
                Ok(()) => return,
                Err(e) if attempt < self.sink_retry_attempts => {
                    warn!(attempt, error = %e, action = ?action.kind, "platform action failed, retrying");
                    sleep(Duration::from_millis(LEDGER_RETRY_BACKOFF_MS * attempt as u64)).await;
                }
                Err(e) => {
                    inc(&self.metrics.sink_failures);
                    error!(
                        attempts = attempt,
                        error = %e,
                        guild_id = action.guild_id,
                        user_id = action.user_id,
                        action = ?action.kind,
                        "platform action permanently failed; needs manual follow-up"
                    );
                    return;
                }
            }
        }
    }

    async fn bounded<T>(
        &self,
        what: &'static str,
        fut: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::OperationTimeout(what)),
        }
    }
}
