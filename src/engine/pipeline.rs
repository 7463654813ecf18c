use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::UserModerationState;
use crate::db::models::{Infraction, InfractionKind, Issuer};
use crate::engine::error::Error;
use crate::engine::metrics::inc;
use crate::engine::Engine;
use crate::events::{self, ModKey, RawEvent};
use crate::services::escalation::{decide, SanctionDecision};
use crate::services::sanction::{ExecutionResult, PlatformAction};
use crate::services::ViolationSignal;

#[derive(Debug)]
pub enum IngestOutcome {
    /// The payload could not be normalized; logged, counted, discarded.
    Dropped,
    /// No violation, or a violation that required no new sanction.
    Clean,
    Sanctioned(ExecutionResult),
}

impl Engine {
    /// Process one raw platform payload end to end: normalize, detect,
    /// decide, execute. Malformed input is dropped without failing the
    /// pipeline; only infrastructure errors surface as `Err`.
    pub async fn ingest(&self, raw: serde_json::Value) -> Result<IngestOutcome, Error> {
        let raw: RawEvent = match serde_json::from_value(raw) {
            Ok(raw) => raw,
            Err(e) => {
                inc(&self.metrics.events_dropped);
                warn!(error = %e, "undecodable event payload dropped");
                return Ok(IngestOutcome::Dropped);
            }
        };
        let event = match events::normalize(raw) {
            Ok(event) => event,
            Err(e) => {
                inc(&self.metrics.events_dropped);
                warn!(error = %e, "malformed event dropped");
                return Ok(IngestOutcome::Dropped);
            }
        };
        inc(&self.metrics.events_ingested);

        let key = event.key();
        // Detectors are independent; a stalled scorer never delays the
        // rate window and vice versa.
        let (burst, verdict) = tokio::join!(
            async { self.windows.record(key) },
            self.toxicity.evaluate(&event)
        );

        let mut violations: Vec<ViolationSignal> = Vec::new();
        if let Some(signal) = burst {
            inc(&self.metrics.spam_violations);
            violations.push(signal);
        }
        if let Some(verdict) = verdict {
            if verdict.exceeds_threshold {
                inc(&self.metrics.toxicity_violations);
                violations.push(ViolationSignal::Toxicity {
                    score: verdict.score,
                });
            }
        }
        if violations.is_empty() {
            return Ok(IngestOutcome::Clean);
        }

        // One decision per event: the critical section covers load, decide
        // and record so concurrent violations for the same key serialize.
        let _guard = self.locks.acquire(key).await;
        let state = self.load_state(key).await?;
        let Some(decision) = decide(&state, &violations, &self.policy, Utc::now()) else {
            debug!(
                guild_id = key.guild_id,
                user_id = key.user_id,
                "violations raised but no sanction due"
            );
            return Ok(IngestOutcome::Clean);
        };

        let result = self
            .executor
            .execute(key, &decision, Issuer::System, Some(event.event_id))
            .await?;
        Ok(IngestOutcome::Sanctioned(result))
    }

    /// Manual sanction issued by a moderator. Bypasses detection and the
    /// escalation ladder; still recorded, cached and executed like any other
    /// sanction. Durations are clamped to the configured mute ceiling.
    pub async fn moderator_action(
        &self,
        key: ModKey,
        kind: InfractionKind,
        duration: Option<Duration>,
        reason: String,
        moderator_id: i64,
    ) -> Result<ExecutionResult, Error> {
        let duration = match kind {
            InfractionKind::Mute => {
                Some(duration.unwrap_or(self.policy.base_mute_duration).min(self.policy.max_mute_duration))
            }
            _ => None,
        };
        let decision = SanctionDecision {
            kind,
            duration,
            reason,
        };

        let _guard = self.locks.acquire(key).await;
        self.executor
            .execute(key, &decision, Issuer::Moderator(moderator_id), None)
            .await
    }

    /// Manually lift a sanction before its expiry. Returns false when the
    /// infraction was already inactive (or never existed), so a race with
    /// the expiry sweeper resolves to a single winner.
    pub async fn revoke(&self, infraction_id: Uuid, reason: &str) -> Result<bool, Error> {
        let Some(inf) = self
            .bounded("ledger find", self.ledger.find(infraction_id))
            .await?
        else {
            return Ok(false);
        };
        let key = ModKey::new(inf.guild_id, inf.user_id);

        let _guard = self.locks.acquire(key).await;
        if !self
            .bounded("ledger deactivate", self.ledger.deactivate(infraction_id))
            .await?
        {
            return Ok(false);
        }
        if let Err(e) = self
            .bounded("cache invalidate", self.cache.invalidate(key))
            .await
        {
            warn!(error = %e, "cache invalidate failed after revoke");
        }
        if let Some(action) = PlatformAction::reversal(&inf, reason) {
            self.executor.dispatch(action).await;
        }
        info!(
            infraction_id = %infraction_id,
            guild_id = inf.guild_id,
            user_id = inf.user_id,
            kind = inf.kind.as_str(),
            reason,
            "sanction revoked"
        );
        Ok(true)
    }

    /// Full chronological infraction history for a key.
    pub async fn history(&self, key: ModKey) -> Result<Vec<Infraction>, Error> {
        self.ledger.history(key.guild_id, key.user_id).await
    }

    /// Read-through state load: cache first, rebuild from the ledger on a
    /// miss. A broken cache degrades to ledger reads rather than failing
    /// the pipeline.
    async fn load_state(&self, key: ModKey) -> Result<UserModerationState, Error> {
        match self.cache.get(key).await {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {}
            Err(e) => {
                inc(&self.metrics.cache_invalidations);
                warn!(error = %e, "cache read failed, falling back to ledger");
            }
        }

        let history = self
            .bounded("ledger history", self.ledger.history(key.guild_id, key.user_id))
            .await?;
        let state = UserModerationState::from_history(key, &history, Utc::now());
        if let Err(e) = self.cache.put(key, state.clone()).await {
            warn!(error = %e, "cache fill failed, continuing without it");
        }
        Ok(state)
    }
}
