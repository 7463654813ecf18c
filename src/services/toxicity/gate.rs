use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::engine::error::Error;
use crate::engine::metrics::{inc, EngineMetrics};
use crate::events::{ActivityEvent, EventKind};
use crate::services::toxicity::ToxicityScorer;

#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityVerdict {
    pub event_id: Uuid,
    pub score: f32,
    pub exceeds_threshold: bool,
}

/// Runs the pluggable scorer against message text under a bounded timeout.
/// Fail-open: a slow or broken scorer yields no verdict and a counter bump,
/// never a blocked pipeline or a false positive.
pub struct ToxicityGate {
    scorer: Arc<dyn ToxicityScorer>,
    threshold: f32,
    timeout: Duration,
    metrics: Arc<EngineMetrics>,
}

impl ToxicityGate {
    pub fn new(
        scorer: Arc<dyn ToxicityScorer>,
        threshold: f32,
        timeout: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            scorer,
            threshold,
            timeout,
            metrics,
        }
    }

    pub async fn evaluate(&self, event: &ActivityEvent) -> Option<ToxicityVerdict> {
        let text = match (event.kind, event.content.as_deref()) {
            (EventKind::Message | EventKind::Edit, Some(text)) if !text.is_empty() => text,
            _ => return None,
        };

        let result = match timeout(self.timeout, self.scorer.score(text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::DetectorTimeout(self.timeout.as_millis() as u64)),
        };
        match result {
            Ok(score) => {
                let score = score.clamp(0.0, 1.0);
                Some(ToxicityVerdict {
                    event_id: event.event_id,
                    score,
                    // Closed lower bound: threshold 0.0 flags everything
                    exceeds_threshold: score >= self.threshold,
                })
            }
            Err(e @ Error::DetectorTimeout(_)) => {
                inc(&self.metrics.scorer_timeouts);
                warn!(event_id = %event.event_id, error = %e, "toxicity scorer timed out");
                None
            }
            Err(e) => {
                inc(&self.metrics.scorer_failures);
                warn!(event_id = %event.event_id, error = %e, "toxicity scorer failed");
                None
            }
        }
    }
}
