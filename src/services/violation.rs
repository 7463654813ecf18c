use std::time::Duration;

/// A detector's indication that activity crossed an abuse threshold.
/// Ephemeral; only the resulting sanction is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationSignal {
    SpamBurst { count: u32, window: Duration },
    Toxicity { score: f32 },
}

impl ViolationSignal {
    pub fn reason(&self) -> String {
        match self {
            ViolationSignal::SpamBurst { count, window } => {
                format!("spam burst: {} events in {}s", count, window.as_secs())
            }
            ViolationSignal::Toxicity { score } => format!("toxic message (score {score:.2})"),
        }
    }
}
