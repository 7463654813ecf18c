mod backoff;
mod policy;

pub use backoff::mute_duration;
pub use policy::{decide, EscalationPolicy, SanctionDecision};
