pub mod escalation;
pub mod rate_window;
pub mod sanction;
pub mod toxicity;

mod violation;

pub use violation::ViolationSignal;
