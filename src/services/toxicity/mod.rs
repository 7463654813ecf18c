mod gate;
mod scorer;

pub use gate::{ToxicityGate, ToxicityVerdict};
pub use scorer::{KeywordScorer, ToxicityScorer};
