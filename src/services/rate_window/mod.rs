mod tracker;

pub use tracker::RateWindowTracker;
