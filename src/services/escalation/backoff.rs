use std::time::Duration;

/// Mute duration for the next mute: `base * 2^prior_mutes`, capped at `max`.
pub fn mute_duration(base: Duration, max: Duration, prior_mutes: u32) -> Duration {
    // 2^63 already saturates any sane cap; keep the shift in range
    let exp = prior_mutes.min(32);
    let secs = base.as_secs().saturating_mul(1u64 << exp);
    Duration::from_secs(secs).min(max)
}
