use std::time::Duration;

/// Spam-burst detection thresholds (defaults, overridable via env vars)
pub const DEFAULT_SPAM_THRESHOLD_MESSAGES: u32 = 5;
pub const DEFAULT_SPAM_THRESHOLD_SECONDS: u64 = 10;

/// Toxicity score at or above which a message counts as a violation
pub const DEFAULT_TOXICITY_THRESHOLD: f32 = 0.7;

/// Warnings before a violation escalates to a mute
pub const DEFAULT_MAX_WARNINGS: u32 = 2;

/// First mute lasts 15 minutes; each further mute doubles it
pub const DEFAULT_BASE_MUTE_DURATION: Duration = Duration::from_secs(15 * 60);

/// Hard cap on mute duration (28 days, the platform maximum)
pub const DEFAULT_MAX_MUTE_DURATION: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// A violation during an active mute escalates straight to a kick
pub const DEFAULT_MUTE_EVASION_ESCALATES_TO_KICK: bool = true;

/// A would-be kick with a prior kick inside this window becomes a ban
pub const DEFAULT_KICK_LOOKBACK_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Budget for a single toxicity-scorer call
pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 250;

/// Hot-state cache entry lifetime
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60 * 60;

/// Ledger write retry policy
pub const DEFAULT_LEDGER_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_LEDGER_OP_TIMEOUT_MS: u64 = 2_000;
pub const LEDGER_RETRY_BACKOFF_MS: u64 = 50;

/// Outbound platform-action retry attempts
pub const DEFAULT_SINK_RETRY_ATTEMPTS: u32 = 3;

/// Interval for the expiry sweeper background task
pub const DEFAULT_EXPIRY_CHECK_INTERVAL_SECONDS: u64 = 10;

/// Per-key locks are reaped after this much idle time
pub const KEY_LOCK_IDLE_SECONDS: u64 = 10 * 60;
