use std::env;
use std::time::Duration;

use crate::constants::defaults::*;
use crate::engine::error::Error;
use crate::services::escalation::EscalationPolicy;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string; when absent the engine runs on the
    /// in-memory ledger (useful for local runs, never for production)
    pub database_url: Option<String>,
    /// Spam detection: events within the window before a burst fires
    pub spam_threshold_messages: u32,
    /// Spam detection: rolling window in seconds
    pub spam_threshold_seconds: u64,
    /// Toxicity score in [0,1] at or above which a message is flagged
    pub toxicity_threshold: f32,
    /// Warnings before the next violation becomes a mute
    pub max_warnings: u32,
    pub base_mute_duration_seconds: u64,
    pub max_mute_duration_seconds: u64,
    pub mute_evasion_escalates_to_kick: bool,
    pub kick_lookback_window_seconds: u64,
    /// Budget for one toxicity-scorer call
    pub scorer_timeout_ms: u64,
    pub cache_ttl_seconds: u64,
    pub ledger_retry_attempts: u32,
    pub ledger_op_timeout_ms: u64,
    pub sink_retry_attempts: u32,
    pub expiry_check_interval_seconds: u64,
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Settings {
    pub fn from_env() -> Result<Self, Error> {
        let settings = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            spam_threshold_messages: parse_env(
                "SPAM_THRESHOLD_MESSAGES",
                DEFAULT_SPAM_THRESHOLD_MESSAGES,
            ),
            spam_threshold_seconds: parse_env(
                "SPAM_THRESHOLD_SECONDS",
                DEFAULT_SPAM_THRESHOLD_SECONDS,
            ),
            toxicity_threshold: parse_env("TOXICITY_THRESHOLD", DEFAULT_TOXICITY_THRESHOLD),
            max_warnings: parse_env("MAX_WARNINGS", DEFAULT_MAX_WARNINGS),
            base_mute_duration_seconds: parse_env(
                "BASE_MUTE_DURATION_SECONDS",
                DEFAULT_BASE_MUTE_DURATION.as_secs(),
            ),
            max_mute_duration_seconds: parse_env(
                "MAX_MUTE_DURATION_SECONDS",
                DEFAULT_MAX_MUTE_DURATION.as_secs(),
            ),
            mute_evasion_escalates_to_kick: parse_env(
                "MUTE_EVASION_ESCALATES_TO_KICK",
                DEFAULT_MUTE_EVASION_ESCALATES_TO_KICK,
            ),
            kick_lookback_window_seconds: parse_env(
                "KICK_LOOKBACK_WINDOW_SECONDS",
                DEFAULT_KICK_LOOKBACK_WINDOW_SECONDS,
            ),
            scorer_timeout_ms: parse_env("SCORER_TIMEOUT_MS", DEFAULT_SCORER_TIMEOUT_MS),
            cache_ttl_seconds: parse_env("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS),
            ledger_retry_attempts: parse_env(
                "LEDGER_RETRY_ATTEMPTS",
                DEFAULT_LEDGER_RETRY_ATTEMPTS,
            ),
            ledger_op_timeout_ms: parse_env(
                "LEDGER_OP_TIMEOUT_MS",
                DEFAULT_LEDGER_OP_TIMEOUT_MS,
            ),
            sink_retry_attempts: parse_env("SINK_RETRY_ATTEMPTS", DEFAULT_SINK_RETRY_ATTEMPTS),
            expiry_check_interval_seconds: parse_env(
                "EXPIRY_CHECK_INTERVAL_SECONDS",
                DEFAULT_EXPIRY_CHECK_INTERVAL_SECONDS,
            ),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();

        if self.spam_threshold_messages == 0 {
            errors.push("SPAM_THRESHOLD_MESSAGES must be greater than 0");
        }
        if self.spam_threshold_seconds == 0 {
            errors.push("SPAM_THRESHOLD_SECONDS must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.toxicity_threshold) {
            errors.push("TOXICITY_THRESHOLD must be between 0 and 1");
        }
        if self.base_mute_duration_seconds == 0 {
            errors.push("BASE_MUTE_DURATION_SECONDS must be greater than 0");
        }
        if self.base_mute_duration_seconds > self.max_mute_duration_seconds {
            errors.push("BASE_MUTE_DURATION_SECONDS cannot exceed MAX_MUTE_DURATION_SECONDS");
        }
        if self.ledger_retry_attempts == 0 {
            errors.push("LEDGER_RETRY_ATTEMPTS must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    pub fn policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            max_warnings: self.max_warnings,
            base_mute_duration: Duration::from_secs(self.base_mute_duration_seconds),
            max_mute_duration: Duration::from_secs(self.max_mute_duration_seconds),
            mute_evasion_escalates_to_kick: self.mute_evasion_escalates_to_kick,
            kick_lookback_window: Duration::from_secs(self.kick_lookback_window_seconds),
        }
    }

    pub fn spam_window(&self) -> Duration {
        Duration::from_secs(self.spam_threshold_seconds)
    }

    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn ledger_op_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_op_timeout_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            spam_threshold_messages: DEFAULT_SPAM_THRESHOLD_MESSAGES,
            spam_threshold_seconds: DEFAULT_SPAM_THRESHOLD_SECONDS,
            toxicity_threshold: DEFAULT_TOXICITY_THRESHOLD,
            max_warnings: DEFAULT_MAX_WARNINGS,
            base_mute_duration_seconds: DEFAULT_BASE_MUTE_DURATION.as_secs(),
            max_mute_duration_seconds: DEFAULT_MAX_MUTE_DURATION.as_secs(),
            mute_evasion_escalates_to_kick: DEFAULT_MUTE_EVASION_ESCALATES_TO_KICK,
            kick_lookback_window_seconds: DEFAULT_KICK_LOOKBACK_WINDOW_SECONDS,
            scorer_timeout_ms: DEFAULT_SCORER_TIMEOUT_MS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            ledger_retry_attempts: DEFAULT_LEDGER_RETRY_ATTEMPTS,
            ledger_op_timeout_ms: DEFAULT_LEDGER_OP_TIMEOUT_MS,
            sink_retry_attempts: DEFAULT_SINK_RETRY_ATTEMPTS,
            expiry_check_interval_seconds: DEFAULT_EXPIRY_CHECK_INTERVAL_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_toxicity_threshold() {
        let mut settings = Settings::default();
        settings.toxicity_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_spam_window() {
        let mut settings = Settings::default();
        settings.spam_threshold_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_failures_surface_as_config_errors() {
        let mut settings = Settings::default();
        settings.ledger_retry_attempts = 0;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn policy_carries_durations() {
        let settings = Settings::default();
        let policy = settings.policy();
        assert_eq!(policy.base_mute_duration, Duration::from_secs(15 * 60));
        assert_eq!(policy.max_warnings, 2);
    }
}
