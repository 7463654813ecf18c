use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::constants::defaults::KEY_LOCK_IDLE_SECONDS;
use crate::engine::error::Error;
use crate::engine::metrics::inc;
use crate::engine::Engine;
use crate::events::ModKey;
use crate::services::sanction::PlatformAction;

/// Background sweeper for timed sanctions. Ledger-scan driven rather than
/// in-process timers: a restart loses nothing, the first tick after boot
/// lifts anything that expired while the process was down.
pub fn spawn_expiry_sweeper(engine: Arc<Engine>) -> JoinHandle<()> {
    let interval = Duration::from_secs(engine.settings.expiry_check_interval_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            // First tick completes immediately (crash recovery)
            ticker.tick().await;
            match sweep_once(&engine).await {
                Ok(0) => {}
                Ok(lifted) => info!(lifted, "expired sanctions lifted"),
                Err(e) => error!(error = %e, "expiry sweep failed"),
            }
            // Piggyback periodic housekeeping on the sweep cadence
            engine.windows.evict_idle();
            engine
                .locks
                .reap_idle(Duration::from_secs(KEY_LOCK_IDLE_SECONDS));
        }
    })
}

/// One sweep pass: lift every active sanction whose expiry has passed.
/// `deactivate` flips the row only if it is still active, so a concurrent
/// manual reversal and the sweeper race to a single winner.
pub async fn sweep_once(engine: &Engine) -> Result<usize, Error> {
    let due = engine
        .bounded("ledger expiry scan", engine.ledger.expired_active(Utc::now()))
        .await?;
    let mut lifted = 0;

    for inf in due {
        let key = ModKey::new(inf.guild_id, inf.user_id);
        let _guard = engine.locks.acquire(key).await;

        // Every call under the key lock is bounded; a hung store skips the
        // row and the next sweep retries it.
        match engine
            .bounded("ledger deactivate", engine.ledger.deactivate(inf.id))
            .await
        {
            Ok(true) => {}
            Ok(false) => continue, // already lifted by someone else
            Err(e) => {
                warn!(infraction_id = %inf.id, error = %e, "expiry deactivate failed, retrying next sweep");
                continue;
            }
        }
        if let Err(e) = engine
            .bounded("cache invalidate", engine.cache.invalidate(key))
            .await
        {
            warn!(infraction_id = %inf.id, error = %e, "cache invalidate failed after expiry");
        }
        if let Some(action) = PlatformAction::reversal(&inf, "sanction expired") {
            engine.executor.dispatch(action).await;
        }
        inc(&engine.metrics.expiries_fired);
        info!(
            infraction_id = %inf.id,
            guild_id = inf.guild_id,
            user_id = inf.user_id,
            kind = inf.kind.as_str(),
            "sanction expired"
        );
        lifted += 1;
    }

    Ok(lifted)
}
