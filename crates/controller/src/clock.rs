//! Wall clock and waits for the boot cycle, corrected over SNTP when the
//! internet is reachable.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::sntp;

/// Wall clock plus the blocking waits of a boot cycle.
pub trait Clock {
    /// Current time in Unix seconds. Best effort until synchronised.
    fn now(&self) -> i64;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Bring the clock in line with network time. Returns whether it worked.
    fn synchronise(&self, attempts: u32) -> impl Future<Output = bool> + Send;
}

/// Host clock: the system time plus a correction learned over SNTP.
pub struct SystemClock {
    offset: AtomicI64,
    servers: Vec<String>,
    timeout: Duration,
}

impl SystemClock {
    pub fn new(servers: Vec<String>, timeout: Duration) -> Self {
        Self {
            offset: AtomicI64::new(0),
            servers,
            timeout,
        }
    }

    fn system_now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Self::system_now() + self.offset.load(Ordering::Relaxed)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn synchronise(&self, attempts: u32) -> bool {
        for attempt in 1..=attempts {
            for server in &self.servers {
                match sntp::query(server, self.timeout).await {
                    Ok(network_now) => {
                        let offset = network_now - Self::system_now();
                        self.offset.store(offset, Ordering::Relaxed);
                        info!(%server, offset_sec = offset, "clock synchronised");
                        return true;
                    }
                    Err(e) => debug!(%server, attempt, "time sync failed: {e}"),
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        warn!(attempts, "time sync gave up; keeping local clock");
        false
    }
}

/// Render a Unix timestamp for log lines.
pub fn display_ts(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| ts.to_string())
}
