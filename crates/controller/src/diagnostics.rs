//! Observability hooks. Nothing here feeds a decision.

use sysinfo::System;
use tracing::info;

/// Log available and used memory before the heartbeat.
pub fn log_memory() {
    let mut sys = System::new();
    sys.refresh_memory();
    info!(
        available_kib = sys.available_memory() / 1024,
        used_kib = sys.used_memory() / 1024,
        "memory"
    );
}
