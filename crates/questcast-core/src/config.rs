// ── Runtime configuration ──
//
// Tuning for the status scheduler. Core never reads config files; the
// CLI loads `questcast-config` and hands a `ControllerConfig` in.

use std::time::Duration;

use questcast_bridge::DEFAULT_WIRELESS_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Time between device polls.
    pub refresh_interval: Duration,
    /// Ports tried in order by the wireless upgrade.
    pub wireless_ports: Vec<u16>,
    /// Consecutive poll timeouts before a `PollTimedOut` event is emitted.
    pub timeout_warn_after: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(2000),
            wireless_ports: vec![DEFAULT_WIRELESS_PORT],
            timeout_warn_after: 3,
        }
    }
}
