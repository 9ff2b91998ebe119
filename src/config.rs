//! Tunables for the Election Core's polling and backoff schedule. Parsing
//! these from a config file is out of scope for this crate (see
//! `spec.md` §1) — only the struct and its defaults live here.

use std::time::Duration;

/// Initial and floor poll timeout for the inbound queue; also the
/// finalization window duration.
pub const DEFAULT_MIN_NOTIFICATION_INTERVAL: Duration = Duration::from_millis(200);
/// Ceiling the exponential backoff saturates at.
pub const DEFAULT_MAX_NOTIFICATION_INTERVAL: Duration = Duration::from_millis(60_000);
/// Grace period after reaching quorum during which a strictly better vote
/// can still preempt the commit.
pub const FINALIZE_WAIT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub min_notification_interval: Duration,
    pub max_notification_interval: Duration,
    pub finalize_wait: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            min_notification_interval: DEFAULT_MIN_NOTIFICATION_INTERVAL,
            max_notification_interval: DEFAULT_MAX_NOTIFICATION_INTERVAL,
            finalize_wait: FINALIZE_WAIT,
        }
    }
}
