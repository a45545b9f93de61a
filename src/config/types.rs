//! Configuration enums, constants, and default value functions.

use serde::{Deserialize, Serialize};

/// Name of the config file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "regionlock.yaml";

/// How `hold` reports a holder it could not displace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObserveMode {
    /// Print only the most recent record (default).
    #[default]
    Last,
    /// Print every record in the file, oldest first.
    History,
}

pub(super) fn default_lock_file() -> String {
    "lock.txt".to_string()
}

pub(super) fn default_poll_interval_ms() -> u64 {
    100
}
