//! Config struct definition and default implementation.

use super::types::*;
use crate::backoff::Backoff;
use serde::{Deserialize, Serialize};

/// Configuration for the regionlock command line.
///
/// This struct represents the contents of `regionlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock file
    // =========================================================================
    /// Path of the shared lock file (default: "lock.txt").
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    // =========================================================================
    // Identity
    // =========================================================================
    /// Identity to announce instead of the current user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Whether to append `@<hostname>` to the announced identity.
    #[serde(default)]
    pub include_host: bool,

    // =========================================================================
    // Holding
    // =========================================================================
    /// How often the hold loop checks for Ctrl-C, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// What `hold` prints when another holder is active.
    #[serde(default)]
    pub observe: ObserveMode,

    /// Retry schedule for `probe --retry`.
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            identity: None,
            include_host: false,
            poll_interval_ms: default_poll_interval_ms(),
            observe: ObserveMode::default(),
            backoff: Backoff::default(),
        }
    }
}
