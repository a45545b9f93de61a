//! Resolution of the settings a command runs with.
//!
//! Command-line flags win over `regionlock.yaml`, which wins over defaults.
//! A relative lock file path is resolved against the working directory the
//! command was started in.

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::identity;
use crate::record;
use std::env;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Resolved settings for one command invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Effective configuration.
    pub config: Config,

    /// Absolute path of the lock file.
    pub lock_path: PathBuf,

    /// Identity announced by `hold`.
    pub identity: String,
}

impl RunContext {
    /// Resolve the context from parsed flags and the current directory.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            CliError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Self::resolve_from(cli, &cwd)
    }

    /// Resolve the context as if started in `dir`.
    pub fn resolve_from(cli: &Cli, dir: &Path) -> Result<Self> {
        let config = Config::discover(cli.config.as_deref(), dir)?;

        let lock_path = match &cli.file {
            Some(path) => path.clone(),
            None => PathBuf::from(&config.lock_file),
        };
        let lock_path = if lock_path.is_absolute() {
            lock_path
        } else {
            dir.join(lock_path)
        };

        let explicit = cli.identity.as_deref().or(config.identity.as_deref());
        let identity = identity::resolve(explicit, config.include_host);
        record::validate_identity(&identity)?;

        Ok(Self {
            config,
            lock_path,
            identity,
        })
    }

    /// Open (creating if needed) the lock file for reading and appending.
    pub fn open_lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.lock_path)
            .map_err(|e| {
                CliError::UserError(format!(
                    "failed to open lock file '{}': {}",
                    self.lock_path.display(),
                    e
                ))
            })
    }

    /// Open an existing lock file for reading only.
    pub fn open_existing_lock_file(&self) -> Result<File> {
        if !self.lock_path.exists() {
            return Err(CliError::UserError(format!(
                "lock file '{}' does not exist",
                self.lock_path.display()
            )));
        }
        File::open(&self.lock_path).map_err(|e| {
            CliError::UserError(format!(
                "failed to open lock file '{}': {}",
                self.lock_path.display(),
                e
            ))
        })
    }
}
