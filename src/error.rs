//! Error types for regionlock.
//!
//! `LockError` is the taxonomy of the locking primitive itself. `CliError`
//! wraps it for the demonstration binary and maps every failure to an exit
//! code.

use crate::exit_codes;
use thiserror::Error;

/// Failure of a region lock operation.
#[derive(Error, Debug)]
pub enum LockError {
    /// The range conflicts with an incompatible lock and the request asked
    /// not to wait.
    #[error("lock is held by another holder")]
    WouldBlock,

    /// Release was called with a grant this handle does not currently hold.
    #[error("grant is not held by this handle")]
    InvalidGrant,

    /// The request itself is malformed (zero length, range out of bounds).
    #[error("invalid lock request: {0}")]
    InvalidRequest(String),

    /// A blocked wait was aborted before the lock was granted.
    #[error("lock wait was cancelled")]
    Cancelled,

    /// The platform lock manager or the underlying handle failed.
    #[error("lock I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

impl LockError {
    /// True when the caller should take the "someone else holds it" path.
    pub fn is_would_block(&self) -> bool {
        matches!(self, LockError::WouldBlock)
    }
}

/// Failure to build, write, or read a holder record.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The identity cannot be written as a single record line.
    #[error("invalid identity {identity:?}: {reason}")]
    InvalidIdentity {
        identity: String,
        reason: &'static str,
    },

    /// The timestamp cannot be written as a single record line.
    #[error("invalid timestamp {timestamp:?}: {reason}")]
    InvalidTimestamp {
        timestamp: String,
        reason: &'static str,
    },

    /// A line in the lock file is not a holder record.
    #[error("malformed holder record at offset {offset}: {line:?}")]
    Malformed { offset: u64, line: String },

    /// Reading or writing the lock file failed.
    #[error("record I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RecordError> for LockError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Io(io) => LockError::IoFailure(io),
            RecordError::InvalidIdentity { .. } | RecordError::InvalidTimestamp { .. } => {
                LockError::InvalidRequest(err.to_string())
            }
            RecordError::Malformed { .. } => LockError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                err.to_string(),
            )),
        }
    }
}

/// Error type for the regionlock command line.
#[derive(Error, Debug)]
pub enum CliError {
    /// Bad arguments, bad configuration, or an unusable lock file path.
    #[error("{0}")]
    UserError(String),

    /// Reading or writing a holder record failed.
    #[error("Record operation failed: {0}")]
    RecordError(#[from] RecordError),

    /// A lock operation failed.
    #[error("Lock operation failed: {0}")]
    LockError(#[from] LockError),

    /// Writing command output failed.
    #[error("Output failed: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UserError(_) => exit_codes::USER_ERROR,
            CliError::RecordError(RecordError::InvalidIdentity { .. })
            | CliError::RecordError(RecordError::InvalidTimestamp { .. }) => exit_codes::USER_ERROR,
            CliError::RecordError(_) => exit_codes::IO_FAILURE,
            CliError::LockError(LockError::WouldBlock) => exit_codes::LOCK_UNAVAILABLE,
            CliError::LockError(LockError::InvalidRequest(_)) => exit_codes::USER_ERROR,
            CliError::LockError(_) => exit_codes::IO_FAILURE,
            CliError::Output(_) => exit_codes::IO_FAILURE,
        }
    }
}

/// Result type alias for lock operations.
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Result type alias for command line operations.
pub type Result<T> = std::result::Result<T, CliError>;
