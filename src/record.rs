//! Holder records: the "current writer" announcements in the lock file.
//!
//! Each record is one newline-terminated text line:
//!
//! ```text
//! identity: alice, timestamp: 2026-10-16T09:30:00.123456+02:00
//! ```
//!
//! Records vary in length, so the most recent one is found by scanning
//! backward from end-of-file for the last complete line rather than by
//! seeking a fixed distance from the end. A trailing fragment without its
//! newline (an append still in flight) is skipped.
//!
//! Reading does not take a lock. A reader racing a writer's unflushed append
//! sees the previous complete record, but nothing stops it from observing
//! the file mid-write on filesystems that do not make appends atomic.

use crate::error::RecordError;
use crate::region::Region;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::LazyLock;

static RECORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^identity: (?P<identity>.+?), timestamp: (?P<timestamp>[^\n]+)$")
        .expect("record pattern is valid")
});

const FIELD_SEPARATOR: &str = ", timestamp: ";

/// Bytes read per step while scanning backward for the last record.
const SCAN_CHUNK: u64 = 256;

/// Longest line, without its newline, accepted as a record.
pub const MAX_RECORD_LEN: u64 = 1024;

/// Longest identity a record may carry.
pub const MAX_IDENTITY_LEN: usize = 512;

/// Longest timestamp a record may carry.
pub const MAX_TIMESTAMP_LEN: usize = 128;

/// Bytes of an oversized line quoted in the error.
const PREVIEW_LEN: usize = 40;

pub type Result<T> = std::result::Result<T, RecordError>;

/// Who holds (or last held) the lock, and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub identity: String,
    pub timestamp: String,
}

impl HolderRecord {
    /// Build a record, checking that both fields fit on one line.
    pub fn new(identity: impl Into<String>, timestamp: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        let timestamp = timestamp.into();
        validate_identity(&identity)?;
        validate_timestamp(&timestamp)?;
        Ok(Self {
            identity,
            timestamp,
        })
    }

    /// A record for `identity` stamped with the local time.
    pub fn now(identity: &str) -> Result<Self> {
        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        Self::new(identity, timestamp)
    }

    /// The record as written to the file, including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    /// Parse one record line; the trailing newline is optional.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let caps = RECORD_LINE.captures(line)?;
        Some(Self {
            identity: caps["identity"].to_string(),
            timestamp: caps["timestamp"].to_string(),
        })
    }

    /// The timestamp, if it is RFC 3339.
    pub fn recorded_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }

    /// How long ago the record was written, e.g. `3m`, `2h 5m`, `1d 4h`.
    pub fn age_string(&self) -> Option<String> {
        let age = Utc::now().signed_duration_since(self.recorded_at()?);
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        Some(if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes.max(0))
        })
    }
}

impl fmt::Display for HolderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity: {}{}{}", self.identity, FIELD_SEPARATOR, self.timestamp)
    }
}

/// Check that an identity can be written into a record line.
pub fn validate_identity(identity: &str) -> Result<()> {
    let reason = if identity.trim().is_empty() {
        "must not be empty"
    } else if identity.contains('\n') || identity.contains('\r') {
        "must not contain line breaks"
    } else if identity.contains(FIELD_SEPARATOR) {
        "must not contain the record field separator"
    } else if identity.len() > MAX_IDENTITY_LEN {
        "is too long"
    } else {
        return Ok(());
    };
    Err(RecordError::InvalidIdentity {
        identity: identity.to_string(),
        reason,
    })
}

fn validate_timestamp(timestamp: &str) -> Result<()> {
    let reason = if timestamp.trim().is_empty() {
        "must not be empty"
    } else if timestamp.contains('\n') || timestamp.contains('\r') {
        "must not contain line breaks"
    } else if timestamp.len() > MAX_TIMESTAMP_LEN {
        "is too long"
    } else {
        return Ok(());
    };
    Err(RecordError::InvalidTimestamp {
        timestamp: timestamp.to_string(),
        reason,
    })
}

/// Append `record` at end-of-file and flush it to stable storage.
///
/// Returns the byte range the record now occupies. The caller must hold an
/// exclusive lock covering end-of-file, otherwise the offset may be stale.
pub fn append(file: &File, record: &HolderRecord) -> Result<Region> {
    let mut writer = file;
    let offset = writer.seek(SeekFrom::End(0))?;
    let line = record.to_line();
    writer.write_all(line.as_bytes())?;
    writer.flush()?;
    file.sync_all()?;
    Ok(Region::new(offset, line.len() as u64))
}

/// Read exactly the bytes of `region`.
pub fn read_span(file: &File, region: Region) -> Result<Vec<u8>> {
    let mut buf = vec![0; region.length as usize];
    read_exact_at(file, region.offset, &mut buf)?;
    Ok(buf)
}

/// The most recent complete record and the range it occupies.
///
/// Returns `Ok(None)` for a file without any complete line. A trailing
/// fragment or a last line longer than [`MAX_RECORD_LEN`] is reported as
/// `Malformed` instead of being searched to the start of the file.
pub fn read_last(file: &File) -> Result<Option<(Region, HolderRecord)>> {
    let size = file.metadata()?.len();

    let Some(newline) = rfind_newline(file, size, MAX_RECORD_LEN + 1)? else {
        if size > MAX_RECORD_LEN {
            return Err(oversized(file, size - MAX_RECORD_LEN));
        }
        return Ok(None);
    };

    let start = match rfind_newline(file, newline, MAX_RECORD_LEN)? {
        Some(previous) => previous + 1,
        None if newline <= MAX_RECORD_LEN => 0,
        None => return Err(oversized(file, newline - MAX_RECORD_LEN)),
    };

    let span = Region::new(start, newline + 1 - start);
    let line = read_span(file, span)?;
    decode(start, &line).map(Some)
}

/// Position of the last `\n` in `[end - limit, end)`, reading backward in
/// `SCAN_CHUNK` steps.
fn rfind_newline(file: &File, end: u64, limit: u64) -> Result<Option<u64>> {
    let floor = end.saturating_sub(limit);
    let mut pos = end;
    let mut buf = [0u8; SCAN_CHUNK as usize];
    while pos > floor {
        let step = SCAN_CHUNK.min(pos - floor);
        pos -= step;
        let chunk = &mut buf[..step as usize];
        read_exact_at(file, pos, chunk)?;
        if let Some(i) = chunk.iter().rposition(|&b| b == b'\n') {
            return Ok(Some(pos + i as u64));
        }
    }
    Ok(None)
}

fn oversized(file: &File, offset: u64) -> RecordError {
    let mut head = [0u8; PREVIEW_LEN];
    let line = match read_exact_at(file, offset, &mut head) {
        Ok(()) => format!("{}...", String::from_utf8_lossy(&head)),
        Err(_) => String::new(),
    };
    RecordError::Malformed { offset, line }
}

/// Every complete record in file order.
pub fn read_all(file: &File) -> Result<Vec<HolderRecord>> {
    let mut reader = file;
    reader.seek(SeekFrom::Start(0))?;
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let mut records = Vec::new();
    let mut offset = 0;
    for line in content.split_inclusive(|&b| b == b'\n') {
        if line.last() != Some(&b'\n') {
            break;
        }
        records.push(decode(offset, line)?.1);
        offset += line.len() as u64;
    }
    Ok(records)
}

fn decode(offset: u64, line: &[u8]) -> Result<(Region, HolderRecord)> {
    if line.len() as u64 > MAX_RECORD_LEN + 1 {
        return Err(RecordError::Malformed {
            offset,
            line: format!("{}...", String::from_utf8_lossy(&line[..PREVIEW_LEN])),
        });
    }
    let text = String::from_utf8_lossy(line);
    match HolderRecord::parse(&text) {
        Some(record) => Ok((Region::new(offset, line.len() as u64), record)),
        None => Err(RecordError::Malformed {
            offset,
            line: text.trim_end().to_string(),
        }),
    }
}

fn read_exact_at(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    let mut reader = file;
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(buf)
}
