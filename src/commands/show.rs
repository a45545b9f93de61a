//! `regionlock show`: print holder records without taking any lock.

use crate::cli::ShowArgs;
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::record::{self, HolderRecord};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct RecordView<'a> {
    identity: &'a str,
    timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<String>,
}

impl<'a> From<&'a HolderRecord> for RecordView<'a> {
    fn from(record: &'a HolderRecord) -> Self {
        Self {
            identity: &record.identity,
            timestamp: &record.timestamp,
            age: record.age_string(),
        }
    }
}

/// Print the latest holder record, or every record with `--all`.
pub fn cmd_show(ctx: &RunContext, args: ShowArgs, out: &mut dyn Write) -> Result<()> {
    let file = ctx.open_existing_lock_file()?;

    let records = if args.all {
        record::read_all(&file)?
    } else {
        record::read_last(&file)?
            .map(|(_, record)| record)
            .into_iter()
            .collect()
    };

    if args.json {
        let views: Vec<RecordView<'_>> = records.iter().map(RecordView::from).collect();
        let json = if args.all {
            serde_json::to_string_pretty(&views)
        } else {
            serde_json::to_string_pretty(&views.first())
        }
        .map_err(|e| CliError::UserError(format!("failed to serialize records: {}", e)))?;
        writeln!(out, "{}", json)?;
        return Ok(());
    }

    if records.is_empty() {
        writeln!(out, "No holder record in {}", ctx.lock_path.display())?;
        return Ok(());
    }
    for record in &records {
        match record.age_string() {
            Some(age) => writeln!(out, "{} ({} ago)", record, age)?,
            None => writeln!(out, "{}", record)?,
        }
    }
    Ok(())
}
