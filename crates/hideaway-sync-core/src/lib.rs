mod fetch;
pub mod journal;
pub mod model;
pub mod normalize;
mod sink;

use crate::fetch::fetch_records;
use crate::journal::{JournalLevel, RunJournal};
use crate::model::{Document, Record, RunReport, SkippedRecord};
use crate::normalize::{normalize_record, NormalizeOptions, Rejection};
use crate::sink::{clear_output_dir, prepare_output_dir, write_documents};
use anyhow::Result;
use chrono::Utc;
use hideaway_config::AppConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

pub use crate::journal::DEBUG_JOURNAL_FILE;

/// Transforms every record, keeping the first document per file name.
pub fn normalize_batch(
    records: &[Record],
    options: &NormalizeOptions,
    journal: &mut RunJournal,
) -> (Vec<Document>, Vec<SkippedRecord>) {
    let mut documents = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    let mut seen = HashSet::<String>::new();

    for record in records {
        let id = record.id();
        let label = id.as_deref().unwrap_or("<no id>");

        let outcome = normalize_record(record, options).and_then(|doc| {
            let file_name = doc.file_name();
            if seen.insert(file_name.clone()) {
                Ok(doc)
            } else {
                Err(Rejection::DuplicateFile(file_name))
            }
        });

        match outcome {
            Ok(doc) => {
                journal.debug(format!(
                    "record {label} -> {} ({} bytes)",
                    doc.file_name(),
                    doc.content.len()
                ));
                documents.push(doc);
            }
            Err(reason) => {
                journal.warn(format!("skipping record {label}: {reason}"));
                skipped.push(SkippedRecord { id, reason });
            }
        }
    }

    (documents, skipped)
}

async fn sync_into(
    config: &AppConfig,
    output_dir: &Path,
    journal: &mut RunJournal,
) -> Result<RunReport> {
    prepare_output_dir(output_dir, journal).await?;

    let records = fetch_records(&config.baserow, journal).await;
    let options = NormalizeOptions::from(config);
    let (documents, skipped) = normalize_batch(&records, &options, journal);

    let deleted = clear_output_dir(output_dir, journal).await?;
    let outcome = write_documents(output_dir, documents, journal).await;

    let report = RunReport {
        fetched: records.len(),
        deleted,
        written: outcome.written,
        skipped,
        failed: outcome.failed,
    };

    journal.info(format!(
        "sync complete: fetched={} written={} skipped={} failed={} deleted={}",
        report.fetched,
        report.written.len(),
        report.skipped.len(),
        report.failed.len(),
        report.deleted
    ));
    if report.is_clean() {
        return Ok(report);
    }
    if !report.skipped.is_empty() {
        let ids: Vec<&str> = report
            .skipped
            .iter()
            .map(|skip| skip.id.as_deref().unwrap_or("<no id>"))
            .collect();
        journal.warn(format!("skipped record ids: {}", ids.join(", ")));
    }
    if !report.failed.is_empty() {
        let files: Vec<&str> = report
            .failed
            .iter()
            .map(|fail| fail.file_name.as_str())
            .collect();
        journal.warn(format!("failed writes: {}", files.join(", ")));
    }

    Ok(report)
}

/// Fetches the configured table and rebuilds the output directory from it.
///
/// Per-record and per-file problems are reported in the returned
/// [`RunReport`]; only directory-level failures surface as `Err`.
pub async fn run_sync(config: &AppConfig) -> Result<RunReport> {
    let mut journal = RunJournal::new();
    run_sync_journaled(config, &mut journal).await
}

/// [`run_sync`] with a caller-owned journal, which keeps every entry
/// (including `sync aborted`) after the run returns.
pub async fn run_sync_journaled(
    config: &AppConfig,
    journal: &mut RunJournal,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let output_dir = PathBuf::from(&config.output.dir);

    let result = sync_into(config, &output_dir, journal).await;

    if let Err(exc) = &result {
        journal.record(JournalLevel::Error, format!("sync aborted: {exc:#}"));
    }
    if config.output.debug_journal {
        if let Err(exc) = journal.flush_to(&output_dir, &started_at).await {
            warn!("{exc:#}");
        }
    }

    result
}
