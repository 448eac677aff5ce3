use crate::journal::RunJournal;
use crate::model::{Document, FailedWrite};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

pub(crate) async fn prepare_output_dir(dir: &Path, journal: &mut RunJournal) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    journal.debug(format!("output directory ready: {}", dir.display()));
    Ok(())
}

async fn list_files(dir: &Path, journal: &mut RunJournal) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list output directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list output directory {}", dir.display()))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("failed to inspect {}", path.display()))?;
        if file_type.is_dir() {
            journal.warn(format!("leaving subdirectory {} in place", path.display()));
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Deletes every file in `dir`. All deletions are awaited before returning;
/// any failure aborts the run since stale files would survive it.
pub(crate) async fn clear_output_dir(dir: &Path, journal: &mut RunJournal) -> Result<usize> {
    let files = list_files(dir, journal).await?;
    journal.info(format!(
        "clearing {} existing files from {}",
        files.len(),
        dir.display()
    ));

    let mut deletions = JoinSet::new();
    for path in files {
        journal.debug(format!("deleting {}", path.display()));
        deletions.spawn(async move {
            let result = tokio::fs::remove_file(&path).await;
            (path, result)
        });
    }

    let mut deleted = 0usize;
    let mut failures = Vec::<String>::new();
    while let Some(joined) = deletions.join_next().await {
        match joined {
            Ok((_, Ok(()))) => deleted += 1,
            Ok((path, Err(exc))) => {
                journal.error(format!("failed to delete {}: {exc}", path.display()));
                failures.push(path.display().to_string());
            }
            Err(exc) => {
                journal.error(format!("delete task failed: {exc}"));
                failures.push("<delete task>".to_string());
            }
        }
    }

    if !failures.is_empty() {
        failures.sort();
        bail!(
            "failed to clear {} file(s) from {}: {}",
            failures.len(),
            dir.display(),
            failures.join(", ")
        );
    }

    Ok(deleted)
}

#[derive(Debug, Default)]
pub(crate) struct WriteOutcome {
    pub(crate) written: Vec<String>,
    pub(crate) failed: Vec<FailedWrite>,
}

/// Writes every document concurrently. A failed write is recorded and does
/// not affect its siblings.
pub(crate) async fn write_documents(
    dir: &Path,
    documents: Vec<Document>,
    journal: &mut RunJournal,
) -> WriteOutcome {
    journal.info(format!(
        "writing {} documents to {}",
        documents.len(),
        dir.display()
    ));

    let mut writes = JoinSet::new();
    for doc in documents {
        let file_name = doc.file_name();
        let path = dir.join(&file_name);
        writes.spawn(async move {
            let result = tokio::fs::write(&path, doc.content.as_bytes()).await;
            (file_name, result)
        });
    }

    let mut outcome = WriteOutcome::default();
    while let Some(joined) = writes.join_next().await {
        match joined {
            Ok((file_name, Ok(()))) => {
                journal.debug(format!("wrote {file_name}"));
                outcome.written.push(file_name);
            }
            Ok((file_name, Err(exc))) => {
                journal.error(format!("failed to write {file_name}: {exc}"));
                outcome.failed.push(FailedWrite {
                    file_name,
                    error: exc.to_string(),
                });
            }
            Err(exc) => {
                journal.error(format!("write task failed: {exc}"));
                outcome.failed.push(FailedWrite {
                    file_name: "<write task>".to_string(),
                    error: exc.to_string(),
                });
            }
        }
    }

    outcome.written.sort();
    outcome.failed.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    outcome
}
