use crate::journal::RunJournal;
use crate::model::Record;
use anyhow::Result;
use hideaway_baserow::{BaserowClient, RowPage};
use hideaway_config::BaserowConfig;

async fn fetch_page(cfg: &BaserowConfig) -> Result<RowPage> {
    let client = BaserowClient::from_env(cfg.clone())?;
    client.list_rows().await
}

/// Reads the first page of rows. Any failure is logged and yields no records,
/// so the run still completes (with an emptied output directory).
pub(crate) async fn fetch_records(cfg: &BaserowConfig, journal: &mut RunJournal) -> Vec<Record> {
    journal.info(format!("fetching rows from {}", cfg.table_url));

    let page = match fetch_page(cfg).await {
        Ok(page) => page,
        Err(exc) => {
            journal.error(format!("failed to fetch rows: {exc:#}"));
            return Vec::new();
        }
    };

    journal.info(format!(
        "received {} rows (table reports {} total)",
        page.results.len(),
        page.count
    ));
    if page.has_more() {
        journal.warn("table has further pages; only the first page is synced");
    }

    page.results.into_iter().map(Record::new).collect()
}
