use crate::detect::{Channel, detect_channel};
use crate::error::{AppError, AppResult};
use crate::loader::parse_upload;
use crate::mapper::map_incoming;
use crate::reconcile::{ImportResults, ReconcilePolicy, Reconciliation, reconcile};
use crate::store::{GuestStore, StoredGuests};
use log::{info, warn};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMode {
    /// Write updates and appends to the sheet
    Apply,
    /// Reconcile only; nothing is written
    DryRun,
}

/// Summary returned by the upload endpoint and the CLI
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: bool,
    pub source: Channel,
    pub results: ImportResults,
    pub total_processed: usize,
    pub detected_headers: Vec<String>,
}

/// Run one export through parse, detect, map, reconcile and apply
///
/// Existing records are fetched once. Changed bookings are written one row
/// at a time, then all new bookings go out in a single append. A failure
/// part-way leaves earlier writes in place; re-running the same file is
/// safe because applied rows reconcile as unchanged.
///
/// # Arguments
/// * `store` - Guests tab adapter
/// * `policy` - Duplicate and cancellation rules
/// * `file_name` - Upload name; its extension picks the parser
/// * `bytes` - Upload contents
/// * `mode` - Apply or dry-run
/// * `now` - RFC 3339 timestamp stamped on created/updated records
///
/// # Errors
/// * Input-format errors (unsupported extension, no rows, unknown source)
/// * `AppError::Upstream` when the spreadsheet cannot be read or written
pub async fn run_import(
    store: &GuestStore,
    policy: ReconcilePolicy,
    file_name: &str,
    bytes: &[u8],
    mode: ImportMode,
    now: &str,
) -> AppResult<ImportReport> {
    let parsed = parse_upload(file_name, bytes)?;
    if parsed.rows.is_empty() {
        return Err(AppError::EmptyFile);
    }

    let channel = match detect_channel(&parsed.headers) {
        Some(channel) => channel,
        None => {
            warn!(
                "could not detect source of '{}' ({} headers)",
                file_name,
                parsed.headers.len()
            );
            return Err(AppError::UnknownSource {
                headers: parsed.headers,
            });
        }
    };
    info!(
        "importing '{}': {} rows from {}",
        file_name,
        parsed.rows.len(),
        channel
    );

    let incoming = map_incoming(channel, &parsed.rows);
    let total_processed = incoming.len();

    let stored = match mode {
        ImportMode::Apply => {
            store.ensure_tab().await?;
            store.load().await?
        }
        ImportMode::DryRun => {
            if store.exists().await? {
                store.load().await?
            } else {
                StoredGuests {
                    headers: store.schema().headers.clone(),
                    ..StoredGuests::default()
                }
            }
        }
    };

    let outcome = reconcile(&stored.records, incoming, store.schema(), policy, now);
    if mode == ImportMode::Apply && outcome.has_writes() {
        apply(store, &stored, &outcome).await?;
    }

    let results = outcome.results;
    info!(
        "import of '{}' done: added={} updated={} unchanged={} cancelled={} errors={}",
        file_name,
        results.added,
        results.updated,
        results.unchanged,
        results.cancelled,
        results.errors.len()
    );

    Ok(ImportReport {
        success: true,
        source: channel,
        results,
        total_processed,
        detected_headers: parsed.headers,
    })
}

/// Issue the writes of a reconciliation: one call per update, one append
///
/// `stored` is the tab as loaded before reconciling; rows are written in
/// its column order.
pub async fn apply(
    store: &GuestStore,
    stored: &StoredGuests,
    outcome: &Reconciliation,
) -> AppResult<()> {
    for update in &outcome.updates {
        store.update(stored, update.row_index, &update.record).await?;
    }
    store.append(stored, &outcome.appends).await
}
