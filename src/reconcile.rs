use crate::record::{FieldSchema, GuestRecord};
use serde::Serialize;
use std::collections::HashMap;

/// Which stored occurrence of a repeated booking id is authoritative
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// What happens to a cancellation for a booking that was never stored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancellationPolicy {
    /// Count it and do not insert it
    #[default]
    Drop,
    /// Store it like any other new booking
    Insert,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub duplicates: DuplicatePolicy,
    pub cancellations: CancellationPolicy,
}

/// Per-import counters returned to the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportResults {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub cancelled: usize,
    pub errors: Vec<String>,
}

/// A mapped record and the line of the uploaded file it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Incoming {
    /// 1-based line number, header line included
    pub line: usize,
    pub record: GuestRecord,
}

impl Incoming {
    /// Number records consecutively from line 2, as if read from a file
    /// with one header line and no blank lines
    pub fn numbered(records: Vec<GuestRecord>) -> Vec<Incoming> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| Incoming { line: i + 2, record })
            .collect()
    }
}

/// Replacement of one stored data row (0-based, header excluded)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowUpdate {
    pub row_index: usize,
    pub record: GuestRecord,
}

/// Outcome of reconciling a batch: counters plus the writes to issue
#[derive(Clone, Debug, Default)]
pub struct Reconciliation {
    pub results: ImportResults,
    pub appends: Vec<GuestRecord>,
    pub updates: Vec<RowUpdate>,
}

impl Reconciliation {
    pub fn has_writes(&self) -> bool {
        !self.appends.is_empty() || !self.updates.is_empty()
    }
}

/// Map booking id -> data row index of its authoritative occurrence
pub fn index_by_key(records: &[GuestRecord], policy: DuplicatePolicy) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let key = record.key();
        if key.is_empty() {
            continue;
        }
        match policy {
            DuplicatePolicy::LastWins => {
                index.insert(key.to_string(), row);
            }
            DuplicatePolicy::FirstWins => {
                index.entry(key.to_string()).or_insert(row);
            }
        }
    }
    index
}

fn comparable_form(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    canonical_number(&collapsed).unwrap_or_else(|| collapsed.to_lowercase())
}

/// "156.00" and "156" compare equal; cells written before the text prefix
/// was applied hold the spreadsheet's rendering of the number
fn canonical_number(value: &str) -> Option<String> {
    let leading_zero = value.starts_with('0') && value.len() > 1 && !value.starts_with("0.");
    if leading_zero || !value.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n.to_string())
}

/// True when any non-blank comparable field of `incoming` differs from `current`
pub fn has_changes(current: &GuestRecord, incoming: &GuestRecord, schema: &FieldSchema) -> bool {
    schema.comparable.iter().any(|field| {
        let new_value = incoming.get(field).unwrap_or("");
        if new_value.trim().is_empty() {
            return false;
        }
        let old_value = current.get(field).unwrap_or("");
        comparable_form(new_value) != comparable_form(old_value)
    })
}

/// Overlay the non-blank import fields of `incoming` on `current`
///
/// Blank incoming values never erase stored ones; workflow fields outside
/// the schema's merge set are left alone.
pub fn merge(
    current: &GuestRecord,
    incoming: &GuestRecord,
    schema: &FieldSchema,
    now: &str,
) -> GuestRecord {
    let mut merged = current.clone();
    for field in schema.merge_fields() {
        let value = incoming.get(field).unwrap_or("").trim();
        if value.is_empty() {
            continue;
        }
        if let Some(slot) = merged.field_mut(field) {
            *slot = value.to_string();
        }
    }
    merged.updated_at = now.to_string();
    merged
}

/// Classify an incoming batch against the stored records
///
/// `existing` is the full stored set in sheet order; `incoming` is the mapped
/// export in file order. Rows without a booking id are reported by their
/// file line. No I/O happens here: the caller applies
/// `updates` (one write each) and `appends` (one batched write).
pub fn reconcile(
    existing: &[GuestRecord],
    incoming: Vec<Incoming>,
    schema: &FieldSchema,
    policy: ReconcilePolicy,
    now: &str,
) -> Reconciliation {
    let index = index_by_key(existing, policy.duplicates);
    let mut outcome = Reconciliation::default();
    // row index -> position in outcome.updates
    let mut pending_updates: HashMap<usize, usize> = HashMap::new();
    // booking id -> position in outcome.appends
    let mut pending_appends: HashMap<String, usize> = HashMap::new();

    for Incoming { line, mut record } in incoming {
        let key = record.key().to_string();
        if key.is_empty() {
            outcome
                .results
                .errors
                .push(format!("Row {}: missing booking_id", line));
            continue;
        }
        record.booking_id = key.clone();

        if let Some(&row) = index.get(&key) {
            let merged = {
                let current = match pending_updates.get(&row) {
                    Some(&pos) => &outcome.updates[pos].record,
                    None => &existing[row],
                };
                has_changes(current, &record, schema).then(|| merge(current, &record, schema, now))
            };

            match merged {
                Some(merged) => {
                    match pending_updates.get(&row) {
                        Some(&pos) => outcome.updates[pos].record = merged,
                        None => {
                            pending_updates.insert(row, outcome.updates.len());
                            outcome.updates.push(RowUpdate {
                                row_index: row,
                                record: merged,
                            });
                        }
                    }
                    outcome.results.updated += 1;
                }
                None => outcome.results.unchanged += 1,
            }
            continue;
        }

        // Same booking twice in one file: fold into the pending append
        if let Some(&pos) = pending_appends.get(&key) {
            let current = &outcome.appends[pos];
            if has_changes(current, &record, schema) {
                let merged = merge(current, &record, schema, now);
                outcome.appends[pos] = merged;
                outcome.results.updated += 1;
            } else {
                outcome.results.unchanged += 1;
            }
            continue;
        }

        if record.is_cancelled() && policy.cancellations == CancellationPolicy::Drop {
            outcome.results.cancelled += 1;
            continue;
        }

        if record.created_at.trim().is_empty() {
            record.created_at = now.to_string();
        }
        record.updated_at = now.to_string();
        pending_appends.insert(key, outcome.appends.len());
        outcome.appends.push(record);
        outcome.results.added += 1;
    }

    outcome
}
