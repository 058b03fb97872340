use crate::error::AppResult;
use crate::record::{FieldSchema, GuestRecord};
use crate::sheets::SheetBackend;
use log::{debug, info};
use std::sync::Arc;

/// Sheet row of data row 0: one header row, and sheet rows count from 1
pub const HEADER_OFFSET: usize = 2;

/// Guest records as currently stored, in sheet order
///
/// Keeps the tab's own header row and the raw data rows so that writes land
/// in the columns the tab actually has.
#[derive(Clone, Debug, Default)]
pub struct StoredGuests {
    /// Lower-cased header row of the tab
    pub headers: Vec<String>,
    /// Raw data rows, header excluded
    pub rows: Vec<Vec<String>>,
    pub records: Vec<GuestRecord>,
}

impl StoredGuests {
    /// Cells for `record` in the tab's column order
    ///
    /// Columns that are not record fields keep the value of the stored row
    /// `row_index` (blank for a new row).
    pub fn row_for(&self, record: &GuestRecord, row_index: Option<usize>) -> Vec<String> {
        let base = row_index.and_then(|i| self.rows.get(i));
        record_to_row(&self.headers, record, base.map(Vec::as_slice))
    }
}

/// Persistence adapter between guest records and one spreadsheet tab
///
/// Cells are mapped through the tab's own header row in both directions, so
/// reordered or extra columns are tolerated. Only a tab created here gets
/// the schema's header order.
#[derive(Clone)]
pub struct GuestStore {
    backend: Arc<dyn SheetBackend>,
    tab: String,
    schema: FieldSchema,
}

impl GuestStore {
    pub fn new(backend: Arc<dyn SheetBackend>, tab: &str, schema: FieldSchema) -> Self {
        GuestStore {
            backend,
            tab: tab.to_string(),
            schema,
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub async fn exists(&self) -> AppResult<bool> {
        let titles = self.backend.tab_titles().await?;
        Ok(titles.iter().any(|title| title == &self.tab))
    }

    /// Create the tab with its header row when it does not exist yet
    pub async fn ensure_tab(&self) -> AppResult<()> {
        if self.exists().await? {
            return Ok(());
        }

        info!("creating missing tab '{}'", self.tab);
        self.backend.add_tab(&self.tab).await?;
        self.backend
            .append_rows(&self.tab, vec![self.schema.headers.clone()])
            .await
    }

    /// Fetch every stored record
    ///
    /// A tab without a header row reads as empty, laid out in schema order.
    pub async fn load(&self) -> AppResult<StoredGuests> {
        let mut rows = self.backend.read_rows(&self.tab).await?.into_iter();
        let headers: Vec<String> = match rows.next() {
            Some(headers) if headers.iter().any(|h| !h.trim().is_empty()) => {
                headers.iter().map(|h| h.trim().to_lowercase()).collect()
            }
            _ => {
                return Ok(StoredGuests {
                    headers: self.schema.headers.clone(),
                    ..StoredGuests::default()
                });
            }
        };

        let rows: Vec<Vec<String>> = rows.collect();
        let records: Vec<GuestRecord> = rows
            .iter()
            .map(|row| record_from_row(&headers, row))
            .collect();
        debug!("loaded {} rows from '{}'", records.len(), self.tab);
        Ok(StoredGuests {
            headers,
            rows,
            records,
        })
    }

    /// Rewrite one stored record in place (`row_index` is 0-based, header excluded)
    pub async fn update(
        &self,
        stored: &StoredGuests,
        row_index: usize,
        record: &GuestRecord,
    ) -> AppResult<()> {
        self.backend
            .update_row(
                &self.tab,
                row_index + HEADER_OFFSET,
                stored.row_for(record, Some(row_index)),
            )
            .await
    }

    /// Append records in one call
    pub async fn append(&self, stored: &StoredGuests, records: &[GuestRecord]) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let rows = records
            .iter()
            .map(|record| stored.row_for(record, None))
            .collect();
        self.backend.append_rows(&self.tab, rows).await
    }
}

/// Build a record from a sheet row, using lower-cased sheet headers
pub fn record_from_row(headers: &[String], row: &[String]) -> GuestRecord {
    let mut record = GuestRecord::default();
    for (header, value) in headers.iter().zip(row.iter()) {
        if let Some(slot) = record.field_mut(header) {
            *slot = value.trim().to_string();
        }
    }
    if let Some(phone) = record.phone.strip_prefix('\'') {
        record.phone = phone.to_string();
    }
    record
}

/// True when a spreadsheet would read `value` as a number or a date
///
/// `USER_ENTERED` input turns "156.00" into 156 and "+49 151" into 49151,
/// so such values are written with a leading apostrophe to stay text.
pub fn needs_text_prefix(value: &str) -> bool {
    let mut chars = value.trim_start().chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('=') => true,
        Some('+' | '-' | '.') => chars.any(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Flatten a record into the given (lower-cased) header order
///
/// Headers that are not record fields take their value from `base`.
/// Number-like values get a leading apostrophe so the spreadsheet keeps
/// them as typed (phone `+`, leading zeros, `156.00`).
pub fn record_to_row(
    headers: &[String],
    record: &GuestRecord,
    base: Option<&[String]>,
) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| match record.get(header) {
            Some(value) if needs_text_prefix(value) => format!("'{}", value),
            Some(value) => value.to_string(),
            None => base
                .and_then(|row| row.get(i))
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn text_prefix_for_number_like_values() {
        assert!(needs_text_prefix("156.00"));
        assert!(needs_text_prefix("+8613800000000"));
        assert!(needs_text_prefix("2026-01-06"));
        assert!(needs_text_prefix("-5"));
        assert!(needs_text_prefix("=SUM(A1)"));
        assert!(!needs_text_prefix("Linlong"));
        assert!(!needs_text_prefix("+"));
        assert!(!needs_text_prefix(""));
    }

    #[test]
    fn rows_follow_the_tab_header() {
        let record = GuestRecord {
            booking_id: "123".into(),
            first_name: "Linlong".into(),
            total_eur: "156.00".into(),
            ..Default::default()
        };
        let tab = headers(&["first_name", "internal", "booking_id", "total_eur"]);
        let base = headers(&["Old", "keep me", "123", "100"]);

        assert_eq!(
            record_to_row(&tab, &record, Some(&base)),
            headers(&["Linlong", "keep me", "'123", "'156.00"])
        );
        assert_eq!(
            record_to_row(&tab, &record, None),
            headers(&["Linlong", "", "'123", "'156.00"])
        );
    }

    #[test]
    fn reads_strip_phone_apostrophe() {
        let tab = headers(&["phone", "booking_id"]);
        let record = record_from_row(&tab, &headers(&["'+212600", " 7 "]));
        assert_eq!(record.phone, "+212600");
        assert_eq!(record.booking_id, "7");
    }
}
