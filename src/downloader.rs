use crate::error::AppResult;
use crate::record::{FieldSchema, GuestRecord};

/// Supported download formats for the guest list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "guests.csv",
            ExportFormat::Xlsx => "guests.xlsx",
        }
    }
}

/// Convert guest records to CSV
///
/// The header row is the schema's canonical header list, and every record
/// is written in that column order. Quoting of commas, quotes and newlines
/// is handled by the CSV writer.
///
/// # Arguments
/// * `schema` - Column layout to export
/// * `records` - Records to write, in order
///
/// # Returns
/// * `AppResult<Vec<u8>>` - UTF-8 CSV bytes or an error
///
/// # Examples
/// ```
/// use guesthouse::downloader::to_csv;
/// use guesthouse::record::{FieldSchema, GuestRecord};
///
/// let record = GuestRecord { booking_id: "123".to_string(), ..GuestRecord::default() };
/// let csv = to_csv(&FieldSchema::default(), &[record]).unwrap();
/// assert!(String::from_utf8(csv).unwrap().starts_with("booking_id,first_name"));
/// ```
pub fn to_csv(schema: &FieldSchema, records: &[GuestRecord]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&schema.headers)?;

    for record in records {
        writer.write_record(
            schema
                .headers
                .iter()
                .map(|header| record.get(header).unwrap_or("")),
        )?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Convert guest records to XLSX format
///
/// This function exports the guest list to an Excel workbook using the
/// rust_xlsxwriter library. Every cell is written as text so phone numbers and
/// booking ids keep their leading `+` and zeros.
///
/// # Arguments
/// * `schema` - Column layout to export
/// * `records` - Records to write, in order
///
/// # Returns
/// * `AppResult<Vec<u8>>` - XLSX file content as bytes or an error
pub fn to_xlsx(schema: &FieldSchema, records: &[GuestRecord]) -> AppResult<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Guests")?;

    for (c, header) in schema.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, header, &bold)?;
    }

    for (r, record) in records.iter().enumerate() {
        for (c, header) in schema.headers.iter().enumerate() {
            let value = record.get(header).unwrap_or("");
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, c as u16, value)?;
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Render records in the requested format
pub fn export(
    format: ExportFormat,
    schema: &FieldSchema,
    records: &[GuestRecord],
) -> AppResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(schema, records),
        ExportFormat::Xlsx => to_xlsx(schema, records),
    }
}
