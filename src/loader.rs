use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// Kind of upload, decided from the file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Workbook,
}

impl FileKind {
    /// Map a file name to a supported kind
    ///
    /// # Arguments
    /// * `file_name` - Name of the uploaded file, as sent by the client
    ///
    /// # Returns
    /// * `AppResult<FileKind>` - The kind, or `UnsupportedFile` for anything other
    ///   than `.csv`, `.xls` and `.xlsx`
    pub fn from_file_name(file_name: &str) -> AppResult<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(FileKind::Csv),
            Some("xlsx") | Some("xls") => Ok(FileKind::Workbook),
            Some(ext) => Err(AppError::UnsupportedFile(format!(".{}", ext))),
            None => Err(AppError::UnsupportedFile(file_name.to_string())),
        }
    }
}

/// One data row of an uploaded file, keyed by header
///
/// Lookups are case-insensitive and ignore surrounding whitespace, since
/// channel exports are not consistent about header capitalisation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceRow {
    values: HashMap<String, String>,
    line: usize,
}

impl SourceRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        for (header, value) in pairs {
            values
                .entry(header_key(header.as_ref()))
                .or_insert_with(|| value.into());
        }
        SourceRow { values, line: 0 }
    }

    /// Tag the row with its 1-based line in the source file
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// 1-based line in the source file (0 when unknown)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Non-blank value of a header, trimmed
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values
            .get(&header_key(header))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// First non-blank value among several candidate headers, or ""
    pub fn first(&self, headers: &[&str]) -> &str {
        headers
            .iter()
            .find_map(|header| self.get(header))
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.trim().is_empty())
    }
}

/// Parsed upload: headers in file order plus the data rows
#[derive(Clone, Debug, Default)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

fn header_key(header: &str) -> String {
    clean_header(header).to_lowercase()
}

fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}

/// Parse CSV bytes into rows keyed by header
///
/// Rows may be shorter than the header row; missing cells read as empty.
/// Entirely blank rows are dropped.
///
/// # Arguments
/// * `bytes` - Raw file contents
///
/// # Returns
/// * `AppResult<ParsedFile>` - Headers and rows, or a CSV error
///
/// # Examples
/// ```
/// use guesthouse::loader::from_csv;
///
/// let parsed = from_csv(b"Book Number,Price\n123,156.00 EUR\n").unwrap();
/// assert_eq!(parsed.headers, vec!["Book Number", "Price"]);
/// assert_eq!(parsed.rows[0].get("book number"), Some("123"));
/// ```
pub fn from_csv(bytes: &[u8]) -> AppResult<ParsedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        let row = SourceRow::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header, record.get(i).unwrap_or("").to_string())),
        )
        .at_line(line);
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(ParsedFile { headers, rows })
}

/// Parse an Excel workbook (`.xlsx` or `.xls`) into rows keyed by header
///
/// The first worksheet is used and its first row is taken as the header row.
/// Cells are rendered as strings: whole numbers lose their decimal part and
/// date cells become `YYYY-MM-DD`.
///
/// # Arguments
/// * `bytes` - Raw file contents
///
/// # Returns
/// * `AppResult<ParsedFile>` - Headers and rows, or a workbook error
pub fn from_excel(bytes: &[u8]) -> AppResult<ParsedFile> {
    use calamine::{Reader, open_workbook_auto_from_rs};

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = match workbook.sheet_names().first() {
        Some(name) => name.clone(),
        None => return Err(AppError::EmptyFile),
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    // 1-based sheet row of the header; the range starts at the first used cell
    let header_line = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut sheet_rows = range.rows();

    let headers: Vec<String> = match sheet_rows.next() {
        Some(row) => row.iter().map(|cell| clean_header(&cell_to_string(cell))).collect(),
        None => return Ok(ParsedFile::default()),
    };

    let mut rows = Vec::new();
    for (offset, cells) in sheet_rows.enumerate() {
        let row = SourceRow::from_pairs(headers.iter().enumerate().map(|(i, header)| {
            let value = cells.get(i).map(cell_to_string).unwrap_or_default();
            (header, value)
        }))
        .at_line(header_line + offset + 1);
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(ParsedFile { headers, rows })
}

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.replace('T', " "),
        Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Detect file type and parse with the matching reader
///
/// # Arguments
/// * `file_name` - Name used to pick the reader (by extension)
/// * `bytes` - Raw file contents
///
/// # Returns
/// * `AppResult<ParsedFile>` - Headers and rows, or an input-format error
///
/// # Examples
/// ```
/// use guesthouse::loader::parse_upload;
///
/// assert!(parse_upload("export.pdf", b"").is_err());
/// ```
pub fn parse_upload(file_name: &str, bytes: &[u8]) -> AppResult<ParsedFile> {
    match FileKind::from_file_name(file_name)? {
        FileKind::Csv => from_csv(bytes),
        FileKind::Workbook => from_excel(bytes),
    }
}

/// Read a local file and parse it as an upload
pub fn load_file(path: impl AsRef<Path>) -> AppResult<ParsedFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    parse_upload(file_name, &bytes)
}
