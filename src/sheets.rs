use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Row-level access to the tabs of one remote spreadsheet
///
/// Rows are header-ordered string arrays. `sheet_row` is the 1-based row
/// number as shown in the spreadsheet UI (row 1 is the header row).
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// All rows of a tab, header row included
    async fn read_rows(&self, tab: &str) -> AppResult<Vec<Vec<String>>>;

    /// Overwrite a single row
    async fn update_row(&self, tab: &str, sheet_row: usize, values: Vec<String>) -> AppResult<()>;

    /// Append rows after the last non-empty row, in one call
    async fn append_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> AppResult<()>;

    async fn tab_titles(&self) -> AppResult<Vec<String>>;

    async fn add_tab(&self, tab: &str) -> AppResult<()>;
}

/// Spreadsheet column letter for a 1-based column number (1 -> A, 27 -> AA)
pub fn column_letter(col: usize) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

/// A1 range of a whole tab, quoted so tab names may contain spaces
pub fn tab_range(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// A1 range covering one row of `width` columns
pub fn row_range(tab: &str, sheet_row: usize, width: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        tab_range(tab),
        sheet_row,
        column_letter(width.max(1)),
        sheet_row
    )
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Google Sheets v4 REST client
///
/// Values are written with `USER_ENTERED` so that a leading apostrophe keeps
/// a cell as text, the same as typing it into the UI.
pub struct GoogleSheets {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheets {
    pub fn new(base_url: &str, spreadsheet_id: &str, access_token: &str) -> Self {
        GoogleSheets {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        Err(AppError::Upstream(format!("{} ({})", message, status)))
    }
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn read_rows(&self, tab: &str) -> AppResult<Vec<Vec<String>>> {
        debug!("reading tab {}", tab);
        let url = self.values_url(&tab_range(tab));
        let response = self.send(self.client.get(url)).await?;
        let range: ValueRange = response.json().await?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(value_to_string).collect())
            .collect())
    }

    async fn update_row(&self, tab: &str, sheet_row: usize, values: Vec<String>) -> AppResult<()> {
        let range = row_range(tab, sheet_row, values.len());
        debug!("updating {}", range);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        let request = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn append_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!("appending {} rows to {}", rows.len(), tab);
        let range = tab_range(tab);
        let url = format!("{}:append", self.values_url(&range));
        let request = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": rows }));
        self.send(request).await?;
        Ok(())
    }

    async fn tab_titles(&self) -> AppResult<Vec<String>> {
        let request = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties.title")]);
        let info: SpreadsheetInfo = self.send(request).await?.json().await?;
        Ok(info.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_tab(&self, tab: &str) -> AppResult<()> {
        debug!("creating tab {}", tab);
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": tab } } }]
        });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

/// In-process spreadsheet used for offline runs and tests
///
/// Mirrors the remote behaviour that matters to callers: appends land after
/// the last row, a leading apostrophe on a written cell is consumed, and
/// unprefixed numbers are re-rendered the way `USER_ENTERED` stores them.
#[derive(Default)]
pub struct MemorySheets {
    tabs: Mutex<HashMap<String, Vec<Vec<String>>>>,
    writes: Mutex<usize>,
}

/// What `USER_ENTERED` stores: an apostrophe forces text, numbers lose
/// their formatting ("156.00" reads back as "156")
fn as_entered(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| {
            if let Some(text) = value.strip_prefix('\'') {
                return text.to_string();
            }
            match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => number.to_string(),
                _ => value,
            }
        })
        .collect()
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tab with rows (header row first)
    pub async fn with_tab(self, tab: &str, rows: Vec<Vec<String>>) -> Self {
        self.tabs.lock().await.insert(tab.to_string(), rows);
        self
    }

    /// Number of update/append calls received so far
    pub async fn write_calls(&self) -> usize {
        *self.writes.lock().await
    }

    pub async fn snapshot(&self, tab: &str) -> Vec<Vec<String>> {
        self.tabs.lock().await.get(tab).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SheetBackend for MemorySheets {
    async fn read_rows(&self, tab: &str) -> AppResult<Vec<Vec<String>>> {
        self.tabs
            .lock()
            .await
            .get(tab)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("Unable to parse range: {}", tab)))
    }

    async fn update_row(&self, tab: &str, sheet_row: usize, values: Vec<String>) -> AppResult<()> {
        let mut tabs = self.tabs.lock().await;
        let rows = tabs
            .get_mut(tab)
            .ok_or_else(|| AppError::Upstream(format!("Unable to parse range: {}", tab)))?;
        if sheet_row == 0 {
            return Err(AppError::Upstream("Row numbers start at 1".to_string()));
        }
        if rows.len() < sheet_row {
            rows.resize(sheet_row, Vec::new());
        }
        rows[sheet_row - 1] = as_entered(values);
        *self.writes.lock().await += 1;
        Ok(())
    }

    async fn append_rows(&self, tab: &str, new_rows: Vec<Vec<String>>) -> AppResult<()> {
        if new_rows.is_empty() {
            return Ok(());
        }
        let mut tabs = self.tabs.lock().await;
        let rows = tabs
            .get_mut(tab)
            .ok_or_else(|| AppError::Upstream(format!("Unable to parse range: {}", tab)))?;
        rows.extend(new_rows.into_iter().map(as_entered));
        *self.writes.lock().await += 1;
        Ok(())
    }

    async fn tab_titles(&self) -> AppResult<Vec<String>> {
        let mut titles: Vec<String> = self.tabs.lock().await.keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }

    async fn add_tab(&self, tab: &str) -> AppResult<()> {
        self.tabs
            .lock()
            .await
            .entry(tab.to_string())
            .or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(29), "AC");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn ranges_quote_tab_names() {
        assert_eq!(tab_range("Guests"), "'Guests'");
        assert_eq!(tab_range("Bob's list"), "'Bob''s list'");
        assert_eq!(row_range("Guests", 5, 29), "'Guests'!A5:AC5");
    }

    #[tokio::test]
    async fn memory_backend_consumes_text_prefix() {
        let sheets = MemorySheets::new();
        sheets.add_tab("Guests").await.unwrap();
        sheets
            .append_rows("Guests", vec![vec!["phone".into()], vec!["'+212600".into()]])
            .await
            .unwrap();
        sheets
            .update_row("Guests", 2, vec!["'+212611".into()])
            .await
            .unwrap();

        assert_eq!(
            sheets.read_rows("Guests").await.unwrap(),
            vec![vec!["phone".to_string()], vec!["+212611".to_string()]]
        );
        assert_eq!(sheets.write_calls().await, 2);
        assert!(sheets.read_rows("Missing").await.is_err());
    }

    #[tokio::test]
    async fn memory_backend_coerces_numbers() {
        let sheets = MemorySheets::new();
        sheets.add_tab("Guests").await.unwrap();
        sheets
            .append_rows(
                "Guests",
                vec![vec![
                    "156.00".into(),
                    "'156.00".into(),
                    "+4915".into(),
                    "0612".into(),
                    "2026-01-06".into(),
                ]],
            )
            .await
            .unwrap();

        assert_eq!(
            sheets.read_rows("Guests").await.unwrap(),
            vec![vec![
                "156".to_string(),
                "156.00".to_string(),
                "4915".to_string(),
                "612".to_string(),
                "2026-01-06".to_string(),
            ]]
        );
    }
}
