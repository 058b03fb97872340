use crate::error::{AppError, AppResult};
use crate::reconcile::{CancellationPolicy, DuplicatePolicy, ReconcilePolicy};
use crate::sheets::{GoogleSheets, MemorySheets, SheetBackend};
use std::env;
use std::sync::Arc;

pub const DEFAULT_GUESTS_TAB: &str = "Guests";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CITY_TAX_PER_NIGHT: f64 = 2.50;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which spreadsheet implementation backs the stores
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Google,
    Memory,
}

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Clone, Debug)]
pub struct Config {
    pub backend: BackendKind,
    pub spreadsheet_id: String,
    pub access_token: String,
    pub api_base: String,
    pub guests_tab: String,
    pub bind_addr: String,
    pub city_tax_per_night: f64,
    pub max_upload_bytes: usize,
    pub policy: ReconcilePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::Memory,
            spreadsheet_id: String::new(),
            access_token: String::new(),
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            guests_tab: DEFAULT_GUESTS_TAB.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            city_tax_per_night: DEFAULT_CITY_TAX_PER_NIGHT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            policy: ReconcilePolicy::default(),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw))),
        _ => Ok(default),
    }
}

impl Config {
    /// Load `.env` if present, then read the environment
    ///
    /// # Errors
    /// * `AppError::Config` when a value cannot be parsed, or when the Google
    ///   backend is selected without `SPREADSHEET_ID` / `GOOGLE_ACCESS_TOKEN`
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let backend = match var_or("SHEETS_BACKEND", "google").to_lowercase().as_str() {
            "google" => BackendKind::Google,
            "memory" => BackendKind::Memory,
            other => {
                return Err(AppError::Config(format!(
                    "SHEETS_BACKEND must be 'google' or 'memory', got '{}'",
                    other
                )));
            }
        };

        let duplicates = match var_or("DUPLICATE_POLICY", "last").to_lowercase().as_str() {
            "last" => DuplicatePolicy::LastWins,
            "first" => DuplicatePolicy::FirstWins,
            other => {
                return Err(AppError::Config(format!(
                    "DUPLICATE_POLICY must be 'last' or 'first', got '{}'",
                    other
                )));
            }
        };

        let cancellations = match var_or("CANCELLATION_POLICY", "drop").to_lowercase().as_str() {
            "drop" => CancellationPolicy::Drop,
            "insert" => CancellationPolicy::Insert,
            other => {
                return Err(AppError::Config(format!(
                    "CANCELLATION_POLICY must be 'drop' or 'insert', got '{}'",
                    other
                )));
            }
        };

        let config = Config {
            backend,
            spreadsheet_id: var_or("SPREADSHEET_ID", ""),
            access_token: var_or("GOOGLE_ACCESS_TOKEN", ""),
            api_base: var_or("SHEETS_API_BASE", DEFAULT_SHEETS_API_BASE),
            guests_tab: var_or("GUESTS_TAB", DEFAULT_GUESTS_TAB),
            bind_addr: var_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            city_tax_per_night: parse_var("CITY_TAX_PER_NIGHT", DEFAULT_CITY_TAX_PER_NIGHT)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            policy: ReconcilePolicy {
                duplicates,
                cancellations,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.backend == BackendKind::Google {
            if self.spreadsheet_id.is_empty() {
                return Err(AppError::Config("SPREADSHEET_ID is not set".to_string()));
            }
            if self.access_token.is_empty() {
                return Err(AppError::Config("GOOGLE_ACCESS_TOKEN is not set".to_string()));
            }
        }
        if self.guests_tab.trim().is_empty() {
            return Err(AppError::Config("GUESTS_TAB is empty".to_string()));
        }
        Ok(())
    }

    /// Build the spreadsheet backend this configuration points at
    pub fn backend(&self) -> Arc<dyn SheetBackend> {
        match self.backend {
            BackendKind::Google => Arc::new(GoogleSheets::new(
                &self.api_base,
                &self.spreadsheet_id,
                &self.access_token,
            )),
            BackendKind::Memory => Arc::new(MemorySheets::new()),
        }
    }
}
