use crate::error::{AppError, AppResult};
use crate::normalize::{
    expand_country, normalize_date, normalize_phone, normalize_status, parse_count, parse_date,
};
use crate::reconcile::{DuplicatePolicy, index_by_key};
use crate::record::{GuestRecord, timestamp};
use crate::store::GuestStore;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Source label of manually entered bookings
pub const DIRECT_SOURCE: &str = "Direct";

/// Fields a manual edit may not touch
const IMMUTABLE_FIELDS: &[&str] = &["booking_id", "created_at", "updated_at"];

/// A stored record plus fields derived for display
#[derive(Clone, Debug, Serialize)]
pub struct GuestView {
    #[serde(flatten)]
    pub record: GuestRecord,
    pub display_name: String,
    pub phone_display: String,
    pub stay_nights: Option<i64>,
    pub city_tax_due: Option<String>,
}

/// Keep one record per booking id, chosen by `policy`
///
/// Output order follows the first appearance of each id. Rows without a
/// booking id are dropped.
pub fn dedupe(records: Vec<GuestRecord>, policy: DuplicatePolicy) -> Vec<GuestRecord> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<GuestRecord> = Vec::new();

    for record in records {
        let key = record.key().to_string();
        if key.is_empty() {
            continue;
        }
        match position.get(&key) {
            Some(&pos) => {
                if policy == DuplicatePolicy::LastWins {
                    unique[pos] = record;
                }
            }
            None => {
                position.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Nights between check-in and check-out, else the stored `nights` value
pub fn stay_nights(record: &GuestRecord) -> Option<i64> {
    if let (Some(check_in), Some(check_out)) =
        (parse_date(&record.check_in), parse_date(&record.check_out))
    {
        let nights = (check_out - check_in).num_days();
        if nights > 0 {
            return Some(nights);
        }
    }
    parse_count(&record.nights)
}

/// City tax owed: adults x nights x nightly rate, formatted with two decimals
pub fn city_tax_due(record: &GuestRecord, rate_per_night: f64) -> Option<String> {
    let adults = parse_count(&record.adults)?;
    let nights = stay_nights(record)?;
    let person_nights = adults.checked_mul(nights)?;
    Some(format!("{:.2}", person_nights as f64 * rate_per_night))
}

/// `DIRECT-<timestamp>`, suffixed `-2`, `-3`, ... until `taken` rejects it
fn direct_id(now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("DIRECT-{}", now.format("%Y%m%d%H%M%S"));
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|id| !taken(id))
        .unwrap_or(base)
}

pub fn to_view(record: GuestRecord, rate_per_night: f64) -> GuestView {
    GuestView {
        display_name: record.display_name(),
        phone_display: record.phone.trim_start_matches('\'').to_string(),
        stay_nights: stay_nights(&record),
        city_tax_due: city_tax_due(&record, rate_per_night),
        record,
    }
}

fn json_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

/// Normalise a manually entered value the same way imports do
fn normalize_field(field: &str, value: &str) -> String {
    match field {
        "phone" => normalize_phone(value),
        "country" => expand_country(value),
        "email" => value.trim().to_lowercase(),
        "status" => normalize_status(value).as_str().to_string(),
        "check_in" | "check_out" => normalize_date(value),
        _ => value.trim().to_string(),
    }
}

/// Guest list operations for the CRUD endpoints
#[derive(Clone)]
pub struct GuestRegistry {
    store: GuestStore,
    policy: DuplicatePolicy,
    city_tax_per_night: f64,
}

impl GuestRegistry {
    pub fn new(store: GuestStore, policy: DuplicatePolicy, city_tax_per_night: f64) -> Self {
        GuestRegistry {
            store,
            policy,
            city_tax_per_night,
        }
    }

    pub fn store(&self) -> &GuestStore {
        &self.store
    }

    /// Deduplicated records, without derived fields
    pub async fn records(&self) -> AppResult<Vec<GuestRecord>> {
        if !self.store.exists().await? {
            return Ok(Vec::new());
        }
        let stored = self.store.load().await?;
        Ok(dedupe(stored.records, self.policy))
    }

    pub async fn list(&self) -> AppResult<Vec<GuestView>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .map(|record| to_view(record, self.city_tax_per_night))
            .collect())
    }

    /// Append a manually entered booking
    ///
    /// A blank booking id gets a generated `DIRECT-<timestamp>` id, with a
    /// `-2`, `-3`, ... suffix when that id is already taken.
    pub async fn create(&self, input: GuestRecord, now: DateTime<Utc>) -> AppResult<GuestRecord> {
        let mut record = GuestRecord::default();
        for field in &self.store.schema().headers {
            let value = input.get(field).unwrap_or("");
            if let Some(slot) = record.field_mut(field) {
                *slot = normalize_field(field, value);
            }
        }

        let generated = record.key().is_empty();
        if record.source.is_empty() {
            record.source = DIRECT_SOURCE.to_string();
        }
        let stamp = timestamp(now);
        record.created_at = stamp.clone();
        record.updated_at = stamp;

        self.store.ensure_tab().await?;
        let stored = self.store.load().await?;
        let taken = |id: &str| stored.records.iter().any(|r| r.key() == id);
        if generated {
            record.booking_id = direct_id(now, taken);
        } else if taken(record.key()) {
            return Err(AppError::Conflict(record.booking_id));
        }

        self.store
            .append(&stored, std::slice::from_ref(&record))
            .await?;
        info!("created guest {}", record.booking_id);
        Ok(record)
    }

    /// Apply a partial update to the stored booking
    ///
    /// Provided values replace the stored ones, blanks included; absent
    /// fields are untouched.
    pub async fn patch(
        &self,
        booking_id: &str,
        fields: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> AppResult<GuestRecord> {
        for field in fields.keys() {
            if !self.store.schema().is_known_field(field) {
                return Err(AppError::BadRequest(format!("Unknown field: {}", field)));
            }
            if IMMUTABLE_FIELDS.contains(&field.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Field cannot be changed: {}",
                    field
                )));
            }
        }

        let key = booking_id.trim();
        if !self.store.exists().await? {
            return Err(AppError::NotFound(key.to_string()));
        }
        let stored = self.store.load().await?;
        let row_index = match index_by_key(&stored.records, self.policy).get(key) {
            Some(&row) => row,
            None => return Err(AppError::NotFound(key.to_string())),
        };

        let mut record = stored.records[row_index].clone();
        for (field, value) in fields {
            if let Some(slot) = record.field_mut(field) {
                *slot = normalize_field(field, &json_to_cell(value));
            }
        }
        record.updated_at = timestamp(now);

        self.store.update(&stored, row_index, &record).await?;
        info!("updated guest {} ({} fields)", key, fields.len());
        Ok(record)
    }
}
