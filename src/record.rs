use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RFC 3339 timestamp as stored in `created_at` / `updated_at`
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

macro_rules! canonical_record {
    ($($field:ident),+ $(,)?) => {
        /// Canonical guest/booking record
        ///
        /// Every channel export is mapped into this shape. All values are kept
        /// as strings because the backing spreadsheet is string-typed.
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct GuestRecord {
            $(pub $field: String,)+
        }

        /// Canonical header order of the guests tab
        pub const CANONICAL_FIELDS: &[&str] = &[$(stringify!($field)),+];

        impl GuestRecord {
            pub fn get(&self, field: &str) -> Option<&str> {
                match field {
                    $(stringify!($field) => Some(self.$field.as_str()),)+
                    _ => None,
                }
            }

            pub fn field_mut(&mut self, field: &str) -> Option<&mut String> {
                match field {
                    $(stringify!($field) => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

canonical_record!(
    booking_id,
    first_name,
    last_name,
    email,
    phone,
    country,
    language,
    property,
    room,
    check_in,
    check_out,
    nights,
    guests,
    adults,
    children,
    total_eur,
    city_tax,
    status,
    special_requests,
    arrival_time_stated,
    arrival_request_sent,
    arrival_confirmed,
    arrival_time_confirmed,
    read_messages,
    midstay_checkin,
    notes,
    source,
    created_at,
    updated_at,
);

/// Fields compared when deciding whether an imported booking changed
pub const COMPARABLE_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "country",
    "language",
    "property",
    "room",
    "check_in",
    "check_out",
    "nights",
    "guests",
    "adults",
    "children",
    "total_eur",
    "city_tax",
    "special_requests",
];

/// Fields an import may overwrite on top of the comparable ones.
/// Workflow fields (arrival flags, notes...) belong to the operator.
pub const IMPORT_OWNED_FIELDS: &[&str] = &["status", "arrival_time_stated", "source"];

impl GuestRecord {
    /// Natural key, whitespace-trimmed
    pub fn key(&self) -> &str {
        self.booking_id.trim()
    }

    pub fn status(&self) -> Status {
        Status::from_normalized(&self.status)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Booking status after normalization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Confirmed,
    Cancelled,
    NoShow,
    Other(String),
}

impl Status {
    pub fn from_normalized(value: &str) -> Self {
        match value.trim() {
            "" | "confirmed" => Status::Confirmed,
            "cancelled" => Status::Cancelled,
            "no_show" => Status::NoShow,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Confirmed => "confirmed",
            Status::Cancelled => "cancelled",
            Status::NoShow => "no_show",
            Status::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column layout shared by the mapper, the reconciler and the sheet adapter
///
/// Passed around explicitly so that several layouts can coexist (for
/// instance a test tab with a reduced comparable set).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSchema {
    /// Header order used when writing rows
    pub headers: Vec<String>,
    /// Fields compared to detect a changed booking
    pub comparable: Vec<String>,
    /// Extra fields copied from an import when a booking changed
    pub import_owned: Vec<String>,
}

impl Default for FieldSchema {
    fn default() -> Self {
        FieldSchema {
            headers: CANONICAL_FIELDS.iter().map(|f| f.to_string()).collect(),
            comparable: COMPARABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
            import_owned: IMPORT_OWNED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl FieldSchema {
    pub fn is_known_field(&self, field: &str) -> bool {
        CANONICAL_FIELDS.contains(&field)
    }

    /// Fields an import merge is allowed to write
    pub fn merge_fields(&self) -> impl Iterator<Item = &str> {
        self.comparable
            .iter()
            .chain(self.import_owned.iter())
            .map(String::as_str)
    }
}
