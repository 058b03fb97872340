use serde::Serialize;
use std::fmt;

/// External booking channel an export came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    #[serde(rename = "booking")]
    Booking,
    #[serde(rename = "airbnb")]
    Airbnb,
}

impl Channel {
    /// Label stored in the `source` column
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Booking => "Booking.com",
            Channel::Airbnb => "Airbnb",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header substrings unique to each channel's export. Checked top to bottom;
/// Booking.com goes first because its exports can carry generic columns that
/// also appear in Airbnb files.
pub const CHANNEL_MARKERS: &[(Channel, &[&str])] = &[
    (Channel::Booking, &["book number", "unit type", "booker country"]),
    (Channel::Airbnb, &["confirmation code", "listing", "# of adults"]),
];

/// Classify an export by its headers
///
/// Returns `None` when no marker matches; the caller rejects the upload.
pub fn detect_channel<S: AsRef<str>>(headers: &[S]) -> Option<Channel> {
    let joined = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");

    CHANNEL_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| joined.contains(marker)))
        .map(|(channel, _)| *channel)
}
