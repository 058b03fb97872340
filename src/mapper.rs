use crate::detect::Channel;
use crate::loader::SourceRow;
use crate::normalize::{
    expand_country, extract_arrival_time, normalize_date, normalize_phone, normalize_status,
    parse_count, parse_money, split_name, title_case,
};
use crate::reconcile::Incoming;
use crate::record::GuestRecord;
use crate::rooms::map_rooms;

/// Column names of one channel's export, per canonical field
///
/// Each list is tried in order and the first non-blank column wins.
#[derive(Debug)]
pub struct ChannelLayout {
    pub channel: Channel,
    pub booking_id: &'static [&'static str],
    pub guest_name: &'static [&'static str],
    pub first_name: &'static [&'static str],
    pub last_name: &'static [&'static str],
    pub email: &'static [&'static str],
    pub phone: &'static [&'static str],
    pub country: &'static [&'static str],
    pub language: &'static [&'static str],
    pub unit: &'static [&'static str],
    pub check_in: &'static [&'static str],
    pub check_out: &'static [&'static str],
    pub nights: &'static [&'static str],
    pub guests: &'static [&'static str],
    pub adults: &'static [&'static str],
    pub children: &'static [&'static str],
    pub total: &'static [&'static str],
    pub status: &'static [&'static str],
    pub remarks: &'static [&'static str],
}

pub const BOOKING_LAYOUT: ChannelLayout = ChannelLayout {
    channel: Channel::Booking,
    booking_id: &["Book Number", "Reservation number"],
    guest_name: &["Guest name(s)", "Guest name", "Booked by"],
    first_name: &[],
    last_name: &[],
    email: &["Email", "Booker email"],
    phone: &["Phone number", "Phone"],
    country: &["Booker country", "Country"],
    language: &["Language"],
    unit: &["Unit type", "Rooms"],
    check_in: &["Check-in", "Arrival"],
    check_out: &["Check-out", "Departure"],
    nights: &["Duration (nights)", "Nights"],
    guests: &["People", "Persons"],
    adults: &["Adults"],
    children: &["Children"],
    total: &["Price", "Total price"],
    status: &["Status"],
    remarks: &["Remarks", "Special requests"],
};

pub const AIRBNB_LAYOUT: ChannelLayout = ChannelLayout {
    channel: Channel::Airbnb,
    booking_id: &["Confirmation code"],
    guest_name: &["Guest name", "Guest"],
    first_name: &["First name"],
    last_name: &["Last name"],
    email: &["Email"],
    phone: &["Contact", "Phone"],
    country: &["Country"],
    language: &["Language"],
    unit: &["Listing"],
    check_in: &["Start date", "Check-in"],
    check_out: &["End date", "Check-out"],
    nights: &["# of nights"],
    guests: &[],
    adults: &["# of adults"],
    children: &["# of children"],
    total: &["Earnings", "Total payout", "Amount"],
    status: &["Status"],
    remarks: &["Special requests", "Message"],
};

impl Channel {
    pub fn layout(&self) -> &'static ChannelLayout {
        match self {
            Channel::Booking => &BOOKING_LAYOUT,
            Channel::Airbnb => &AIRBNB_LAYOUT,
        }
    }
}

/// Map one export row to a canonical record
///
/// Fields the export does not carry stay empty.
pub fn map_row(layout: &ChannelLayout, row: &SourceRow) -> GuestRecord {
    let mut record = GuestRecord {
        booking_id: row.first(layout.booking_id).to_string(),
        ..GuestRecord::default()
    };

    let (first_name, last_name) = split_name(row.first(layout.guest_name));
    let explicit_first = row.first(layout.first_name);
    let explicit_last = row.first(layout.last_name);
    record.first_name = if explicit_first.is_empty() {
        first_name
    } else {
        title_case(explicit_first)
    };
    record.last_name = if explicit_last.is_empty() {
        last_name
    } else {
        title_case(explicit_last)
    };

    record.email = row.first(layout.email).to_lowercase();
    record.phone = normalize_phone(row.first(layout.phone));
    record.country = expand_country(row.first(layout.country));
    record.language = row.first(layout.language).to_string();

    let unit = row.first(layout.unit);
    if !unit.is_empty() {
        let rooms = map_rooms(unit);
        record.room = rooms.room;
        record.property = rooms.property;
    }

    record.check_in = normalize_date(row.first(layout.check_in));
    record.check_out = normalize_date(row.first(layout.check_out));
    record.nights = row.first(layout.nights).to_string();
    record.adults = row.first(layout.adults).to_string();
    record.children = row.first(layout.children).to_string();
    record.guests = match row.first(layout.guests) {
        "" => derived_guest_count(&record.adults, &record.children),
        guests => guests.to_string(),
    };

    record.total_eur = parse_money(row.first(layout.total));
    record.status = normalize_status(row.first(layout.status)).as_str().to_string();

    let remarks = row.first(layout.remarks);
    record.special_requests = remarks.to_string();
    record.arrival_time_stated = extract_arrival_time(remarks);

    record.source = layout.channel.label().to_string();
    record
}

fn derived_guest_count(adults: &str, children: &str) -> String {
    match (parse_count(adults), parse_count(children)) {
        (Some(a), Some(c)) => (a + c).to_string(),
        (Some(a), None) => a.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => String::new(),
    }
}

/// Map every row of an export
pub fn map_rows(channel: Channel, rows: &[SourceRow]) -> Vec<GuestRecord> {
    let layout = channel.layout();
    rows.iter().map(|row| map_row(layout, row)).collect()
}

/// Map every row of an export, keeping the file line each came from
pub fn map_incoming(channel: Channel, rows: &[SourceRow]) -> Vec<Incoming> {
    let layout = channel.layout();
    rows.iter()
        .map(|row| Incoming {
            line: row.line(),
            record: map_row(layout, row),
        })
        .collect()
}
