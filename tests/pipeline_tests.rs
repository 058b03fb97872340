use std::path::PathBuf;

use guesthouse::detect::{Channel, detect_channel};
use guesthouse::error::AppError;
use guesthouse::loader::{SourceRow, from_csv, from_excel, load_file, parse_upload};
use guesthouse::mapper::{BOOKING_LAYOUT, map_row, map_rows};
use guesthouse::normalize::normalize_phone;
use guesthouse::rooms::map_rooms;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> Vec<u8> {
    let path = fixtures_dir().join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

// -------------------------------------------------------------------------
// Loader
// -------------------------------------------------------------------------

#[test]
fn csv_rows_are_keyed_by_header_case_insensitively() {
    let parsed = from_csv(b"Book Number, Guest Name(s) \n123,\"LU, LINLONG\"\n").unwrap();

    assert_eq!(parsed.headers, vec!["Book Number", "Guest Name(s)"]);
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].get("BOOK NUMBER"), Some("123"));
    assert_eq!(parsed.rows[0].get("guest name(s)"), Some("LU, LINLONG"));
}

#[test]
fn csv_short_rows_and_blank_rows() {
    let parsed = from_csv(b"a,b,c\n1,2\n,,\n4,5,6\n").unwrap();

    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].get("c"), None);
    assert_eq!(parsed.rows[1].get("c"), Some("6"));
    // lines count the header and the dropped blank row
    assert_eq!(parsed.rows[0].line(), 2);
    assert_eq!(parsed.rows[1].line(), 4);
}

#[test]
fn csv_strips_byte_order_mark() {
    let parsed = from_csv("\u{feff}Confirmation code,Listing\nHM1,Bliss\n".as_bytes()).unwrap();
    assert_eq!(parsed.headers[0], "Confirmation code");
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = parse_upload("bookings.pdf", b"whatever").unwrap_err();
    assert!(matches!(err, AppError::UnsupportedFile(ext) if ext == ".pdf"));

    let err = parse_upload("bookings", b"whatever").unwrap_err();
    assert!(matches!(err, AppError::UnsupportedFile(_)));
}

#[test]
fn extension_check_ignores_case() {
    let parsed = parse_upload("EXPORT.CSV", b"Book Number\n1\n").unwrap();
    assert_eq!(parsed.rows.len(), 1);
}

#[test]
fn workbook_first_sheet_is_read() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Confirmation code").unwrap();
    sheet.write_string(0, 1, "# of adults").unwrap();
    sheet.write_string(0, 2, "Earnings").unwrap();
    sheet.write_string(1, 0, "HM42").unwrap();
    sheet.write_number(1, 1, 2.0).unwrap();
    sheet.write_number(1, 2, 99.5).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let parsed = from_excel(&bytes).unwrap();

    assert_eq!(parsed.headers, vec!["Confirmation code", "# of adults", "Earnings"]);
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].get("confirmation code"), Some("HM42"));
    assert_eq!(parsed.rows[0].get("# of adults"), Some("2"));
    assert_eq!(parsed.rows[0].get("earnings"), Some("99.5"));
    assert_eq!(parsed.rows[0].line(), 2);
}

#[test]
fn workbook_rows_keep_their_sheet_line() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Book Number").unwrap();
    sheet.write_string(1, 0, "1").unwrap();
    sheet.write_string(4, 0, "2").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let parsed = from_excel(&bytes).unwrap();

    let lines: Vec<usize> = parsed.rows.iter().map(|row| row.line()).collect();
    assert_eq!(lines, vec![2, 5]);
}

#[test]
fn load_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    std::fs::write(&path, fixture("airbnb_export.csv")).unwrap();

    let parsed = load_file(&path).unwrap();
    assert_eq!(parsed.rows.len(), 2);
}

// -------------------------------------------------------------------------
// Source detection
// -------------------------------------------------------------------------

#[test]
fn detects_both_channels() {
    let booking = from_csv(&fixture("booking_export.csv")).unwrap();
    let airbnb = from_csv(&fixture("airbnb_export.csv")).unwrap();

    assert_eq!(detect_channel(&booking.headers), Some(Channel::Booking));
    assert_eq!(detect_channel(&airbnb.headers), Some(Channel::Airbnb));
}

#[test]
fn unknown_headers_are_not_detected() {
    assert_eq!(detect_channel(&["Name", "Arrival", "Room"]), None);
    assert_eq!(detect_channel::<&str>(&[]), None);
}

#[test]
fn booking_markers_win_over_airbnb() {
    let headers = ["Book Number", "Listing"];
    assert_eq!(detect_channel(&headers), Some(Channel::Booking));
}

// -------------------------------------------------------------------------
// Mapping
// -------------------------------------------------------------------------

#[test]
fn booking_row_example() {
    let row = SourceRow::from_pairs([
        ("Book Number", "123"),
        ("Check-in", "2026-01-06"),
        ("Check-out", "2026-01-09"),
        ("Guest name(s)", "LU, LINLONG"),
        ("Unit type", "Double Room at The Riad"),
        ("Price", "156.00 EUR"),
        ("Duration (nights)", "3"),
    ]);

    let record = map_row(&BOOKING_LAYOUT, &row);

    assert_eq!(record.booking_id, "123");
    assert_eq!(record.first_name, "Linlong");
    assert_eq!(record.last_name, "Lu");
    assert_eq!(record.room, "Jewel Box");
    assert_eq!(record.property, "The Riad");
    assert_eq!(record.total_eur, "156.00");
    assert_eq!(record.nights, "3");
    assert_eq!(record.check_in, "2026-01-06");
    assert_eq!(record.check_out, "2026-01-09");
    assert_eq!(record.status, "confirmed");
    assert_eq!(record.source, "Booking.com");
}

#[test]
fn booking_export_maps_every_row() {
    let parsed = from_csv(&fixture("booking_export.csv")).unwrap();
    let records = map_rows(Channel::Booking, &parsed.rows);

    assert_eq!(records.len(), 3);

    let lu = &records[0];
    assert_eq!(lu.phone, "+8613800000000");
    assert_eq!(lu.country, "China");
    assert_eq!(lu.guests, "2");
    assert_eq!(lu.arrival_time_stated, "15:00 and 16:00");

    let smith = &records[1];
    assert_eq!(smith.first_name, "Jane");
    assert_eq!(smith.phone, "+07700900123");
    assert_eq!(smith.country, "United Kingdom");
    assert_eq!(smith.room, "Bliss / Heart");
    assert_eq!(smith.property, "The Riad");
    assert_eq!(smith.total_eur, "1234.50");
    assert_eq!(smith.arrival_time_stated, "9pm");

    let dupont = &records[2];
    assert_eq!(dupont.status, "cancelled");
    assert_eq!(dupont.room, "Amal");
    assert_eq!(dupont.property, "The Douaria");
    assert_eq!(dupont.phone, "");
    assert_eq!(dupont.arrival_time_stated, "");
}

#[test]
fn airbnb_export_maps_every_row() {
    let parsed = from_csv(&fixture("airbnb_export.csv")).unwrap();
    let records = map_rows(Channel::Airbnb, &parsed.rows);

    let anna = &records[0];
    assert_eq!(anna.booking_id, "HMABC123");
    assert_eq!(anna.first_name, "Anna");
    assert_eq!(anna.last_name, "Müller");
    assert_eq!(anna.phone, "+491512345678");
    assert_eq!(anna.check_in, "2026-04-12");
    assert_eq!(anna.check_out, "2026-04-15");
    assert_eq!(anna.adults, "2");
    assert_eq!(anna.children, "1");
    assert_eq!(anna.guests, "3");
    assert_eq!(anna.room, "Ahlam");
    assert_eq!(anna.property, "The Douaria");
    assert_eq!(anna.total_eur, "450.00");
    assert_eq!(anna.source, "Airbnb");

    let john = &records[1];
    assert_eq!(john.phone, "+15550109999");
    assert_eq!(john.room, "Love");
    assert_eq!(john.property, "The Riad");
    assert_eq!(john.guests, "1");
}

#[test]
fn mapped_rooms_map_to_themselves() {
    let parsed = from_csv(&fixture("booking_export.csv")).unwrap();

    for (row, record) in parsed.rows.iter().zip(map_rows(Channel::Booking, &parsed.rows)) {
        let direct = map_rooms(row.get("unit type").unwrap_or(""));
        let again = map_rooms(&record.room);
        assert_eq!(again.room, direct.room);
        assert_eq!(again.property, record.property);
    }
}

#[test]
fn phone_normalization_is_idempotent() {
    for raw in ["+86 138 0000 0000", "07700 900123", "+1 (555) 010-9999", "0049+151", "", "n/a"] {
        let once = normalize_phone(raw);
        assert_eq!(normalize_phone(&once), once, "not idempotent for {raw:?}");
    }
}
