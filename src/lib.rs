/*!
# Guesthouse Booking Import

Imports booking exports from the channel managers into a single guest list
kept in a shared spreadsheet, and serves that list over a small HTTP API.

## Overview

The property runs two buildings (The Riad and The Douaria) and receives
bookings from Booking.com and Airbnb. Each channel exports reservations in
its own CSV/Excel layout. This crate turns those exports into one canonical
guest record per booking and reconciles them against the guests tab, so
that uploading the same export twice changes nothing and uploading a newer
export only touches the bookings that changed.

## Pipeline

1. **loader**: parse the uploaded `.csv`, `.xls` or `.xlsx` file into header
   keyed rows
2. **detect**: identify the channel from the header names
3. **mapper**: map each row into a `GuestRecord`, using the field rules in
   **normalize** (names, phones, countries, dates, money, status, arrival
   time) and the room table in **rooms**
4. **reconcile**: classify every record as added, updated, unchanged,
   cancelled or an error, with no I/O
5. **import**: apply the resulting writes through **store**, which sits on a
   **sheets** backend (Google Sheets REST or in-memory)

## Other Modules

- **guests**: list, create and patch bookings for the operator UI
- **downloader**: guest list export (CSV, XLSX)
- **insights**: monthly summary of a review export
- **config**: environment configuration
- **error**: crate-wide error type and its HTTP mapping
- **app**: routing (behind the `web` feature)

## REST API Endpoints

- `POST /api/import` - Upload a channel export (multipart field `file`)
- `GET /api/guests` - Deduplicated guest list with derived fields
- `POST /api/guests` - Add a manual booking
- `PATCH /api/guests/:booking_id` - Edit fields of one booking
- `GET /api/guests/export?format=csv|xlsx` - Download the guest list
- `POST /api/insights/reviews` - Summarize a review export
- `GET /health` - Liveness check
*/

pub mod config;
pub mod detect;
pub mod downloader;
pub mod error;
pub mod guests;
pub mod import;
pub mod insights;
pub mod loader;
pub mod mapper;
pub mod normalize;
pub mod reconcile;
pub mod record;
pub mod rooms;
pub mod sheets;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

pub use error::{AppError, AppResult};
pub use record::GuestRecord;
