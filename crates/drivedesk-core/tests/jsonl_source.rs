use std::fs;

use chrono::NaiveDate;
use drivedesk_core::fetch::compute_fetch_window;
use drivedesk_core::source::{BookingSource, JsonlBookingSource};
use drivedesk_core::view::ViewMode;
use drivedesk_core::BookingStatus;
use tempfile::tempdir;

fn june_week() -> drivedesk_core::FetchWindow {
    compute_fetch_window(
        NaiveDate::from_ymd_opt(2024, 6, 12).expect("date"),
        ViewMode::Week,
        chrono_tz::UTC,
    )
}

const EXPORT: &str = r#"
{"id":"0b4d5f0e-3c2a-4a57-9d43-1f2a3b4c5d6e","title":"Parallel parking","start_time":"2024-06-13T15:00:00Z","end_time":"2024-06-13T16:00:00Z","status":"completed","lesson_type":"manoeuvres","user_id":"instructor-1"}

{"id":"1c5e6a1f-4d3b-4b68-8e54-2a3b4c5d6e7f","title":"Motorway","start":"2024-06-10T07:30:00Z","end":"2024-06-10T09:00:00Z","status":"scheduled","student_id":"2d6f7b2a-5e4c-4c79-9f65-3b4c5d6e7f80"}
{"id":"3e708c3b-6f5d-4d8a-8a76-4c5d6e7f8091","title":"Next month","start":"2024-07-20T10:00:00Z","end":"2024-07-20T11:00:00Z","status":"cancelled"}
"#;

#[test]
fn jsonl_source_filters_and_sorts_window() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("bookings.jsonl");
    fs::write(&path, EXPORT).expect("write export");

    let source = JsonlBookingSource::new(&path);
    assert_eq!(source.load_all().expect("load all").len(), 3);

    let bookings = source.fetch(&june_week()).expect("fetch");
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].title, "Motorway");
    assert_eq!(bookings[0].lesson_type, "standard");
    assert!(bookings[0].student_id.is_some());
    assert_eq!(bookings[1].status, BookingStatus::Completed);
    assert_eq!(
        bookings[1].extra.get("user_id").and_then(|v| v.as_str()),
        Some("instructor-1")
    );
}

#[test]
fn missing_file_reads_as_empty() {
    let temp = tempdir().expect("tempdir");
    let source = JsonlBookingSource::new(&temp.path().join("absent.jsonl"));
    assert!(source.fetch(&june_week()).expect("fetch").is_empty());
}

#[test]
fn malformed_line_reports_location() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("bookings.jsonl");
    fs::write(&path, "\n{\"title\": \"no id\"}\n").expect("write");

    let err = JsonlBookingSource::new(&path)
        .fetch(&june_week())
        .expect_err("malformed line should fail");
    let message = format!("{err:#}");
    assert!(message.contains("line 2"), "{message}");
}

#[test]
fn inverted_booking_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("bookings.jsonl");
    fs::write(
        &path,
        r#"{"id":"4f819d4c-7a6e-4e9b-9b87-5d6e7f8091a2","title":"Backwards","start":"2024-06-11T12:00:00Z","end":"2024-06-11T11:00:00Z","status":"scheduled"}"#,
    )
    .expect("write");

    let err = JsonlBookingSource::new(&path)
        .load_all()
        .expect_err("inverted booking should fail");
    assert!(format!("{err:#}").contains("starts after it ends"));
}
