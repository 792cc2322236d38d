//! Integration tests for reading and aggregating the guest sheet

mod common;

use async_trait::async_trait;
use common::{aggregator, row, FakeSheet, READ_TIMEOUT};
use invite_rsvp::domain::guest::RowTable;
use invite_rsvp::infra::Metrics;
use invite_rsvp::io::{decode_payload, RowSource, SheetError};
use invite_rsvp::services::{FetchOutcome, GuestAggregator};
use std::sync::Arc;

struct RawBody(&'static str);

#[async_trait]
impl RowSource for RawBody {
    async fn read(&self) -> Result<RowTable, SheetError> {
        decode_payload(self.0.as_bytes())
    }
}

struct NeverAnswers;

#[async_trait]
impl RowSource for NeverAnswers {
    async fn read(&self) -> Result<RowTable, SheetError> {
        std::future::pending().await
    }
}

fn names(outcome: &FetchOutcome) -> Vec<&str> {
    outcome.guests().iter().map(|g| g.name.as_str()).collect()
}

#[tokio::test]
async fn test_headcount_is_sum_of_guest_counts() {
    let sheet = FakeSheet::with_rows(&[
        row("2026-05-01T08:00:00Z", "Ana Cruz", "2"),
        row("2026-05-01T09:00:00Z", "Ben Reyes", ""),
        row("2026-05-01T10:00:00Z", "Carla Santos", "3 people"),
    ]);

    let outcome = aggregator(&sheet).fetch_guest_data().await;

    assert_eq!(outcome.headcount(), Some(6));
    assert_eq!(outcome.error(), None);
}

#[tokio::test]
async fn test_guests_are_newest_first() {
    let sheet = FakeSheet::with_rows(&[
        row("2026-05-01T08:00:00Z", "Ana Cruz", "2"),
        row("2026-05-01T09:00:00Z", "Ben Reyes", "1"),
        row("2026-05-01T10:00:00Z", "Carla Santos", "1"),
    ]);

    let outcome = aggregator(&sheet).fetch_guest_data().await;

    assert_eq!(names(&outcome), vec!["Carla Santos", "Ben Reyes", "Ana Cruz"]);
}

#[tokio::test]
async fn test_header_only_sheet_is_empty_not_failed() {
    let sheet = FakeSheet::with_rows(&[]);

    let outcome = aggregator(&sheet).fetch_guest_data().await;

    assert_eq!(outcome.headcount(), Some(0));
    assert!(outcome.guests().is_empty());

    let outcome = aggregator(&FakeSheet::with_table(RowTable::default())).fetch_guest_data().await;
    assert_eq!(outcome.headcount(), Some(0));
}

#[tokio::test]
async fn test_missing_sheet_data_reads_as_empty() {
    let aggregator = GuestAggregator::new(RawBody(r#"{"result":"ok"}"#), READ_TIMEOUT, Arc::new(Metrics::new()));

    let outcome = aggregator.fetch_guest_data().await;

    assert_eq!(outcome.headcount(), Some(0));
}

#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let aggregator = GuestAggregator::new(
        RawBody(r#"{"GoogleSheetData":"oops"}"#),
        READ_TIMEOUT,
        Arc::new(Metrics::new()),
    );

    let outcome = aggregator.fetch_guest_data().await;

    assert_eq!(outcome.headcount(), None);
    assert!(outcome.guests().is_empty());
    assert_eq!(outcome.error(), Some("Guest list response was malformed: GoogleSheetData is not an array"));
}

#[tokio::test]
async fn test_http_failure_is_reported_with_status() {
    let sheet = FakeSheet::with_rows(&[row("2026-05-01T08:00:00Z", "Ana Cruz", "2")]);
    sheet.fail_with(Some(503));

    let metrics = Arc::new(Metrics::new());
    let aggregator = GuestAggregator::new(sheet, READ_TIMEOUT, metrics.clone());
    let outcome = aggregator.fetch_guest_data().await;

    assert_eq!(outcome, FetchOutcome::Failed { message: "Failed to fetch guest list (HTTP 503)".to_string() });
    assert_eq!(metrics.report().fetch_failures_total, 1);
    assert_eq!(metrics.last_headcount(), None);
}

#[tokio::test(start_paused = true)]
async fn test_read_times_out() {
    let aggregator = GuestAggregator::new(NeverAnswers, READ_TIMEOUT, Arc::new(Metrics::new()));

    let outcome = aggregator.fetch_guest_data().await;

    assert_eq!(outcome.error(), Some("Guest list request timed out after 10s"));
}

#[tokio::test]
async fn test_fetch_is_idempotent_without_new_rows() {
    let sheet = FakeSheet::with_rows(&[
        row("2026-05-01T08:00:00Z", "Ana Cruz", "2"),
        row("2026-05-01T09:00:00Z", "Ben Reyes", "1"),
    ]);
    let aggregator = aggregator(&sheet);

    let first = aggregator.fetch_guest_data().await;
    let second = aggregator.fetch_guest_data().await;

    assert_eq!(first, second);
    assert_eq!(sheet.reads(), 2);
}

#[tokio::test]
async fn test_rows_are_matched_by_header_label() {
    let table = RowTable::from_rows(vec![
        vec!["Message".into(), "Full Name".into(), "Number Of Guests".into()],
        vec!["Hi!".into(), "Ana Cruz".into(), "4".into()],
        vec!["".into(), "   ".into()],
    ]);

    let outcome = aggregator(&FakeSheet::with_table(table)).fetch_guest_data().await;

    assert_eq!(outcome.headcount(), Some(5));
    assert_eq!(names(&outcome), vec!["Guest", "Ana Cruz"]);
    assert_eq!(outcome.guests()[1].message, "Hi!");
}
