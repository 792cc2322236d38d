//! In-memory sheet and form used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use invite_rsvp::domain::guest::RowTable;
use invite_rsvp::domain::rsvp::RsvpSubmission;
use invite_rsvp::infra::Metrics;
use invite_rsvp::io::{FormError, RowSource, RsvpSink, SheetError};
use invite_rsvp::services::GuestAggregator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const SETTLE: Duration = Duration::from_millis(2000);
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct SheetState {
    table: RowTable,
    fail_status: Option<u16>,
    reads: usize,
}

/// Shared sheet: the fake form writes rows the fake reader serves
#[derive(Clone, Default)]
pub struct FakeSheet {
    inner: Arc<Mutex<SheetState>>,
}

impl FakeSheet {
    pub fn with_rows(rows: &[[&str; 5]]) -> Self {
        let sheet = Self::default();
        {
            let mut state = sheet.inner.lock();
            state.table = RowTable::with_standard_header();
            for row in rows {
                state.table.push_row(row.iter().map(|c| c.to_string()).collect());
            }
        }
        sheet
    }

    pub fn with_table(table: RowTable) -> Self {
        let sheet = Self::default();
        sheet.inner.lock().table = table;
        sheet
    }

    pub fn reads(&self) -> usize {
        self.inner.lock().reads
    }

    pub fn fail_with(&self, status: Option<u16>) {
        self.inner.lock().fail_status = status;
    }

    pub fn append(&self, row: Vec<String>) {
        self.inner.lock().table.push_row(row);
    }
}

#[async_trait]
impl RowSource for FakeSheet {
    async fn read(&self) -> Result<RowTable, SheetError> {
        let mut state = self.inner.lock();
        state.reads += 1;
        match state.fail_status {
            Some(status) => Err(SheetError::Status(status)),
            None => Ok(state.table.clone()),
        }
    }
}

/// Form that lands rows in the sheet straight away
pub struct FakeForm {
    sheet: FakeSheet,
    fail: bool,
    writes: Mutex<usize>,
}

impl FakeForm {
    pub fn new(sheet: &FakeSheet) -> Self {
        Self { sheet: sheet.clone(), fail: false, writes: Mutex::new(0) }
    }

    pub fn failing(sheet: &FakeSheet) -> Self {
        Self { fail: true, ..Self::new(sheet) }
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl RsvpSink for FakeForm {
    async fn write(&self, submission: &RsvpSubmission) -> Result<(), FormError> {
        *self.writes.lock() += 1;
        if self.fail {
            return Err(FormError::Transport("connection refused".to_string()));
        }
        self.sheet.append(vec![
            "2026-05-01T09:00:00Z".to_string(),
            submission.name().to_string(),
            submission.email().to_string(),
            submission.guests().to_string(),
            submission.message().to_string(),
        ]);
        Ok(())
    }
}

pub fn row<'a>(timestamp: &'a str, name: &'a str, guests: &'a str) -> [&'a str; 5] {
    [timestamp, name, "guest@example.com", guests, ""]
}

pub fn aggregator(sheet: &FakeSheet) -> Arc<GuestAggregator<FakeSheet>> {
    Arc::new(GuestAggregator::new(sheet.clone(), READ_TIMEOUT, Arc::new(Metrics::new())))
}

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward, then settle
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}
