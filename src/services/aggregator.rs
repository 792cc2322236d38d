//! Guest aggregator - reads the sheet and derives list + headcount
//!
//! Every failure is captured here and turned into state; callers never see an
//! error value, only an outcome with a message.

use crate::domain::guest::{GuestEntry, GuestSnapshot};
use crate::infra::metrics::Metrics;
use crate::io::sheet::{RowSource, SheetError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Ready(GuestSnapshot),
    Failed { message: String },
}

impl FetchOutcome {
    /// Aggregate headcount; None when the read failed
    pub fn headcount(&self) -> Option<u32> {
        match self {
            FetchOutcome::Ready(snapshot) => Some(snapshot.total_guests()),
            FetchOutcome::Failed { .. } => None,
        }
    }

    /// Guests newest-first; empty when the read failed
    pub fn guests(&self) -> &[GuestEntry] {
        match self {
            FetchOutcome::Ready(snapshot) => snapshot.guests(),
            FetchOutcome::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Ready(_) => None,
            FetchOutcome::Failed { message } => Some(message),
        }
    }
}

pub struct GuestAggregator<S> {
    source: S,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl<S: RowSource> GuestAggregator<S> {
    pub fn new(source: S, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self { source, timeout, metrics }
    }

    /// Read the sheet once and aggregate it
    pub async fn fetch_guest_data(&self) -> FetchOutcome {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.source.read()).await {
            Ok(result) => result,
            Err(_) => Err(SheetError::Timeout(self.timeout)),
        };
        let latency_us = start.elapsed().as_micros() as u64;

        match result {
            Ok(table) => {
                let snapshot = GuestSnapshot::from_table(&table, OffsetDateTime::now_utc());
                self.metrics.record_fetch(latency_us, snapshot.total_guests());
                info!(
                    entries = snapshot.guests().len(),
                    total_guests = snapshot.total_guests(),
                    latency_us = %latency_us,
                    "guest_fetch_completed"
                );
                FetchOutcome::Ready(snapshot)
            }
            Err(e) => {
                self.metrics.record_fetch_failure(latency_us);
                warn!(error = %e, latency_us = %latency_us, "guest_fetch_failed");
                FetchOutcome::Failed { message: e.to_string() }
            }
        }
    }
}
