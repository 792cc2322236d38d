//! Read endpoint for the RSVP sheet
//!
//! The sheet is published as JSON: `{ "GoogleSheetData": [[header...], [row...], ...] }`.
//! Requests always bypass caches so a fresh headcount is read after each RSVP.

use crate::domain::guest::RowTable;
use crate::infra::config::Config;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Field holding the row arrays in the read payload
pub const SHEET_DATA_FIELD: &str = "GoogleSheetData";

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("Could not reach the guest list: {0}")]
    Transport(String),
    #[error("Failed to fetch guest list (HTTP {0})")]
    Status(u16),
    #[error("Guest list response was malformed: {0}")]
    Malformed(String),
    #[error("Guest list request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

/// Anything that can produce the current row table
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn read(&self) -> Result<RowTable, SheetError>;
}

/// Decode the read payload.
///
/// A missing or null data field is an empty table. Anything else that is not
/// an array of row arrays is malformed. Non-string cells are rendered as text.
pub fn decode_payload(body: &[u8]) -> Result<RowTable, SheetError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SheetError::Malformed(format!("invalid JSON: {e}")))?;

    let Value::Object(map) = value else {
        return Err(SheetError::Malformed("expected a JSON object".to_string()));
    };

    match map.get(SHEET_DATA_FIELD) {
        None | Some(Value::Null) => Ok(RowTable::default()),
        Some(Value::Array(rows)) => {
            let rows = rows
                .iter()
                .enumerate()
                .map(|(i, row)| match row {
                    Value::Array(cells) => Ok(cells.iter().map(cell_text).collect()),
                    _ => Err(SheetError::Malformed(format!("row {i} is not an array"))),
                })
                .collect::<Result<Vec<Vec<String>>, _>>()?;
            Ok(RowTable::from_rows(rows))
        }
        Some(_) => Err(SheetError::Malformed(format!("{SHEET_DATA_FIELD} is not an array"))),
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// HTTP GET against the published sheet
pub struct HttpSheetReader {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSheetReader {
    pub fn new(config: &Config) -> Result<Self, SheetError> {
        let timeout = config.sheet_timeout();
        // Create HTTP client once for reuse (connection pooling)
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetError::Transport(e.to_string()))?;

        Ok(Self { url: config.sheet_read_url().to_string(), timeout, client })
    }

    fn map_error(&self, e: reqwest::Error) -> SheetError {
        if e.is_timeout() {
            SheetError::Timeout(self.timeout)
        } else {
            SheetError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl RowSource for HttpSheetReader {
    async fn read(&self) -> Result<RowTable, SheetError> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        debug!(
            bytes = body.len(),
            latency_us = %start.elapsed().as_micros(),
            "sheet_payload_received"
        );

        decode_payload(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rows() {
        let body = br#"{"GoogleSheetData":[
            ["Timestamp","Full Name","Email","Number Of Guests","Message"],
            ["2026-01-01T00:00:00Z","Ana","ana@x","2","Yay"]
        ]}"#;
        let table = decode_payload(body).unwrap();

        assert_eq!(table.header()[1], "Full Name");
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0][3], "2");
    }

    #[test]
    fn test_decode_non_string_cells() {
        let body = br#"{"GoogleSheetData":[["Full Name","Number Of Guests"],["Ana",3],[null,true]]}"#;
        let table = decode_payload(body).unwrap();

        assert_eq!(table.rows()[0], vec!["Ana".to_string(), "3".to_string()]);
        assert_eq!(table.rows()[1], vec![String::new(), "true".to_string()]);
    }

    #[test]
    fn test_decode_missing_field_is_empty() {
        assert!(decode_payload(br#"{}"#).unwrap().is_empty());
        assert!(decode_payload(br#"{"GoogleSheetData":null}"#).unwrap().is_empty());
        assert!(decode_payload(br#"{"GoogleSheetData":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_decode_malformed() {
        for body in [
            &br#"{"GoogleSheetData":"nope"}"#[..],
            &br#"{"GoogleSheetData":[["h"],"row"]}"#[..],
            &br#"[["h"]]"#[..],
            &b"<html>error</html>"[..],
        ] {
            let err = decode_payload(body).unwrap_err();
            assert!(matches!(err, SheetError::Malformed(_)), "{err:?}");
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(SheetError::Status(503).to_string(), "Failed to fetch guest list (HTTP 503)");
        assert_eq!(
            SheetError::Timeout(Duration::from_secs(10)).to_string(),
            "Guest list request timed out after 10s"
        );
    }
}
