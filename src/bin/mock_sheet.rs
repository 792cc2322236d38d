//! Mock RSVP sheet HTTP server
//!
//! Stands in for the sheet read endpoint and the form write endpoint so the
//! CLI can be exercised locally.
//!
//! Endpoints:
//! - `GET /exec` - `{"GoogleSheetData": [[header...], [row...], ...]}`
//! - `POST /formResponse` - multipart form keyed by the configured field ids;
//!   appends one row stamped with the current time
//!
//! Behavior:
//! 1. Listens on configurable port (default 8787)
//! 2. New rows become readable only after `--visibility-delay-ms`, like the
//!    real sheet which lags behind the form
//! 3. `--read-status` forces the read endpoint to answer with another status
//!
//! Usage:
//!   cargo run --bin mock-sheet -- --port 8787 --seed 3

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use invite_rsvp::domain::guest::RowTable;
use invite_rsvp::infra::{Config, FormFields};
use invite_rsvp::io::sheet::SHEET_DATA_FIELD;
use multer::Multipart;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::net::TcpListener;

const SAMPLE_GUESTS: [(&str, &str, &str, &str); 4] = [
    ("Ana Cruz", "ana@example.com", "2", "So happy for you both!"),
    ("Ben Reyes", "ben@example.com", "1", ""),
    ("Carla Santos", "carla@example.com", "3", "We'll be there!"),
    ("Dan Lim", "dan@example.com", "1", "Congratulations"),
];

#[derive(Parser, Debug)]
#[command(name = "mock-sheet")]
#[command(about = "Mock RSVP sheet and form endpoints for local testing")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "8787")]
    port: u16,

    /// Config file providing the form field ids
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Delay before a submitted row shows up in reads (ms)
    #[arg(long, default_value = "1000")]
    visibility_delay_ms: u64,

    /// Number of sample rows to start with
    #[arg(long, default_value = "0")]
    seed: usize,

    /// Status code returned by the read endpoint
    #[arg(long, default_value = "200")]
    read_status: u16,
}

struct SheetState {
    table: Mutex<RowTable>,
    fields: FormFields,
    visibility_delay: Duration,
    read_status: StatusCode,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn seeded_table(count: usize) -> RowTable {
    let mut table = RowTable::with_standard_header();
    for &(name, email, guests, message) in SAMPLE_GUESTS.iter().cycle().take(count) {
        table.push_row(
            [now_rfc3339().as_str(), name, email, guests, message].iter().map(|s| s.to_string()).collect(),
        );
    }
    table
}

/// Named parts of a multipart body as (name, value) pairs; unnamed parts are skipped
async fn read_form_fields(body: Bytes, boundary: String) -> Result<Vec<(String, String)>, multer::Error> {
    let mut multipart = Multipart::with_reader(Cursor::new(body), boundary);
    let mut pairs = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        pairs.push((name, field.text().await?));
    }

    Ok(pairs)
}

/// Row in sheet column order built from the submitted form fields
fn row_from_pairs(fields: &FormFields, pairs: &[(String, String)], timestamp: String) -> Vec<String> {
    let value = |key: &str| {
        pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap_or_default()
    };
    vec![
        timestamp,
        value(&fields.name),
        value(&fields.email),
        value(&fields.guests),
        value(&fields.message),
    ]
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .expect("static response should not fail")
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<SheetState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::GET, "/exec") => {
            if state.read_status != StatusCode::OK {
                println!("[MOCK] Read -> {}", state.read_status);
                return Ok(text_response(state.read_status, "unavailable"));
            }
            let rows = state.table.lock().to_rows();
            println!("[MOCK] Read -> {} rows", rows.len());
            let body = serde_json::json!({ SHEET_DATA_FIELD: rows }).to_string();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::POST, "/formResponse") => {
            let boundary = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(|ct| multer::parse_boundary(ct).ok());
            let Some(boundary) = boundary else {
                return Ok(text_response(StatusCode::BAD_REQUEST, "expected multipart/form-data"));
            };
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    eprintln!("[MOCK] Failed to read body: {}", e);
                    return Ok(text_response(StatusCode::BAD_REQUEST, "unreadable body"));
                }
            };

            let pairs = match read_form_fields(body, boundary).await {
                Ok(pairs) => pairs,
                Err(e) => {
                    eprintln!("[MOCK] Bad multipart body: {}", e);
                    return Ok(text_response(StatusCode::BAD_REQUEST, "malformed multipart body"));
                }
            };
            let row = row_from_pairs(&state.fields, &pairs, now_rfc3339());
            println!("[MOCK] RSVP from {:?} ({} guests)", row[1], row[3]);

            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(state.visibility_delay).await;
                state.table.lock().push_row(row);
                println!("[MOCK] Row visible");
            });

            Ok(text_response(StatusCode::OK, "ok"))
        }
        _ => Ok(text_response(StatusCode::NOT_FOUND, "Not Found")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let state = Arc::new(SheetState {
        table: Mutex::new(seeded_table(args.seed)),
        fields: config.form_fields().clone(),
        visibility_delay: Duration::from_millis(args.visibility_delay_ms),
        read_status: StatusCode::from_u16(args.read_status)?,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;

    println!("[MOCK] Sheet listening on http://{}", addr);
    println!("[MOCK] Seeded {} rows, visibility delay {}ms", args.seed, args.visibility_delay_ms);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, state.clone()));
                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                eprintln!("[MOCK] HTTP error: {}", e);
                            }
                        });
                    }
                    Err(e) => eprintln!("[MOCK] Accept failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("[MOCK] Shutting down");
                return Ok(());
            }
        }
    }
}
