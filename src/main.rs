//! invite-rsvp - RSVP and guest-book driver for the wedding invitation
//!
//! Reads the RSVP sheet, submits RSVPs to the form and plays the reveal
//! timelines in the terminal.
//!
//! Module structure:
//! - `domain/` - Guest rows, RSVP submissions, countdown
//! - `io/` - Sheet read endpoint and form write endpoint
//! - `services/` - Aggregator, RSVP service, views, sequencer, intro
//! - `infra/` - Config, Metrics

use anyhow::Context;
use clap::{Parser, Subcommand};
use invite_rsvp::domain::countdown::TimeLeft;
use invite_rsvp::domain::guest::{headcount_label, short_date};
use invite_rsvp::domain::rsvp::RsvpForm;
use invite_rsvp::infra::{Config, InvitationDetails, Metrics};
use invite_rsvp::io::{HttpFormWriter, HttpSheetReader};
use invite_rsvp::services::{
    mount_headcount, FetchOutcome, GuestAggregator, GuestBookState, GuestBookView, IntroSequence,
    IntroTiming, MessagePanel, RevealState, RsvpService,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// RSVP and guest-book tools for the wedding invitation
#[derive(Parser, Debug)]
#[command(name = "invite-rsvp", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the confirmed headcount
    Count,
    /// List guests, newest first
    Guests {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit an RSVP and show the refreshed headcount
    Rsvp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        message: String,
    },
    /// Play the intro splash
    Intro,
    /// Reveal the special message block by block
    Message,
    /// Time left until the ceremony
    Countdown {
        /// Keep ticking every second
        #[arg(long)]
        follow: bool,
    },
    /// Keep the headcount and guest book mounted; RSVP lines on stdin as `name,email,message`
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        read_url = %config.sheet_read_url(),
        submit_url = %config.form_submit_url(),
        settle_delay_ms = %config.settle_delay().as_millis(),
        git_hash = env!("GIT_HASH"),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());

    match args.command {
        Command::Count => count(&config, metrics).await,
        Command::Guests { json } => guests(&config, metrics, json).await,
        Command::Rsvp { name, email, message } => {
            rsvp(&config, metrics, RsvpForm::new(name, email, message)).await
        }
        Command::Intro => intro(&config).await,
        Command::Message => message(&config).await,
        Command::Countdown { follow } => countdown(&config, follow).await,
        Command::Watch => watch(&config, metrics).await,
    }
}

fn sheet_aggregator(
    config: &Config,
    metrics: Arc<Metrics>,
) -> anyhow::Result<GuestAggregator<HttpSheetReader>> {
    let reader = HttpSheetReader::new(config).context("Failed to build sheet client")?;
    Ok(GuestAggregator::new(reader, config.sheet_timeout(), metrics))
}

async fn count(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<ExitCode> {
    let aggregator = sheet_aggregator(config, metrics)?;

    match aggregator.fetch_guest_data().await {
        FetchOutcome::Ready(snapshot) => {
            println!("{}", headcount_label(snapshot.total_guests()));
            Ok(ExitCode::SUCCESS)
        }
        FetchOutcome::Failed { message } => {
            eprintln!("Guest count unavailable: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_guest_book(state: &GuestBookState) {
    match state {
        GuestBookState::Loading => println!("Loading guest list..."),
        GuestBookState::Failed { message } => println!("⚠ {message}"),
        GuestBookState::Empty => println!("No RSVPs yet. Be the first to respond!"),
        GuestBookState::Loaded { guests, total_guests } => {
            println!("{}", headcount_label(*total_guests));
            for guest in guests {
                let date = short_date(&guest.timestamp);
                println!("  [{:>2}] {:<28} {:>6}  x{}", guest.initials(), guest.name, date, guest.guests());
                if !guest.message.is_empty() {
                    println!("       \"{}\"", guest.message);
                }
            }
        }
    }
}

async fn guests(config: &Config, metrics: Arc<Metrics>, json: bool) -> anyhow::Result<ExitCode> {
    let aggregator = sheet_aggregator(config, metrics)?;
    let outcome = aggregator.fetch_guest_data().await;

    if json {
        if let Some(message) = outcome.error() {
            eprintln!("{message}");
            return Ok(ExitCode::FAILURE);
        }
        println!("{}", serde_json::to_string_pretty(outcome.guests())?);
        return Ok(ExitCode::SUCCESS);
    }

    let state = GuestBookState::from(outcome);
    print_guest_book(&state);
    Ok(if matches!(state, GuestBookState::Failed { .. }) { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

async fn rsvp(config: &Config, metrics: Arc<Metrics>, form: RsvpForm) -> anyhow::Result<ExitCode> {
    let aggregator = Arc::new(sheet_aggregator(config, metrics.clone())?);
    let writer = HttpFormWriter::new(config).context("Failed to build form client")?;
    let service = RsvpService::new(writer, metrics);

    let headcount = mount_headcount(aggregator, service.subscribe(), config.settle_delay());
    let mut counts = headcount.subscribe();
    // Initial read
    counts.changed().await.context("headcount view stopped")?;
    let before = *counts.borrow_and_update();

    if let Err(e) = service.submit(form).await {
        eprintln!("{}", e.user_message());
        return Ok(ExitCode::FAILURE);
    }
    println!("Thank you! Your RSVP has been sent.");

    let settle = config.settle_delay();
    println!("Refreshing guest count in {:.1}s...", settle.as_secs_f32());
    let wait = settle + config.sheet_timeout() + Duration::from_secs(1);
    match tokio::time::timeout(wait, counts.changed()).await {
        Ok(Ok(())) => match (before, *counts.borrow_and_update()) {
            (_, None) => println!("Guest count unavailable right now."),
            (Some(old), Some(new)) if new <= old => {
                println!("{} (your RSVP may take a moment to appear)", headcount_label(new))
            }
            (_, Some(new)) => println!("{}", headcount_label(new)),
        },
        _ => println!("Guest count unavailable right now."),
    }

    headcount.unmount();
    Ok(ExitCode::SUCCESS)
}

fn stage_text(stage: usize, details: &InvitationDetails) -> String {
    match stage {
        1 => "monogram".to_string(),
        2 => format!("{} & {}", details.groom, details.bride),
        3 => details.date.replace('\n', " · "),
        n => format!("stage {n}"),
    }
}

async fn intro(config: &Config) -> anyhow::Result<ExitCode> {
    let timing = IntroTiming::from_config(config);
    let (done_tx, mut done_rx) = oneshot::channel();
    let mut intro = IntroSequence::start(&timing, move || {
        let _ = done_tx.send(());
    })?;

    let mut states = intro.subscribe();
    let mut shown = RevealState::default();
    let details = config.invitation();
    let start = Instant::now();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                let at = start.elapsed().as_millis();
                for stage in shown.stage + 1..=state.stage {
                    println!("[{at:>5}ms] {}", stage_text(stage, details));
                }
                if state.exiting && !shown.exiting {
                    println!("[{at:>5}ms] fading out");
                }
                shown = state;
            }
            _ = &mut done_rx => {
                println!("[{:>5}ms] {} · {}", start.elapsed().as_millis(), details.location, details.rsvp_contact);
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                intro.cancel();
                info!("intro_cancelled");
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn message(config: &Config) -> anyhow::Result<ExitCode> {
    let mut panel = MessagePanel::from_config(config);
    let mut blocks = panel.subscribe();
    let details = config.invitation();
    let target = config.wedding_date()?;

    let start = Instant::now();
    panel.set_shown(true);

    for (name, visible) in blocks.iter_mut() {
        visible.wait_for(|v| *v).await.context("message panel dropped")?;
        let detail = match *name {
            "signature" => format!("With all our love, {} & {}", details.groom, details.bride),
            "countdown" => TimeLeft::until(target, OffsetDateTime::now_utc()).to_string(),
            _ => String::new(),
        };
        println!("[{:>5}ms] {name} {detail}", start.elapsed().as_millis());
    }

    Ok(ExitCode::SUCCESS)
}

async fn countdown(config: &Config, follow: bool) -> anyhow::Result<ExitCode> {
    let target = config.wedding_date()?;

    if !follow {
        println!("{}", TimeLeft::until(target, OffsetDateTime::now_utc()));
        return Ok(ExitCode::SUCCESS);
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let left = TimeLeft::until(target, OffsetDateTime::now_utc());
                println!("{left}");
                if left.is_zero() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_rsvp_line(line: &str) -> Option<RsvpForm> {
    let mut parts = line.splitn(3, ',').map(str::trim);
    let name = parts.next().filter(|s| !s.is_empty())?;
    let email = parts.next().unwrap_or_default();
    let message = parts.next().unwrap_or_default();
    Some(RsvpForm::new(name, email, message))
}

async fn watch(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<ExitCode> {
    let aggregator = Arc::new(sheet_aggregator(config, metrics.clone())?);
    let writer = HttpFormWriter::new(config).context("Failed to build form client")?;
    let service = RsvpService::new(writer, metrics.clone());

    let headcount = mount_headcount(aggregator.clone(), service.subscribe(), config.settle_delay());
    let mut book = GuestBookView::mount(
        aggregator,
        service.subscribe(),
        config.settle_delay(),
        config.overlay_exit(),
    );
    book.open();

    let mut counts = headcount.subscribe();
    tokio::spawn(async move {
        while counts.changed().await.is_ok() {
            let count = *counts.borrow_and_update();
            match count {
                Some(n) => println!("== {}", headcount_label(n)),
                None => println!("== guest count unknown"),
            }
        }
    });

    let mut pages = book.subscribe();
    tokio::spawn(async move {
        while pages.changed().await.is_ok() {
            let state = pages.borrow_and_update().clone();
            print_guest_book(&state);
        }
    });

    let metrics_interval = config.metrics_interval_secs().max(1);
    let reporter = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            reporter.report().log();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let Some(form) = parse_rsvp_line(&line) else {
                    continue;
                };
                match service.submit(form).await {
                    Ok(()) => println!("RSVP sent; refreshing in {:.1}s", config.settle_delay().as_secs_f32()),
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown_signal_received");
                break;
            }
        }
    }

    book.close();
    book.unmount();
    headcount.unmount();
    metrics.report().log();
    info!("invite-rsvp watch stopped");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rsvp_line() {
        let form = parse_rsvp_line("Ana Cruz, ana@example.com, See you, both!").unwrap();
        assert_eq!(form.name, "Ana Cruz");
        assert_eq!(form.email, "ana@example.com");
        assert_eq!(form.message, "See you, both!");

        let form = parse_rsvp_line("Ben").unwrap();
        assert_eq!(form.email, "");

        assert!(parse_rsvp_line("   ").is_none());
        assert!(parse_rsvp_line(",x@y").is_none());
    }

    #[test]
    fn test_stage_text() {
        let details = Config::default().invitation().clone();
        assert_eq!(stage_text(2, &details), "Ltryl & Noenyl");
        assert_eq!(stage_text(3, &details), "May 18, 2026 · Monday");
        assert_eq!(stage_text(9, &details), "stage 9");
    }
}
