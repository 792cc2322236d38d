//! Mounted views over the guest data
//!
//! Each view owns its own copy of the data and its own task. The task fetches,
//! listens for `RsvpSubmitted`, and re-fetches a settle delay after every
//! notification. Each notification arms its own refresh; a later one never
//! pushes back an earlier one. Unmounting (or dropping) a view aborts the
//! task, including any fetch in flight and any pending refresh.

use crate::domain::guest::GuestEntry;
use crate::io::sheet::RowSource;
use crate::services::aggregator::{FetchOutcome, GuestAggregator};
use crate::services::rsvp::RsvpSubmitted;
use crate::services::sequencer::Presence;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// State published by a running view task
pub struct MountedView<T> {
    state: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T: Clone> MountedView<T> {
    pub fn current(&self) -> T {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.state.clone()
    }

    pub fn unmount(self) {
        // Drop aborts the task.
    }
}

impl<T> Drop for MountedView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Refresh deadlines, one per notification
///
/// The settle delay is fixed, so deadlines arrive in order and the earliest
/// is always at the front.
#[derive(Debug, Default)]
struct RefreshQueue {
    due: VecDeque<Instant>,
}

impl RefreshQueue {
    fn schedule(&mut self, settle_delay: Duration) {
        self.due.push_back(Instant::now() + settle_delay);
    }

    fn is_empty(&self) -> bool {
        self.due.is_empty()
    }

    /// Sleep until the earliest deadline and remove it, or forever when none is set
    async fn next_due(&mut self) {
        match self.due.front() {
            Some(&at) => {
                tokio::time::sleep_until(at).await;
                self.due.pop_front();
            }
            None => std::future::pending().await,
        }
    }
}

/// Aggregate headcount for the card. None means unknown, never zero.
pub fn mount_headcount<S: RowSource + 'static>(
    aggregator: Arc<GuestAggregator<S>>,
    mut events: broadcast::Receiver<RsvpSubmitted>,
    settle_delay: Duration,
) -> MountedView<Option<u32>> {
    let (tx, state) = watch::channel(None);

    let task = tokio::spawn(async move {
        tx.send_replace(aggregator.fetch_guest_data().await.headcount());

        let mut refreshes = RefreshQueue::default();
        let mut listening = true;
        while listening || !refreshes.is_empty() {
            tokio::select! {
                event = events.recv(), if listening => match event {
                    Ok(RsvpSubmitted) | Err(RecvError::Lagged(_)) => {
                        refreshes.schedule(settle_delay);
                        debug!(view = "headcount", "refresh_scheduled");
                    }
                    Err(RecvError::Closed) => listening = false,
                },
                _ = refreshes.next_due() => {
                    tx.send_replace(aggregator.fetch_guest_data().await.headcount());
                }
            }
        }
    });

    MountedView { state, task }
}

/// What the guest book shows; exactly one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestBookState {
    Loading,
    Failed { message: String },
    Empty,
    Loaded { guests: Vec<GuestEntry>, total_guests: u32 },
}

impl From<FetchOutcome> for GuestBookState {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Failed { message } => GuestBookState::Failed { message },
            FetchOutcome::Ready(snapshot) if snapshot.is_empty() => GuestBookState::Empty,
            FetchOutcome::Ready(snapshot) => {
                let total_guests = snapshot.total_guests();
                GuestBookState::Loaded { guests: snapshot.into_guests(), total_guests }
            }
        }
    }
}

/// Guest-book overlay: fetches when opened and refreshes only while open
pub struct GuestBookView {
    open: watch::Sender<bool>,
    presence: Presence,
    view: MountedView<GuestBookState>,
}

impl GuestBookView {
    pub fn mount<S: RowSource + 'static>(
        aggregator: Arc<GuestAggregator<S>>,
        mut events: broadcast::Receiver<RsvpSubmitted>,
        settle_delay: Duration,
        exit_delay: Duration,
    ) -> Self {
        let (open_tx, mut open_rx) = watch::channel(false);
        let (tx, state) = watch::channel(GuestBookState::Loading);

        let task = tokio::spawn(async move {
            let mut refreshes = RefreshQueue::default();
            let mut listening = true;
            loop {
                tokio::select! {
                    changed = open_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *open_rx.borrow_and_update() {
                            tx.send_replace(GuestBookState::Loading);
                            tx.send_replace(aggregator.fetch_guest_data().await.into());
                        }
                    }
                    event = events.recv(), if listening => match event {
                        Ok(RsvpSubmitted) | Err(RecvError::Lagged(_)) => {
                            if *open_rx.borrow() {
                                refreshes.schedule(settle_delay);
                                debug!(view = "guest_book", "refresh_scheduled");
                            }
                        }
                        Err(RecvError::Closed) => listening = false,
                    },
                    _ = refreshes.next_due() => {
                        if *open_rx.borrow() {
                            tx.send_replace(aggregator.fetch_guest_data().await.into());
                        }
                    }
                }
            }
        });

        Self {
            open: open_tx,
            presence: Presence::new(exit_delay),
            view: MountedView { state, task },
        }
    }

    pub fn open(&mut self) {
        self.set_open(true);
    }

    pub fn close(&mut self) {
        self.set_open(false);
    }

    fn set_open(&mut self, open: bool) {
        if *self.open.borrow() == open {
            return;
        }
        info!(open = open, "guest_book_toggled");
        self.presence.set_open(open);
        self.open.send_replace(open);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    /// Still on screen, including the exit animation after close
    pub fn is_present(&self) -> bool {
        self.presence.is_present()
    }

    pub fn state(&self) -> GuestBookState {
        self.view.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuestBookState> {
        self.view.subscribe()
    }

    pub fn unmount(self) {}
}
