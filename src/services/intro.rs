//! Intro splash and the staggered special-message panel
//!
//! The splash reveals the monogram, the names and the date in three stages,
//! fades out, then signals completion so the card can replace it.

use crate::infra::config::Config;
use crate::services::sequencer::{FadeIn, Sequencer, Timeline, TimelineError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Progress of the splash. Fields only ever move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevealState {
    pub stage: usize,
    pub exiting: bool,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroTiming {
    pub stage_offsets: Vec<Duration>,
    pub exit: Duration,
    pub complete: Duration,
}

impl Default for IntroTiming {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl IntroTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stage_offsets: config.intro_stage_offsets(),
            exit: config.intro_exit(),
            complete: config.intro_complete(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stage_offsets.len()
    }

    fn timeline(&self, state: &Arc<watch::Sender<RevealState>>) -> Timeline {
        let mut timeline = Timeline::new();
        for (i, offset) in self.stage_offsets.iter().enumerate() {
            let state = state.clone();
            let stage = i + 1;
            timeline = timeline.at(*offset, move || {
                state.send_modify(|s| s.stage = s.stage.max(stage));
                debug!(stage = stage, "intro_stage_revealed");
            });
        }

        let exiting = state.clone();
        let complete = state.clone();
        timeline
            .at(self.exit, move || {
                exiting.send_modify(|s| s.exiting = true);
                debug!("intro_exiting");
            })
            .at(self.complete, move || complete.send_modify(|s| s.complete = true))
    }
}

/// A running splash. Dropping it cancels any stage not yet reached.
pub struct IntroSequence {
    state: Arc<watch::Sender<RevealState>>,
    sequencer: Sequencer,
}

impl IntroSequence {
    pub fn start(
        timing: &IntroTiming,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Result<Self, TimelineError> {
        let (state, _) = watch::channel(RevealState::default());
        let state = Arc::new(state);

        let mut sequencer = Sequencer::new();
        sequencer.run(timing.timeline(&state), on_complete)?;
        Ok(Self { state, sequencer })
    }

    pub fn state(&self) -> RevealState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RevealState> {
        self.state.subscribe()
    }

    pub fn cancel(&mut self) {
        self.sequencer.cancel();
    }
}

/// Blocks of the special message, in reveal order
pub const MESSAGE_BLOCKS: [&str; 8] = [
    "header",
    "invitation_note",
    "blessing",
    "question",
    "formal_invitation",
    "signature",
    "countdown",
    "rsvp",
];

/// Special message panel: each block fades in one step after the previous
pub struct MessagePanel {
    blocks: Vec<(&'static str, FadeIn)>,
}

impl MessagePanel {
    pub fn new(step: Duration) -> Self {
        let blocks = MESSAGE_BLOCKS
            .iter()
            .zip(1u32..)
            .map(|(&name, n)| (name, FadeIn::new(step * n)))
            .collect();
        Self { blocks }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fade_step())
    }

    pub fn set_shown(&mut self, shown: bool) {
        for (_, fade) in &mut self.blocks {
            fade.set_shown(shown);
        }
    }

    /// Names of blocks currently visible, in reveal order
    pub fn visible_blocks(&self) -> Vec<&'static str> {
        self.blocks.iter().filter(|(_, f)| f.is_visible()).map(|(name, _)| *name).collect()
    }

    pub fn is_fully_visible(&self) -> bool {
        self.blocks.iter().all(|(_, f)| f.is_visible())
    }

    /// One receiver per block, paired with its name
    pub fn subscribe(&self) -> Vec<(&'static str, watch::Receiver<bool>)> {
        self.blocks.iter().map(|(name, f)| (*name, f.subscribe())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn sleep_then_settle(n: u64) {
        tokio::time::sleep(ms(n)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_intro_stages_advance_on_schedule() {
        let completions = Arc::new(AtomicUsize::new(0));
        let done = completions.clone();
        let intro = IntroSequence::start(&IntroTiming::default(), move || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert_eq!(intro.state(), RevealState::default());

        sleep_then_settle(1001).await;
        assert_eq!(intro.state().stage, 1);

        sleep_then_settle(2000).await; // 3001
        assert_eq!(intro.state().stage, 2);

        sleep_then_settle(2000).await; // 5001
        assert_eq!(intro.state(), RevealState { stage: 3, exiting: false, complete: false });

        sleep_then_settle(5000).await; // 10001
        assert!(intro.state().exiting);
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        sleep_then_settle(2000).await; // 12001
        assert!(intro.state().complete);
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        sleep_then_settle(10_000).await;
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intro_unmounted_mid_sequence() {
        let completions = Arc::new(AtomicUsize::new(0));
        let done = completions.clone();
        let intro = IntroSequence::start(&IntroTiming::default(), move || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let rx = intro.subscribe();

        sleep_then_settle(4000).await;
        assert_eq!(intro.state().stage, 2);
        drop(intro);

        sleep_then_settle(20_000).await;
        assert_eq!(*rx.borrow(), RevealState { stage: 2, exiting: false, complete: false });
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_intro_rejects_bad_timing() {
        let timing = IntroTiming { stage_offsets: vec![ms(100)], exit: ms(50), complete: ms(200) };
        assert!(matches!(
            IntroSequence::start(&timing, || {}),
            Err(TimelineError::NotIncreasing { index: 1, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_panel_staggers_blocks() {
        let mut panel = MessagePanel::new(ms(200));
        panel.set_shown(true);

        sleep_then_settle(201).await;
        assert_eq!(panel.visible_blocks(), vec!["header"]);

        sleep_then_settle(400).await; // 601
        assert_eq!(panel.visible_blocks(), vec!["header", "invitation_note", "blessing"]);

        sleep_then_settle(1000).await; // 1601
        assert!(panel.is_fully_visible());

        panel.set_shown(false);
        assert!(panel.visible_blocks().is_empty());
    }
}
