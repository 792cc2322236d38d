//! Reveal sequencer - one-shot timelines of timed visibility transitions
//!
//! Every step of a timeline is its own timer, armed at start against an
//! absolute deadline (`start + offset`). Steps are guarded by a generation
//! counter: cancelling bumps the generation under the same lock a step holds
//! while it fires, so once `cancel` returns no step of the old run can fire.
//!
//! Actions run while that lock is held and must not call back into the
//! sequencer that owns them.
//!
//! `run` must be called from within a tokio runtime.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type Action = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline has no steps")]
    Empty,
    #[error("step {index} at {offset:?} does not come after {previous:?}")]
    NotIncreasing { index: usize, offset: Duration, previous: Duration },
}

struct Step {
    offset: Duration,
    action: Action,
}

/// Ordered `(offset, action)` pairs
#[derive(Default)]
pub struct Timeline {
    steps: Vec<Step>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, offset: Duration, action: impl FnOnce() + Send + 'static) -> Self {
        self.steps.push(Step { offset, action: Box::new(action) });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Offset of the last step, where completion fires
    pub fn final_offset(&self) -> Option<Duration> {
        self.steps.last().map(|s| s.offset)
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.steps.is_empty() {
            return Err(TimelineError::Empty);
        }
        for (index, pair) in self.steps.windows(2).enumerate() {
            if pair[1].offset <= pair[0].offset {
                return Err(TimelineError::NotIncreasing {
                    index: index + 1,
                    offset: pair[1].offset,
                    previous: pair[0].offset,
                });
            }
        }
        Ok(())
    }
}

/// Owner of one running timeline at a time.
///
/// Starting a new run cancels the previous one. Dropping the sequencer
/// cancels whatever is pending.
pub struct Sequencer {
    generation: Arc<Mutex<u64>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self { generation: Arc::new(Mutex::new(0)), tasks: Vec::new() }
    }

    /// Arm every step of `timeline`; `on_complete` fires once, right after the
    /// final step, unless cancelled first
    pub fn run(
        &mut self,
        timeline: Timeline,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Result<(), TimelineError> {
        timeline.validate()?;
        self.arm(timeline.steps, Some(Box::new(on_complete)));
        Ok(())
    }

    /// Single-step run used by fade-ins and overlays
    pub fn once(&mut self, delay: Duration, action: impl FnOnce() + Send + 'static) {
        self.arm(vec![Step { offset: delay, action: Box::new(action) }], None);
    }

    /// Cancel every pending step of the current run
    pub fn cancel(&mut self) {
        *self.generation.lock() += 1;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// True while any step of the current run has not fired
    pub fn is_pending(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    fn arm(&mut self, steps: Vec<Step>, mut on_complete: Option<Action>) {
        self.cancel();
        let epoch = *self.generation.lock();
        let start = Instant::now();
        let last = steps.len().saturating_sub(1);

        for (i, step) in steps.into_iter().enumerate() {
            let generation = self.generation.clone();
            let completion = if i == last { on_complete.take() } else { None };
            let deadline = start + step.offset;

            self.tasks.push(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                let current = generation.lock();
                if *current != epoch {
                    return;
                }
                (step.action)();
                if let Some(done) = completion {
                    done();
                }
            }));
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Shows content a fixed delay after it is asked to; hides it at once
pub struct FadeIn {
    delay: Duration,
    shown: bool,
    visible: Arc<watch::Sender<bool>>,
    sequencer: Sequencer,
}

impl FadeIn {
    pub fn new(delay: Duration) -> Self {
        let (visible, _) = watch::channel(false);
        Self { delay, shown: false, visible: Arc::new(visible), sequencer: Sequencer::new() }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }

    pub fn set_shown(&mut self, shown: bool) {
        if shown == self.shown {
            return;
        }
        self.shown = shown;

        if shown {
            let visible = self.visible.clone();
            self.sequencer.once(self.delay, move || {
                visible.send_replace(true);
            });
        } else {
            self.sequencer.cancel();
            self.visible.send_replace(false);
        }
    }
}

/// Keeps an overlay mounted through its exit animation
pub struct Presence {
    exit_delay: Duration,
    open: bool,
    present: Arc<watch::Sender<bool>>,
    sequencer: Sequencer,
}

impl Presence {
    pub fn new(exit_delay: Duration) -> Self {
        let (present, _) = watch::channel(false);
        Self { exit_delay, open: false, present: Arc::new(present), sequencer: Sequencer::new() }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_present(&self) -> bool {
        *self.present.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.present.subscribe()
    }

    pub fn set_open(&mut self, open: bool) {
        if open == self.open {
            return;
        }
        self.open = open;

        if open {
            self.sequencer.cancel();
            self.present.send_replace(true);
        } else {
            let present = self.present.clone();
            self.sequencer.once(self.exit_delay, move || {
                present.send_replace(false);
            });
        }
    }
}
