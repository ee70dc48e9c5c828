//! Typing animation
//!
//! A compiled tree is walked depth-first and turned into a sequence of timed
//! [`Step`]s: mount an element, start a text node, reveal one more character,
//! leave an element. Nothing here touches a display or a timer; a scheduler
//! ([`TypingAnimation`], or the blocking [`animate`] loop) decides when each
//! step is applied to a [`LiveDocument`].
//!
//! Steps are strictly sequential. A sibling never starts before its
//! predecessor has been fully revealed, so the total running time is fixed by
//! the tree: one `char_delay` per reveal step and one `paragraph_delay` after
//! every non-`br` element.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::document::LiveDocument;
use crate::markup::{Fragment, MarkupNode, Tag};

pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(18);
pub const DEFAULT_PARAGRAPH_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub char_delay: Duration,
    pub paragraph_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            char_delay: DEFAULT_CHAR_DELAY,
            paragraph_delay: DEFAULT_PARAGRAPH_DELAY,
        }
    }
}

/// One change to the live document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    /// Append an element to the current parent and descend into it
    Open {
        tag: Tag,
        attributes: Vec<(String, String)>,
    },
    /// Return to the parent element
    Close,
    /// Append an empty text node to the current parent
    BeginText,
    /// Set the current text node to this prefix of its source text
    Reveal(String),
    /// The whole tree has been rendered
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Wait before applying `command`, counted from the previous step
    pub delay: Duration,
    pub command: RenderCommand,
}

/// Reveal state of the text node being typed
#[derive(Debug)]
struct AnimationCursor {
    source_text: String,
    // Length (in chars) the next reveal step will show
    revealed_length: usize,
    byte_offset: usize,
    total: usize,
}

impl AnimationCursor {
    fn new(source_text: String) -> Self {
        let total = source_text.chars().count();
        Self {
            source_text,
            revealed_length: 0,
            byte_offset: 0,
            total,
        }
    }

    fn reveal_next(&mut self) -> Option<String> {
        if self.revealed_length > self.total {
            return None;
        }
        let prefix = self.source_text[..self.byte_offset].to_string();
        if let Some(c) = self.source_text[self.byte_offset..].chars().next() {
            self.byte_offset += c.len_utf8();
        }
        self.revealed_length += 1;
        Some(prefix)
    }
}

#[derive(Debug)]
enum Frame {
    Children {
        nodes: std::vec::IntoIter<MarkupNode>,
        // Pause after the element closes; `None` for the root fragment
        close: Option<Duration>,
    },
    Text(AnimationCursor),
}

enum Action {
    Reveal(String),
    Enter(MarkupNode),
    Leave(Option<Duration>),
    End,
}

/// The step sequence for one tree
#[derive(Debug)]
pub struct Steps {
    stack: Vec<Frame>,
    pending: Duration,
    timing: Timing,
    done: bool,
}

impl Steps {
    pub fn new(tree: Fragment, timing: Timing) -> Self {
        Self {
            stack: vec![Frame::Children {
                nodes: tree.children.into_iter(),
                close: None,
            }],
            pending: Duration::ZERO,
            timing,
            done: false,
        }
    }

    fn emit(&mut self, command: RenderCommand) -> Step {
        Step {
            delay: std::mem::take(&mut self.pending),
            command,
        }
    }
}

impl Iterator for Steps {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        loop {
            let action = match self.stack.last_mut() {
                None => Action::End,
                Some(Frame::Text(cursor)) => match cursor.reveal_next() {
                    Some(prefix) => Action::Reveal(prefix),
                    None => Action::Leave(None),
                },
                Some(Frame::Children { nodes, close }) => match nodes.next() {
                    Some(node) => Action::Enter(node),
                    None => Action::Leave(*close),
                },
            };

            match action {
                Action::End => {
                    if self.done {
                        return None;
                    }
                    self.done = true;
                    return Some(self.emit(RenderCommand::Finished));
                }
                Action::Reveal(prefix) => {
                    let step = self.emit(RenderCommand::Reveal(prefix));
                    self.pending = self.timing.char_delay;
                    return Some(step);
                }
                Action::Enter(MarkupNode::Text(text)) => {
                    self.stack.push(Frame::Text(AnimationCursor::new(text)));
                    return Some(self.emit(RenderCommand::BeginText));
                }
                Action::Enter(MarkupNode::Element {
                    tag,
                    attributes,
                    children,
                }) => {
                    // A line break has nothing to type and no pacing pause
                    let pause = if tag == Tag::Br {
                        Duration::ZERO
                    } else {
                        self.timing.paragraph_delay
                    };
                    self.stack.push(Frame::Children {
                        nodes: children.into_iter(),
                        close: Some(pause),
                    });
                    return Some(self.emit(RenderCommand::Open { tag, attributes }));
                }
                Action::Leave(close) => {
                    self.stack.pop();
                    if let Some(pause) = close {
                        let step = self.emit(RenderCommand::Close);
                        self.pending = pause;
                        return Some(step);
                    }
                }
            }
        }
    }
}

/// Time source for the scheduler
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually advanced clock; `sleep` just moves time forward
#[derive(Debug, Default)]
pub struct VirtualClock {
    nanos: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Shared cancellation flag for a running animation
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a poll did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub applied: usize,
    pub reveals: usize,
    pub finished: bool,
    pub cancelled: bool,
}

/// A typing animation driven by an external clock.
///
/// Due times are chained from the previous step's due time rather than from
/// when the poll happened, so a late poll catches up without stretching the
/// animation.
#[derive(Debug)]
pub struct TypingAnimation {
    steps: Steps,
    next: Option<Step>,
    mark: Duration,
    cancel: CancelHandle,
}

impl TypingAnimation {
    pub fn new(tree: Fragment, timing: Timing, now: Duration) -> Self {
        let mut steps = Steps::new(tree, timing);
        let next = steps.next();
        Self {
            steps,
            next,
            mark: now,
            cancel: CancelHandle::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    /// When the next step becomes due, or `None` once finished or cancelled
    pub fn next_due(&self) -> Option<Duration> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.next.as_ref().map(|step| self.mark + step.delay)
    }

    pub fn poll(&mut self, now: Duration, doc: &mut LiveDocument) -> Progress {
        self.poll_with(now, doc, |_, _| {})
    }

    /// Apply every step due at `now`, calling `on_step` after each one
    pub fn poll_with<F>(&mut self, now: Duration, doc: &mut LiveDocument, mut on_step: F) -> Progress
    where
        F: FnMut(&RenderCommand, &LiveDocument),
    {
        let mut progress = Progress::default();

        while !self.cancel.is_cancelled() {
            let Some(step) = self.next.take() else {
                break;
            };
            let due = self.mark + step.delay;
            if due > now {
                self.next = Some(step);
                break;
            }
            self.mark = due;
            self.apply(&step, doc, &mut progress);
            on_step(&step.command, doc);
            self.next = self.steps.next();
        }

        progress.cancelled = self.cancel.is_cancelled();
        progress.finished = self.next.is_none();
        progress
    }

    /// Apply everything that is left, ignoring the clock
    pub fn finish_now(&mut self, doc: &mut LiveDocument) -> Progress {
        let mut progress = Progress::default();
        while let Some(step) = self.next.take() {
            self.mark += step.delay;
            self.apply(&step, doc, &mut progress);
            self.next = self.steps.next();
        }
        progress.finished = true;
        progress
    }

    fn apply(&self, step: &Step, doc: &mut LiveDocument, progress: &mut Progress) {
        doc.apply(&step.command);
        progress.applied += 1;
        if matches!(step.command, RenderCommand::Reveal(_)) {
            progress.reveals += 1;
        }
    }
}

/// Render `tree` into `target` step by step, sleeping on `clock` between
/// steps, then call `on_complete`. Returns early without calling it if the
/// animation is cancelled through `cancel`.
pub fn animate<S, C>(
    tree: Fragment,
    target: &mut LiveDocument,
    clock: &dyn Clock,
    timing: Timing,
    cancel: Option<&CancelHandle>,
    mut on_step: S,
    on_complete: C,
) where
    S: FnMut(&RenderCommand, &LiveDocument),
    C: FnOnce(&LiveDocument),
{
    let mut animation = TypingAnimation::new(tree, timing, clock.now());
    if let Some(cancel) = cancel {
        animation.cancel = cancel.clone();
    }

    while let Some(due) = animation.next_due() {
        let now = clock.now();
        if due > now {
            clock.sleep(due - now);
        }
        animation.poll_with(clock.now(), target, &mut on_step);
    }

    if animation.is_finished() {
        on_complete(target);
    }
}
