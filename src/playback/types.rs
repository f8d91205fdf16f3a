//! Playback option and handle types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Base quarter-note duration when a sequence does not bring its own.
pub const DEFAULT_QUARTER_MS: u64 = 700;

/// The one contract the sequence player needs from the audio side.
///
/// [`AudioEngine`](crate::engine::AudioEngine) implements it for real
/// playback; tests substitute a recording mock.
pub trait NotePlayer: Send + Sync {
    /// Trigger one note now. Returns whether anything will sound.
    fn play_note(&self, pitch: &str, duration_s: f32, velocity: f32) -> bool;
}

/// Callback invoked as each element starts or ends. The first argument is
/// the (possibly `prepare_note`-mapped) token label, `None` for rests; the
/// second is the element index.
pub type NoteCallback = Box<dyn FnMut(Option<&str>, usize) + Send>;

/// Options for one [`SequencePlayer::play`](super::SequencePlayer::play) run.
pub struct SequenceOptions {
    /// Length of a quarter note in milliseconds.
    pub base_quarter_ms: u64,
    /// Velocity for every triggered note.
    pub velocity: f32,
    /// Maps a token to the label reported by the note callbacks (UI ids
    /// such as `sound_c4`). The engine always receives the parsed pitch.
    pub prepare_note: Option<Box<dyn Fn(&str) -> String + Send>>,
    pub on_note_start: Option<NoteCallback>,
    pub on_note_end: Option<NoteCallback>,
    /// Fires exactly once, after the last element plus a small buffer.
    /// Never fires for cancelled runs.
    pub on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl SequenceOptions {
    pub fn new() -> SequenceOptions {
        SequenceOptions {
            base_quarter_ms: DEFAULT_QUARTER_MS,
            velocity: 0.75,
            prepare_note: None,
            on_note_start: None,
            on_note_end: None,
            on_complete: None,
        }
    }

    pub fn quarter_ms(mut self, ms: u64) -> Self {
        self.base_quarter_ms = ms;
        self
    }

    pub fn velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn prepare_note(mut self, f: impl Fn(&str) -> String + Send + 'static) -> Self {
        self.prepare_note = Some(Box::new(f));
        self
    }

    pub fn on_note_start(mut self, f: impl FnMut(Option<&str>, usize) + Send + 'static) -> Self {
        self.on_note_start = Some(Box::new(f));
        self
    }

    pub fn on_note_end(mut self, f: impl FnMut(Option<&str>, usize) + Send + 'static) -> Self {
        self.on_note_end = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl Default for SequenceOptions {
    fn default() -> Self {
        SequenceOptions::new()
    }
}

/// Shared control handle for one scheduled sequence.
///
/// Cloning shares the underlying flags; `cancel` may be called any number
/// of times from any thread.
#[derive(Clone)]
pub struct SequenceHandle {
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl SequenceHandle {
    pub(crate) fn new() -> SequenceHandle {
        SequenceHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for a run that completed before it needed scheduling.
    pub(crate) fn completed() -> SequenceHandle {
        let handle = SequenceHandle::new();
        handle.finished.store(true, Ordering::SeqCst);
        handle
    }

    /// Abort the pending schedule. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the run completed normally (its `on_complete` has fired).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Still scheduled: neither cancelled nor complete.
    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && !self.is_finished()
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}
