//! The sequence scheduling loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::types::{NotePlayer, SequenceHandle, SequenceOptions};
use crate::error::EarplayError;
use crate::note::{parse_sequence, ProcessedNote};

/// Pause after the last element before `on_complete`, so the final note is
/// not cut off audibly by whatever the completion handler does.
const COMPLETION_BUFFER_MS: u64 = 60;

/// Cancellation poll interval while waiting out a note.
const CANCEL_POLL_MS: u64 = 5;

/// Plays token sequences one at a time.
///
/// A player owns at most one scheduled continuation. Calling
/// [`play`](SequencePlayer::play) while a previous run is pending cancels
/// that run first, so overlapping melodies cannot happen per player.
pub struct SequencePlayer {
    engine: Arc<dyn NotePlayer>,
    context: String,
    current: Mutex<Option<SequenceHandle>>,
}

impl SequencePlayer {
    /// `context` labels this player's sequences (activity id, `"demo"`...).
    pub fn new(engine: Arc<dyn NotePlayer>, context: impl Into<String>) -> SequencePlayer {
        SequencePlayer { engine, context: context.into(), current: Mutex::new(None) }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Schedule `tokens` for playback.
    ///
    /// All tokens are parsed up front; an invalid pitch aborts the whole
    /// request (the previous run keeps playing) so that audio and visual
    /// feedback can never drift apart mid-melody. An empty sequence
    /// completes immediately.
    ///
    /// # Errors
    /// [`EarplayError::InvalidNote`] when any token fails the grammar.
    pub fn play<S: AsRef<str>>(
        &self,
        tokens: &[S],
        options: SequenceOptions,
    ) -> Result<SequenceHandle, EarplayError> {
        let notes = parse_sequence(tokens, options.base_quarter_ms)?;

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        if notes.is_empty() {
            let mut options = options;
            if let Some(on_complete) = options.on_complete.take() {
                on_complete();
            }
            let handle = SequenceHandle::completed();
            *current = Some(handle.clone());
            return Ok(handle);
        }

        let handle = SequenceHandle::new();
        *current = Some(handle.clone());

        let engine = Arc::clone(&self.engine);
        let thread_handle = handle.clone();
        thread::spawn(move || run_sequence(engine, notes, options, thread_handle));

        Ok(handle)
    }

    /// Cancel the pending run, if any.
    pub fn stop(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.cancel();
        }
    }

    /// Whether a run is still scheduled.
    pub fn is_playing(&self) -> bool {
        self.current.lock().as_ref().map(|h| h.is_active()).unwrap_or(false)
    }
}

impl Drop for SequencePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_sequence(
    engine: Arc<dyn NotePlayer>,
    notes: Vec<ProcessedNote>,
    mut options: SequenceOptions,
    handle: SequenceHandle,
) {
    for (index, note) in notes.iter().enumerate() {
        if handle.is_cancelled() {
            return;
        }

        let label = if note.is_rest {
            None
        } else {
            Some(match &options.prepare_note {
                Some(prepare) => prepare(&note.token),
                None => note.token.clone(),
            })
        };

        if let Some(on_start) = options.on_note_start.as_mut() {
            on_start(label.as_deref(), index);
        }

        if let Some(pitch) = &note.pitch {
            engine.play_note(pitch, note.duration_ms as f32 / 1000.0, options.velocity);
        }

        if !wait_cancellable(note.duration_ms, &handle) {
            return;
        }

        if let Some(on_end) = options.on_note_end.as_mut() {
            on_end(label.as_deref(), index);
        }
    }

    if !wait_cancellable(COMPLETION_BUFFER_MS, &handle) {
        return;
    }

    handle.mark_finished();
    if let Some(on_complete) = options.on_complete.take() {
        on_complete();
    }
}

/// Sleep for `ms`, waking early on cancellation. Returns `false` when the
/// run was cancelled mid-wait.
fn wait_cancellable(ms: u64, handle: &SequenceHandle) -> bool {
    let deadline = Instant::now() + Duration::from_millis(ms);
    loop {
        if handle.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let remaining = deadline - now;
        thread::sleep(remaining.min(Duration::from_millis(CANCEL_POLL_MS)));
    }
}
