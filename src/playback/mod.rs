//! # Playback Module
//!
//! Timed, cancellable playback of note-token sequences.
//!
//! ## Purpose
//! Every listening activity ultimately does the same thing: hand a token
//! array to a player, light up UI per note, and find out when the melody is
//! over. This module is that one shared player, parameterized by callbacks
//! instead of being re-implemented per activity.
//!
//! ## Sub-modules
//! - `types` - options, handles, and the `NotePlayer` seam
//! - `player` - the `SequencePlayer` scheduling loop
//!
//! ## Key Types
//! - [`SequencePlayer`] - owns at most one in-flight sequence; starting a
//!   new one cancels the previous one first
//! - [`SequenceHandle`] - shared cancellation/completion flag pair, the
//!   "cancel function" returned to the caller
//! - [`SequenceOptions`] - base quarter-note duration, velocity, and the
//!   per-note / completion callbacks
//! - [`NotePlayer`] - the one-method trait the player drives; implemented
//!   by [`AudioEngine`](crate::engine::AudioEngine) and by test mocks
//!
//! ## Guarantees
//! - Notes play strictly in order; each scheduled start is at least the
//!   previous start plus the previous duration.
//! - `on_complete` fires exactly once per non-cancelled run, after the last
//!   note's duration plus a small buffer.
//! - Cancellation is idempotent and clears the pending schedule.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use earplay::engine::AudioEngine;
//! use earplay::playback::{SequenceOptions, SequencePlayer};
//!
//! let engine = Arc::new(AudioEngine::default());
//! engine.initialize().unwrap();
//!
//! let player = SequencePlayer::new(engine, "demo");
//! let handle = player
//!     .play(&["C4", "E4", "G4:h"], SequenceOptions::new().quarter_ms(500))
//!     .unwrap();
//! // ... later:
//! handle.cancel();
//! ```

mod player;
mod types;


pub use player::SequencePlayer;
pub use types::{NotePlayer, SequenceHandle, SequenceOptions, DEFAULT_QUARTER_MS};
