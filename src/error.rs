//! # Error Types
//!
//! This module defines all error types for the earplay library.
//!
//! The error policy mirrors how the rest of the crate degrades: playback of
//! malformed content must never crash an activity, so most audio entry points
//! report failure through return values, and typed errors are reserved for
//! the places where the caller has to change course.
//!
//! ## Error Types
//! - `InvalidNote` - a note token failed the pitch grammar; the whole
//!   sequence it belongs to must be abandoned, not patched around
//! - `Audio` - the output device could not be opened or started
//! - `Persistence` - the progress blob could not be read or written
//!
//! ## Usage
//! ```rust
//! use earplay::{parse_note_token, EarplayError};
//!
//! match parse_note_token("H9", 500) {
//!     Ok(note) => println!("{:?}", note),
//!     Err(EarplayError::InvalidNote { token, reason }) => {
//!         eprintln!("bad token '{}': {}", token, reason);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EarplayError {
    /// A note token failed the pitch grammar.
    ///
    /// Scheduling a sequence containing such a token must abort the whole
    /// sequence; dropping a single note would desynchronize audio from the
    /// visual feedback driven by the per-note callbacks.
    ///
    /// # Example
    /// ```
    /// # use earplay::EarplayError;
    /// let err = EarplayError::InvalidNote {
    ///     token: "H9".to_string(),
    ///     reason: "pitch letter must be A-G".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid note token 'H9': pitch letter must be A-G");
    /// ```
    #[error("Invalid note token '{token}': {reason}")]
    InvalidNote { token: String, reason: String },

    /// The audio output device could not be opened or started.
    ///
    /// # Example
    /// ```
    /// # use earplay::EarplayError;
    /// let err = EarplayError::Audio("no output device found".to_string());
    /// assert_eq!(err.to_string(), "Audio error: no output device found");
    /// ```
    #[error("Audio error: {0}")]
    Audio(String),

    /// Reading or writing the persisted progress blob failed.
    ///
    /// Callers treat this as soft: reads fall back to empty progress and
    /// writes keep the in-memory value authoritative for the session.
    #[error("Progress persistence error: {0}")]
    Persistence(String),
}
