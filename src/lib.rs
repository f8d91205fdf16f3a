pub mod chords;
pub mod engine;
pub mod error;
pub mod melodies;
pub mod mixer;
pub mod note;
pub mod output;
pub mod playback;
pub mod progress;
pub mod session;
pub mod voice;

pub use chords::{generate_chord, pick_next, transpose_chord, ChordKind, ChordSelection};
pub use engine::{AudioEngine, ChordOptions, EngineConfig, SpecialEffect, StrictVoicePlayer};
pub use error::EarplayError;
pub use melodies::{find_melody, Melody, PatternKind};
pub use note::{parse_note_token, parse_sequence, ProcessedNote};
pub use playback::{NotePlayer, SequenceHandle, SequenceOptions, SequencePlayer};
pub use progress::{JsonFileBackend, MemoryBackend, ProgressBackend, ProgressStore};
pub use session::{AnswerOutcome, ChordGameSession, JudgmentSession, MatchSoundsSession};
pub use voice::{SampleBank, Strictness, Voice, VoiceKind};

/// Schedule a melody on a player at the melody's own tempo.
/// This is the main entry point for plain "play this tune" callers.
pub fn play_melody(
    player: &SequencePlayer,
    melody: &Melody,
) -> Result<SequenceHandle, EarplayError> {
    player.play(
        melody.notes,
        SequenceOptions::new().quarter_ms(melody.quarter_note_ms),
    )
}
