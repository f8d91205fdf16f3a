//! The audio engine.
//!
//! Owns the active [`Voice`], turns pitch strings into mixer notes, and is
//! the single stop/cleanup point for everything that sounds. Activities
//! remain responsive on malformed content: invalid pitches make the play
//! methods return `false`, they never panic or error.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::EarplayError;
use crate::mixer::Mixer;
use crate::note::{normalize_pitch, note_name_to_midi};
use crate::playback::NotePlayer;
use crate::voice::{Strictness, Voice, VoiceKind};

/// Construction parameters for [`AudioEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Mixing rate until an output stream adopts the device rate.
    pub sample_rate: u32,
    /// Directory holding sample assets for sampled voices (piano). With
    /// `None`, sampled voices run on their synth preset.
    pub sample_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { sample_rate: 44_100, sample_dir: None }
    }
}

/// Short fixed note figures used as answer feedback, bypassing the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialEffect {
    /// Ascending four-note arpeggio played on a correct answer.
    Success,
    /// Falling two-note figure played on a wrong answer.
    TryAgain,
}

impl SpecialEffect {
    pub fn from_name(name: &str) -> Option<SpecialEffect> {
        match name {
            "success" => Some(SpecialEffect::Success),
            "try_again" => Some(SpecialEffect::TryAgain),
            _ => None,
        }
    }

    fn notes(&self) -> (&'static [(&'static str, f32)], f32) {
        match self {
            SpecialEffect::Success => {
                (&[("C4", 0.15), ("E4", 0.15), ("G4", 0.15), ("C5", 0.4)], 0.9)
            }
            SpecialEffect::TryAgain => (&[("E4", 0.25), ("C4", 0.5)], 0.8),
        }
    }
}

/// Options for [`AudioEngine::play_chord`].
#[derive(Debug, Clone, Copy)]
pub struct ChordOptions {
    pub duration_s: f32,
    pub velocity: f32,
}

impl Default for ChordOptions {
    fn default() -> Self {
        ChordOptions { duration_s: 2.0, velocity: 0.7 }
    }
}

struct EngineState {
    initialized: bool,
    voice: Voice,
    sample_dir: Option<PathBuf>,
}

/// Central audio component: one active voice, one mixer, one stop switch.
pub struct AudioEngine {
    mixer: Arc<Mixer>,
    state: Mutex<EngineState>,
}

impl AudioEngine {
    pub fn new(config: EngineConfig) -> AudioEngine {
        let voice = Voice::new(VoiceKind::Default, config.sample_dir.as_deref());
        AudioEngine {
            mixer: Mixer::new(config.sample_rate),
            state: Mutex::new(EngineState {
                initialized: false,
                voice,
                sample_dir: config.sample_dir,
            }),
        }
    }

    /// One-time setup. Idempotent and safe to call repeatedly.
    ///
    /// The browser-style audio unlock is modelled as this explicit gate:
    /// every `play_*` call before `initialize` is a silent no-op returning
    /// `false`, mirroring an engine waiting for its first user interaction.
    pub fn initialize(&self) -> Result<(), EarplayError> {
        self.state.lock().initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Switch the active voice, disposing the previous one.
    pub fn use_voice(&self, kind: VoiceKind) {
        let mut state = self.state.lock();
        if state.voice.kind() != kind {
            let sample_dir = state.sample_dir.clone();
            state.voice = Voice::new(kind, sample_dir.as_deref());
        }
    }

    /// Switch by instrument name; unknown names fall back to the default
    /// synth rather than failing.
    pub fn use_voice_named(&self, name: &str) {
        self.use_voice(VoiceKind::from_name(name).unwrap_or(VoiceKind::Default));
    }

    pub fn current_voice(&self) -> VoiceKind {
        self.state.lock().voice.kind()
    }

    /// Readiness of the active voice (sample banks load in the background).
    pub fn voice_ready(&self) -> bool {
        self.state.lock().voice.is_ready()
    }

    /// Play one note on the active voice. Returns `false` on malformed
    /// pitches, before initialization, or when a not-ready sampled voice is
    /// held to [`Strictness::Exact`].
    pub fn play_note(&self, pitch: &str, duration_s: f32, velocity: f32) -> bool {
        self.trigger(pitch, duration_s, 0.0, velocity, Strictness::AllowFallback)
    }

    /// Full-control variant: select the voice, delay the start, and choose
    /// the not-ready policy explicitly.
    pub fn play_note_as(
        &self,
        kind: VoiceKind,
        pitch: &str,
        duration_s: f32,
        start_delay_s: f32,
        velocity: f32,
        strictness: Strictness,
    ) -> bool {
        self.use_voice(kind);
        self.trigger(pitch, duration_s, start_delay_s, velocity, strictness)
    }

    fn trigger(
        &self,
        pitch: &str,
        duration_s: f32,
        delay_s: f32,
        velocity: f32,
        strictness: Strictness,
    ) -> bool {
        let state = self.state.lock();
        if !state.initialized {
            return false;
        }
        let midi = match normalize_pitch(pitch).ok().and_then(|p| note_name_to_midi(&p)) {
            Some(m) => m,
            None => return false,
        };
        match state.voice.make_note(midi, duration_s, delay_s, velocity, strictness) {
            Some(note) => {
                self.mixer.push(note);
                true
            }
            None => false,
        }
    }

    /// Play several pitches simultaneously. Stops prior sound first so
    /// chords never overlap; invalid members are skipped.
    pub fn play_chord<S: AsRef<str>>(&self, pitches: &[S], options: ChordOptions) -> bool {
        if !self.is_initialized() || pitches.is_empty() {
            return false;
        }
        self.stop_all();

        let mut any = false;
        for pitch in pitches {
            if self.trigger(
                pitch.as_ref(),
                options.duration_s,
                0.0,
                options.velocity,
                Strictness::AllowFallback,
            ) {
                any = true;
            }
        }
        any
    }

    /// Play a feedback figure. Stops prior sound first.
    pub fn play_special_effect(&self, effect: SpecialEffect) {
        if !self.is_initialized() {
            return;
        }
        self.stop_all();

        let (notes, velocity) = effect.notes();
        let mut delay = 0.0;
        for (pitch, duration) in notes {
            self.trigger(pitch, *duration, delay, velocity, Strictness::AllowFallback);
            delay += duration;
        }
    }

    /// Release everything sounding or scheduled. Safe when idle.
    pub fn stop_all(&self) {
        self.mixer.clear();
    }

    /// Dispose the active voice and all engine resources (app
    /// backgrounding). A later [`initialize`](Self::initialize) restores
    /// the engine.
    pub fn cleanup(&self) {
        self.stop_all();
        let mut state = self.state.lock();
        let sample_dir = state.sample_dir.clone();
        state.voice = Voice::new(VoiceKind::Default, sample_dir.as_deref());
        state.initialized = false;
    }

    /// Shared mixer handle for attaching an output stream.
    pub fn mixer(&self) -> Arc<Mixer> {
        Arc::clone(&self.mixer)
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        AudioEngine::new(EngineConfig::default())
    }
}

impl NotePlayer for AudioEngine {
    fn play_note(&self, pitch: &str, duration_s: f32, velocity: f32) -> bool {
        AudioEngine::play_note(self, pitch, duration_s, velocity)
    }
}

/// [`NotePlayer`] adapter that pins a voice and refuses fallback timbres.
///
/// Memory-style games depend on hearing the exact instrument; while its
/// samples load, notes are skipped silently instead of substituted.
pub struct StrictVoicePlayer {
    engine: Arc<AudioEngine>,
    kind: VoiceKind,
}

impl StrictVoicePlayer {
    pub fn new(engine: Arc<AudioEngine>, kind: VoiceKind) -> StrictVoicePlayer {
        StrictVoicePlayer { engine, kind }
    }
}

impl NotePlayer for StrictVoicePlayer {
    fn play_note(&self, pitch: &str, duration_s: f32, velocity: f32) -> bool {
        self.engine
            .play_note_as(self.kind, pitch, duration_s, 0.0, velocity, Strictness::Exact)
    }
}
