//! Instrument voices.
//!
//! A voice is the sound-producing backend for one instrument timbre: either
//! a synthesized preset (oscillator + ADSR) or a bank of pre-recorded
//! samples. Sample banks load on a background thread and share their load
//! state process-wide, so several voice instances of the same instrument
//! (one per free-play button, say) agree on readiness.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};

use crate::mixer::{ActiveNote, NoteSource};
use crate::note::{midi_to_frequency, note_name_to_midi};

/// Oscillator shape for synthesized voices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at a phase in `[0.0, 1.0)`.
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Square => {
                if phase % 1.0 < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => (phase % 1.0) * 2.0 - 1.0,
            Waveform::Triangle => {
                let p = phase % 1.0;
                if p < 0.5 {
                    p * 4.0 - 1.0
                } else {
                    3.0 - p * 4.0
                }
            }
        }
    }
}

/// ADSR envelope, all segments in seconds except `sustain` (a level).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    /// Amplitude at `t` seconds into a note of the given total duration.
    pub fn amplitude(&self, t: f32, duration: f32) -> f32 {
        let attack_end = self.attack;
        let decay_end = attack_end + self.decay;
        let release_start = (duration - self.release).max(decay_end);

        if t < attack_end {
            t / attack_end
        } else if t < decay_end {
            let progress = (t - attack_end) / self.decay;
            1.0 - progress * (1.0 - self.sustain)
        } else if t < release_start || self.release <= 0.0 {
            self.sustain
        } else {
            let progress = ((t - release_start) / self.release).min(1.0);
            self.sustain * (1.0 - progress)
        }
    }
}

/// The instrument timbres an activity can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceKind {
    Default,
    Piano,
    Marimba,
    Violin,
    Flute,
    Tuba,
    Doublebass,
    Bell,
}

impl VoiceKind {
    pub fn from_name(name: &str) -> Option<VoiceKind> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(VoiceKind::Default),
            "piano" => Some(VoiceKind::Piano),
            "marimba" => Some(VoiceKind::Marimba),
            "violin" => Some(VoiceKind::Violin),
            "flute" => Some(VoiceKind::Flute),
            // Brass requests map onto the tuba preset.
            "tuba" | "brass" => Some(VoiceKind::Tuba),
            "doublebass" => Some(VoiceKind::Doublebass),
            "bell" => Some(VoiceKind::Bell),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoiceKind::Default => "default",
            VoiceKind::Piano => "piano",
            VoiceKind::Marimba => "marimba",
            VoiceKind::Violin => "violin",
            VoiceKind::Flute => "flute",
            VoiceKind::Tuba => "tuba",
            VoiceKind::Doublebass => "doublebass",
            VoiceKind::Bell => "bell",
        }
    }

    /// Whether this timbre is backed by recorded samples.
    pub fn is_sampled(&self) -> bool {
        matches!(self, VoiceKind::Piano)
    }
}

/// Oscillator + envelope preset for one synthesized timbre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub waveform: Waveform,
    pub envelope: Envelope,
    /// Semitone offset applied before synthesis (tuba and doublebass sound
    /// an octave below the written pitch).
    pub detune_semitones: f32,
    pub gain: f32,
}

impl SynthConfig {
    pub fn for_kind(kind: VoiceKind) -> SynthConfig {
        match kind {
            VoiceKind::Default => SynthConfig {
                waveform: Waveform::Triangle,
                envelope: Envelope { attack: 0.01, decay: 0.1, sustain: 0.3, release: 0.5 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
            // Stand-in while the sampled piano loads.
            VoiceKind::Piano => SynthConfig {
                waveform: Waveform::Triangle,
                envelope: Envelope { attack: 0.004, decay: 0.2, sustain: 0.2, release: 1.5 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
            VoiceKind::Marimba => SynthConfig {
                waveform: Waveform::Sine,
                envelope: Envelope { attack: 0.01, decay: 0.3, sustain: 0.0, release: 0.8 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
            VoiceKind::Violin => SynthConfig {
                waveform: Waveform::Triangle,
                envelope: Envelope { attack: 0.2, decay: 0.1, sustain: 0.5, release: 0.8 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
            VoiceKind::Flute => SynthConfig {
                waveform: Waveform::Sine,
                envelope: Envelope { attack: 0.1, decay: 0.2, sustain: 0.4, release: 0.8 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
            VoiceKind::Tuba => SynthConfig {
                waveform: Waveform::Square,
                envelope: Envelope { attack: 0.2, decay: 0.3, sustain: 0.4, release: 0.8 },
                detune_semitones: -12.0,
                gain: 0.8,
            },
            VoiceKind::Doublebass => SynthConfig {
                waveform: Waveform::Sawtooth,
                envelope: Envelope { attack: 0.1, decay: 0.3, sustain: 0.8, release: 1.5 },
                detune_semitones: -12.0,
                gain: 1.0,
            },
            VoiceKind::Bell => SynthConfig {
                waveform: Waveform::Triangle,
                envelope: Envelope { attack: 0.002, decay: 0.5, sustain: 0.1, release: 1.2 },
                detune_semitones: 0.0,
                gain: 1.0,
            },
        }
    }
}

/// A decoded, mono sample buffer.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

/// Note -> filename map for the sampled piano.
pub const PIANO_SAMPLE_FILES: [(&str, &str); 7] = [
    ("C4", "C4.wav"),
    ("D4", "D4.wav"),
    ("E4", "E4.wav"),
    ("F4", "F4.wav"),
    ("G4", "G4.wav"),
    ("A4", "A4.wav"),
    ("B4", "B4.wav"),
];

struct BankState {
    buffers: HashMap<String, SampleData>,
    complete: bool,
}

/// A shared bank of decoded samples for one instrument.
///
/// Cloning a bank shares its state; readiness flips to true only once every
/// file in the map has been decoded. Missing or corrupt files leave the bank
/// permanently incomplete and playback falls back per call-site strictness.
#[derive(Clone)]
pub struct SampleBank {
    state: Arc<RwLock<BankState>>,
}

impl SampleBank {
    /// Start loading the given note -> filename map from `base_dir` on a
    /// background thread and return immediately.
    pub fn load(base_dir: &Path, files: &[(&str, &str)]) -> SampleBank {
        let bank = SampleBank {
            state: Arc::new(RwLock::new(BankState { buffers: HashMap::new(), complete: false })),
        };

        let state = Arc::clone(&bank.state);
        let jobs: Vec<(String, PathBuf)> = files
            .iter()
            .map(|(note, file)| (note.to_string(), base_dir.join(file)))
            .collect();

        thread::spawn(move || {
            let expected = jobs.len();
            for (note, path) in jobs {
                if let Some(data) = decode_wav(&path) {
                    state.write().buffers.insert(note, data);
                }
            }
            let mut state = state.write();
            if state.buffers.len() == expected {
                state.complete = true;
            }
        });

        bank
    }

    /// Build a bank from already-decoded buffers (preloading, tests).
    pub fn from_buffers(buffers: HashMap<String, SampleData>, complete: bool) -> SampleBank {
        SampleBank {
            state: Arc::new(RwLock::new(BankState { buffers, complete })),
        }
    }

    /// True global load completion: every file in the map decoded.
    pub fn is_ready(&self) -> bool {
        self.state.read().complete
    }

    /// Sampled note nearest to `midi`, with its MIDI number for rate math.
    fn nearest(&self, midi: u8) -> Option<(u8, SampleData)> {
        let state = self.state.read();
        state
            .buffers
            .iter()
            .filter_map(|(name, data)| note_name_to_midi(name).map(|m| (m, data)))
            .min_by_key(|(m, _)| (*m as i32 - midi as i32).abs())
            .map(|(m, data)| (m, data.clone()))
    }
}

/// Decode a WAV file to a normalized mono buffer. Best-effort: any failure
/// yields `None` and the bank simply never completes.
fn decode_wav(path: &Path) -> Option<SampleData> {
    let mut reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()
            .ok()?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .ok()?,
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Some(SampleData { samples: Arc::new(mono), sample_rate: spec.sample_rate })
}

// One bank per (kind, directory) for the whole process, so every voice
// instance of the same instrument shares buffers and load state.
static BANKS: Mutex<Vec<((VoiceKind, PathBuf), SampleBank)>> = Mutex::new(Vec::new());

fn shared_bank(kind: VoiceKind, base_dir: &Path) -> SampleBank {
    let key = (kind, base_dir.to_path_buf());
    let mut banks = BANKS.lock();
    if let Some((_, bank)) = banks.iter().find(|(k, _)| *k == key) {
        return bank.clone();
    }
    let bank = SampleBank::load(base_dir, &PIANO_SAMPLE_FILES);
    banks.push((key, bank.clone()));
    bank
}

/// Policy for a sampled voice that has not finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Never substitute: skip the note silently until samples are ready.
    /// Memory-style games depend on exact timbre and prefer silence.
    Exact,
    /// Substitute the voice's synth preset while loading.
    AllowFallback,
}

enum VoiceSource {
    Synth(SynthConfig),
    Sampled(SampleBank),
}

/// One instrument timbre, ready to mint mixer notes.
pub struct Voice {
    kind: VoiceKind,
    source: VoiceSource,
    fallback: SynthConfig,
}

// Envelope applied on top of recorded samples; the recording carries its own
// decay, so only the edges are shaped.
const SAMPLE_ENVELOPE: Envelope =
    Envelope { attack: 0.002, decay: 0.0, sustain: 1.0, release: 0.15 };

impl Voice {
    /// Create a voice. Sampled kinds start background loading from
    /// `sample_dir`; without a directory they run on their synth preset.
    pub fn new(kind: VoiceKind, sample_dir: Option<&Path>) -> Voice {
        let source = match (kind.is_sampled(), sample_dir) {
            (true, Some(dir)) => VoiceSource::Sampled(shared_bank(kind, dir)),
            _ => VoiceSource::Synth(SynthConfig::for_kind(kind)),
        };
        Voice { kind, source, fallback: SynthConfig::for_kind(kind) }
    }

    /// Voice backed by a caller-supplied bank (preloaded assets, tests).
    pub fn with_bank(kind: VoiceKind, bank: SampleBank) -> Voice {
        Voice { kind, source: VoiceSource::Sampled(bank), fallback: SynthConfig::for_kind(kind) }
    }

    pub fn kind(&self) -> VoiceKind {
        self.kind
    }

    /// Synth voices are always ready; sampled voices only once their shared
    /// bank finished loading every file.
    pub fn is_ready(&self) -> bool {
        match &self.source {
            VoiceSource::Synth(_) => true,
            VoiceSource::Sampled(bank) => bank.is_ready(),
        }
    }

    /// Build a mixer note for a MIDI pitch, or `None` when a not-ready
    /// sampled voice is asked to play under [`Strictness::Exact`].
    pub fn make_note(
        &self,
        midi: u8,
        duration_s: f32,
        delay_s: f32,
        velocity: f32,
        strictness: Strictness,
    ) -> Option<ActiveNote> {
        match &self.source {
            VoiceSource::Synth(config) => {
                Some(synth_note(*config, midi, duration_s, delay_s, velocity))
            }
            VoiceSource::Sampled(bank) => {
                if bank.is_ready() {
                    if let Some((sample_midi, data)) = bank.nearest(midi) {
                        let rate = 2f32.powf((midi as f32 - sample_midi as f32) / 12.0);
                        return Some(ActiveNote::new(
                            NoteSource::Sample { data, position_s: 0.0, rate },
                            SAMPLE_ENVELOPE,
                            delay_s,
                            duration_s,
                            velocity,
                            1.0,
                        ));
                    }
                }
                match strictness {
                    Strictness::Exact => None,
                    Strictness::AllowFallback => {
                        Some(synth_note(self.fallback, midi, duration_s, delay_s, velocity))
                    }
                }
            }
        }
    }
}

fn synth_note(
    config: SynthConfig,
    midi: u8,
    duration_s: f32,
    delay_s: f32,
    velocity: f32,
) -> ActiveNote {
    let frequency = midi_to_frequency(midi) * 2f32.powf(config.detune_semitones / 12.0);
    ActiveNote::new(
        NoteSource::Synth { waveform: config.waveform, frequency, phase: 0.0 },
        config.envelope,
        delay_s,
        duration_s,
        velocity,
        config.gain,
    )
}
