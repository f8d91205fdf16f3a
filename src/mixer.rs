//! Active-note mixing.
//!
//! The mixer is the hand-off point between the engine (which decides what
//! should sound) and the output stream (which pulls rendered samples). It
//! keeps a flat list of currently sounding notes and sums them per frame;
//! there is no audio graph, the backend handles nothing beyond this list.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::voice::{Envelope, SampleData, Waveform};

/// Where a sounding note gets its raw signal from.
#[derive(Debug, Clone)]
pub enum NoteSource {
    /// Oscillator with a running phase in `[0, 1)`.
    Synth { waveform: Waveform, frequency: f32, phase: f32 },
    /// Pre-decoded sample buffer, read with linear interpolation.
    Sample { data: SampleData, position_s: f32, rate: f32 },
}

/// One sounding (or scheduled) note inside the mixer.
#[derive(Debug, Clone)]
pub struct ActiveNote {
    pub source: NoteSource,
    pub envelope: Envelope,
    /// Seconds until the note actually starts sounding.
    pub delay_s: f32,
    /// Audible length in seconds, envelope included.
    pub duration_s: f32,
    pub velocity: f32,
    pub gain: f32,
    elapsed_s: f32,
}

impl ActiveNote {
    pub fn new(
        source: NoteSource,
        envelope: Envelope,
        delay_s: f32,
        duration_s: f32,
        velocity: f32,
        gain: f32,
    ) -> Self {
        ActiveNote {
            source,
            envelope,
            delay_s,
            duration_s,
            velocity,
            gain,
            elapsed_s: 0.0,
        }
    }

    fn finished(&self) -> bool {
        self.elapsed_s - self.delay_s >= self.duration_s
    }

    /// Render one sample and advance the note by `dt` seconds.
    fn next_sample(&mut self, dt: f32) -> f32 {
        let t = self.elapsed_s - self.delay_s;
        self.elapsed_s += dt;
        if t < 0.0 || t >= self.duration_s {
            return 0.0;
        }

        let raw = match &mut self.source {
            NoteSource::Synth { waveform, frequency, phase } => {
                let value = waveform.sample(*phase);
                *phase = (*phase + *frequency * dt) % 1.0;
                value
            }
            NoteSource::Sample { data, position_s, rate } => {
                let value = interpolate_sample(data, *position_s, *rate);
                *position_s += dt;
                value
            }
        };

        raw * self.envelope.amplitude(t, self.duration_s) * self.velocity * self.gain
    }
}

/// Linear interpolation into a decoded sample buffer.
fn interpolate_sample(data: &SampleData, position_s: f32, rate: f32) -> f32 {
    let src_pos = position_s * data.sample_rate as f32 * rate;
    let src_idx = src_pos as usize;

    if src_idx >= data.samples.len() {
        return 0.0;
    }
    if src_idx < data.samples.len() - 1 {
        let frac = src_pos - src_idx as f32;
        let s1 = data.samples[src_idx];
        let s2 = data.samples[src_idx + 1];
        s1 * (1.0 - frac) + s2 * frac
    } else {
        data.samples[src_idx]
    }
}

/// Shared mixing state: the set of in-flight notes plus the output rate.
pub struct Mixer {
    sample_rate: AtomicU32,
    active: Mutex<Vec<ActiveNote>>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Arc<Mixer> {
        Arc::new(Mixer {
            sample_rate: AtomicU32::new(sample_rate),
            active: Mutex::new(Vec::new()),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Adopt the device rate once the output stream knows it.
    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    pub fn push(&self, note: ActiveNote) {
        self.active.lock().push(note);
    }

    /// Number of notes currently sounding or scheduled.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Drop every sounding and scheduled note.
    pub fn clear(&self) {
        self.active.lock().clear();
    }

    /// Render `out.len()` mono samples, advancing and retiring notes.
    pub fn render(&self, out: &mut [f32]) {
        let dt = 1.0 / self.sample_rate() as f32;
        let mut active = self.active.lock();

        for sample in out.iter_mut() {
            let mut mixed = 0.0;
            for note in active.iter_mut() {
                mixed += note.next_sample(dt);
            }
            *sample = mixed.clamp(-1.0, 1.0);
        }

        active.retain(|n| !n.finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_note(frequency: f32, duration_s: f32) -> ActiveNote {
        ActiveNote::new(
            NoteSource::Synth { waveform: Waveform::Sine, frequency, phase: 0.0 },
            Envelope { attack: 0.0, decay: 0.0, sustain: 1.0, release: 0.0 },
            0.0,
            duration_s,
            1.0,
            1.0,
        )
    }

    #[test]
    fn test_notes_retire_after_duration() {
        let mixer = Mixer::new(1000);
        mixer.push(synth_note(100.0, 0.05));
        assert_eq!(mixer.active_count(), 1);

        // 100 samples at 1kHz = 0.1s, past the 50ms note.
        let mut out = vec![0.0; 100];
        mixer.render(&mut out);
        assert_eq!(mixer.active_count(), 0);
        assert!(out.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn test_delayed_note_is_silent_until_start() {
        let mixer = Mixer::new(1000);
        let mut note = synth_note(250.0, 0.05);
        note.delay_s = 0.05;
        mixer.push(note);

        let mut first = vec![0.0; 50];
        mixer.render(&mut first);
        assert!(first.iter().all(|s| *s == 0.0));

        let mut second = vec![0.0; 50];
        mixer.render(&mut second);
        assert!(second.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn test_clear_stops_everything() {
        let mixer = Mixer::new(1000);
        mixer.push(synth_note(100.0, 10.0));
        mixer.push(synth_note(200.0, 10.0));
        mixer.clear();
        assert_eq!(mixer.active_count(), 0);
    }
}
