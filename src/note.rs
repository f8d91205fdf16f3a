//! Note tokens, pitch math, and duration parsing.
//!
//! A note token is a compact string such as `"C4"`, `"F#3:h"` or `"r:e"`:
//! a pitch in scientific notation (octave optional, defaults to 4) or a
//! rest marker `r`, optionally followed by `:` and a duration modifier.
//! Durations are expressed as multiples of a base quarter-note length so
//! that every melody can carry its own tempo.

use crate::error::EarplayError;

/// Chromatic scale note names, sharps only.
///
/// Transposition output always uses this spelling; flats are accepted on
/// input and normalized away.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single parsed element of a note sequence.
///
/// Created per-token when a sequence starts playing, consumed once by the
/// sequence player, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedNote {
    /// The original token, kept for callbacks and diagnostics.
    pub token: String,
    /// Canonical pitch (e.g. `"C#4"`), `None` for rests.
    pub pitch: Option<String>,
    /// Scheduled length in milliseconds.
    pub duration_ms: u64,
    /// Whether this element is silent.
    pub is_rest: bool,
}

/// Convert a MIDI note number to a note name with octave (C4 = 60).
///
/// # Example
/// ```
/// use earplay::note::midi_to_note_name;
///
/// assert_eq!(midi_to_note_name(60), "C4");
/// assert_eq!(midi_to_note_name(36), "C2");
/// assert_eq!(midi_to_note_name(61), "C#4");
/// ```
pub fn midi_to_note_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    let name = NOTE_NAMES[(midi % 12) as usize];
    format!("{}{}", name, octave)
}

/// Convert a note name (e.g. `"C4"`, `"Bb3"`) to its MIDI number.
///
/// Returns `None` if the name fails the pitch grammar.
pub fn note_name_to_midi(name: &str) -> Option<u8> {
    let canonical = normalize_pitch(name).ok()?;
    let mut chars = canonical.chars();
    let letter = chars.next()?;
    let mut offset: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut next = chars.next()?;
    if next == '#' {
        offset += 1;
        next = chars.next()?;
    } else if next == 'b' {
        offset -= 1;
        next = chars.next()?;
    }
    let octave = next.to_digit(10)? as i32;
    let midi = (octave + 1) * 12 + offset;
    u8::try_from(midi).ok()
}

/// Frequency in Hz for a MIDI note number, A4 = 440 Hz equal temperament.
pub fn midi_to_frequency(midi: u8) -> f32 {
    440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0)
}

/// Transpose a note name by a number of semitones, wrapping the octave.
///
/// Invalid names pass through unchanged so that content errors degrade to
/// an untransposed note instead of breaking a whole chord.
///
/// # Example
/// ```
/// use earplay::note::transpose_note;
///
/// assert_eq!(transpose_note("C4", 13), "C#5");
/// assert_eq!(transpose_note("C4", -1), "B3");
/// ```
pub fn transpose_note(name: &str, semitones: i8) -> String {
    if semitones == 0 {
        return name.to_string();
    }
    match note_name_to_midi(name) {
        Some(midi) => {
            let shifted = midi as i32 + semitones as i32;
            match u8::try_from(shifted) {
                Ok(m) if m <= 127 => midi_to_note_name(m),
                _ => name.to_string(),
            }
        }
        None => name.to_string(),
    }
}

/// Whether a string is a playable pitch (after normalization).
pub fn is_valid_pitch(name: &str) -> bool {
    normalize_pitch(name).is_ok()
}

/// Normalize a pitch string to canonical `[A-G][#b]?[0-8]` form.
///
/// Accepts lowercase letters, UI event prefixes (`pitch_`, `sound_`), and
/// octaveless names (octave 4 is appended). Anything else is rejected.
pub fn normalize_pitch(raw: &str) -> Result<String, EarplayError> {
    let stripped = raw
        .trim()
        .trim_start_matches("pitch_")
        .trim_start_matches("sound_");
    if stripped.is_empty() {
        return Err(invalid(raw, "empty pitch"));
    }

    let mut chars = stripped.chars();
    let letter = chars.next().unwrap_or(' ').to_ascii_uppercase();
    if !('A'..='G').contains(&letter) {
        return Err(invalid(raw, "pitch letter must be A-G"));
    }

    let mut canonical = String::with_capacity(3);
    canonical.push(letter);

    let mut rest: Vec<char> = chars.collect();
    if let Some(&c) = rest.first() {
        if c == '#' || c == 'b' || c == 'B' {
            canonical.push(if c == '#' { '#' } else { 'b' });
            rest.remove(0);
        }
    }

    match rest.len() {
        // No octave given: default to the middle octave.
        0 => canonical.push('4'),
        1 => {
            let c = rest[0];
            if !('0'..='8').contains(&c) {
                return Err(invalid(raw, "octave must be 0-8"));
            }
            canonical.push(c);
        }
        _ => return Err(invalid(raw, "trailing characters after octave")),
    }

    Ok(canonical)
}

fn invalid(token: &str, reason: &str) -> EarplayError {
    EarplayError::InvalidNote {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Duration multiple of a quarter note for a modifier suffix.
///
/// Unknown modifiers fall back to a plain quarter note: a slightly wrong
/// length is far less harmful to an ear-training round than silence.
fn duration_multiplier(modifier: &str) -> f64 {
    match modifier {
        "w" => 4.0,
        "h" => 2.0,
        "q" => 1.0,
        "e" => 0.5,
        "s" => 0.25,
        "q." => 1.5,
        "h." => 3.0,
        "e." => 0.75,
        _ => 1.0,
    }
}

/// Parse one note token into a [`ProcessedNote`].
///
/// `base_quarter_ms` is the length of a quarter note; the token's modifier
/// scales it. Rest tokens (`r`, `r:h`, ...) produce a silent element.
///
/// # Errors
/// Returns [`EarplayError::InvalidNote`] when the pitch part fails the
/// grammar. Callers scheduling a sequence must abort the whole sequence on
/// this error rather than skip the token.
///
/// # Example
/// ```
/// use earplay::parse_note_token;
///
/// let note = parse_note_token("C4:h", 600).unwrap();
/// assert_eq!(note.pitch.as_deref(), Some("C4"));
/// assert_eq!(note.duration_ms, 1200);
///
/// let rest = parse_note_token("r:q", 500).unwrap();
/// assert!(rest.is_rest);
/// assert_eq!(rest.duration_ms, 500);
/// ```
pub fn parse_note_token(token: &str, base_quarter_ms: u64) -> Result<ProcessedNote, EarplayError> {
    if token.is_empty() {
        return Err(invalid(token, "empty token"));
    }

    let (head, modifier) = match token.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (token, None),
    };

    let duration_ms = match modifier {
        Some(m) => (base_quarter_ms as f64 * duration_multiplier(m)).round() as u64,
        None => base_quarter_ms,
    };

    if head.starts_with('r') || head.starts_with('R') {
        return Ok(ProcessedNote {
            token: token.to_string(),
            pitch: None,
            duration_ms,
            is_rest: true,
        });
    }

    // Re-wrap grammar failures so the error names the full token, modifier
    // included, which is what the caller scheduled.
    let pitch = match normalize_pitch(head) {
        Ok(pitch) => pitch,
        Err(EarplayError::InvalidNote { reason, .. }) => return Err(invalid(token, &reason)),
        Err(other) => return Err(other),
    };
    Ok(ProcessedNote {
        token: token.to_string(),
        pitch: Some(pitch),
        duration_ms,
        is_rest: false,
    })
}

/// Parse a whole token slice, aborting on the first invalid token.
pub fn parse_sequence<S: AsRef<str>>(
    tokens: &[S],
    base_quarter_ms: u64,
) -> Result<Vec<ProcessedNote>, EarplayError> {
    tokens
        .iter()
        .map(|t| parse_note_token(t.as_ref(), base_quarter_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_modifiers() {
        // Every documented modifier at a 600ms quarter note.
        let cases = [
            ("w", 2400),
            ("h", 1200),
            ("q", 600),
            ("e", 300),
            ("s", 150),
            ("q.", 900),
            ("h.", 1800),
            ("e.", 450),
        ];
        for (modifier, expected) in cases {
            let token = format!("C4:{}", modifier);
            let note = parse_note_token(&token, 600).unwrap();
            assert_eq!(note.duration_ms, expected, "modifier {}", modifier);
            assert_eq!(note.pitch.as_deref(), Some("C4"));
        }
    }

    #[test]
    fn test_unknown_modifier_degrades_to_quarter() {
        let note = parse_note_token("C4:x", 600).unwrap();
        assert_eq!(note.duration_ms, 600);
        assert!(!note.is_rest);
    }

    #[test]
    fn test_rest_token() {
        let rest = parse_note_token("r:q", 500).unwrap();
        assert!(rest.is_rest);
        assert_eq!(rest.pitch, None);
        assert_eq!(rest.duration_ms, 500);

        let half_rest = parse_note_token("r:h", 500).unwrap();
        assert_eq!(half_rest.duration_ms, 1000);
    }

    #[test]
    fn test_invalid_pitch_rejected() {
        // H is not a valid pitch letter.
        assert!(matches!(
            parse_note_token("H9", 500),
            Err(EarplayError::InvalidNote { .. })
        ));
        assert!(parse_note_token("C9", 500).is_err());
        assert!(parse_note_token("", 500).is_err());
        assert!(parse_note_token("C44", 500).is_err());
    }

    #[test]
    fn test_octave_defaults_to_four() {
        let note = parse_note_token("A", 500).unwrap();
        assert_eq!(note.pitch.as_deref(), Some("A4"));

        let with_modifier = parse_note_token("G:h", 500).unwrap();
        assert_eq!(with_modifier.pitch.as_deref(), Some("G4"));
        assert_eq!(with_modifier.duration_ms, 1000);
    }

    #[test]
    fn test_prefix_stripping_and_case() {
        assert_eq!(normalize_pitch("pitch_c4").unwrap(), "C4");
        assert_eq!(normalize_pitch("sound_f#3").unwrap(), "F#3");
    }

    #[test]
    fn test_midi_round_trip() {
        assert_eq!(midi_to_note_name(60), "C4");
        assert_eq!(note_name_to_midi("C4"), Some(60));
        assert_eq!(note_name_to_midi("Bb3"), Some(58));
        assert_eq!(note_name_to_midi("H2"), None);
        for midi in 12..=108u8 {
            assert_eq!(note_name_to_midi(&midi_to_note_name(midi)), Some(midi));
        }
    }

    #[test]
    fn test_transposition() {
        assert_eq!(transpose_note("C4", 13), "C#5");
        assert_eq!(transpose_note("C4", 12), "C5");
        assert_eq!(transpose_note("B3", 1), "C4");
        assert_eq!(transpose_note("C4", -12), "C3");
        assert_eq!(transpose_note("C4", 0), "C4");
        // Invalid names pass through untouched.
        assert_eq!(transpose_note("X4", 5), "X4");
    }

    #[test]
    fn test_frequency() {
        assert!((midi_to_frequency(69) - 440.0).abs() < 0.001);
        assert!((midi_to_frequency(57) - 220.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_sequence_aborts_on_invalid() {
        let good = parse_sequence(&["C4", "r", "E4:h"], 600).unwrap();
        assert_eq!(good.len(), 3);
        assert!(good[1].is_rest);

        let bad = parse_sequence(&["C4", "H9", "E4"], 600);
        assert!(bad.is_err());
    }
}
