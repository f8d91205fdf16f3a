//! Chord generation for the stable/unstable ear-training game.
//!
//! Chords are built from fixed interval tables indexed by difficulty level
//! (0-5) and anchored to a prominent low C2 plus the octave-doubled root,
//! so the child always hears the same fundament while the color above it
//! changes. Stable tables progress from plain triads to extended jazz
//! harmony; unstable tables from blunt clusters to polytonal dissonance.

use crate::note::{midi_to_note_name, transpose_note};

/// C2, the fixed low anchor of every generated chord.
const ROOT_MIDI: u8 = 36;

/// Highest difficulty level for chord activities.
pub const MAX_CHORD_LEVEL: u32 = 5;

/// Semitone offsets from the root, one table row per level.
///
/// Stable rows: triad, major 7th, extended 9/13, jazz voicing with #11,
/// impressionistic color tones, full extended harmony.
const STABLE_INTERVALS: [&[i8]; 6] = [
    &[0, 12, 16, 19, 24, 28],
    &[0, 12, 16, 19, 23, 28, 31],
    &[0, 12, 16, 19, 23, 26, 33],
    &[0, 12, 17, 19, 23, 26, 29],
    &[0, 12, 16, 21, 26, 30, 33],
    &[0, 12, 16, 19, 23, 26, 33, 38],
];

/// Unstable rows: minor-2nd/tritone cluster, altered dominant, polytonal
/// stack, atonal cluster, quarter-tone approximation, extreme tensions.
const UNSTABLE_INTERVALS: [&[i8]; 6] = [
    &[0, 12, 13, 18, 24, 25],
    &[0, 12, 17, 21, 24, 26, 32],
    &[0, 13, 16, 20, 24, 27, 30],
    &[0, 12, 15, 16, 18, 23, 25],
    &[0, 12, 13, 18, 19, 23, 25],
    &[0, 12, 13, 18, 23, 25, 29, 34],
];

/// Pedagogical chord category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordKind {
    /// Consonant, restful sonority.
    Stable,
    /// Dissonant, tense sonority.
    Unstable,
}

impl ChordKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChordKind::Stable => "stable",
            ChordKind::Unstable => "unstable",
        }
    }
}

/// A chosen chord: its category and concrete (untransposed) note names.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordSelection {
    pub kind: ChordKind,
    pub pitches: Vec<String>,
}

/// Build the chord for a category and level.
///
/// Deterministic: the same `(kind, level)` always yields the same notes.
/// Levels above [`MAX_CHORD_LEVEL`] clamp to the hardest table row.
///
/// # Example
/// ```
/// use earplay::chords::{generate_chord, ChordKind};
///
/// let chord = generate_chord(ChordKind::Stable, 0);
/// assert_eq!(chord, vec!["C2", "C3", "E3", "G3", "C4", "E4"]);
/// ```
pub fn generate_chord(kind: ChordKind, level: u32) -> Vec<String> {
    let level = level.min(MAX_CHORD_LEVEL) as usize;
    let intervals = match kind {
        ChordKind::Stable => STABLE_INTERVALS[level],
        ChordKind::Unstable => UNSTABLE_INTERVALS[level],
    };
    intervals
        .iter()
        .map(|offset| midi_to_note_name((ROOT_MIDI as i8 + offset) as u8))
        .collect()
}

/// Transpose every note of a chord by the same number of semitones.
pub fn transpose_chord<S: AsRef<str>>(pitches: &[S], semitones: i8) -> Vec<String> {
    pitches.iter().map(|p| transpose_note(p.as_ref(), semitones)).collect()
}

/// Transposition span for a level: ±3 semitones at level 0, widening to ±7
/// at level 5.
pub fn transposition_range(level: u32) -> i8 {
    let level = level.min(MAX_CHORD_LEVEL);
    3 + (level as f32 * 0.8) as i8
}

/// Draw a random transposition within the level's span.
pub fn random_transposition(level: u32, rng: &mut fastrand::Rng) -> i8 {
    let range = transposition_range(level);
    rng.i8(-range..=range)
}

/// Randomly select the next chord, avoiding an exact repeat of the
/// previous selection.
///
/// A candidate counts as a repeat only when both the kind and the exact
/// note list match. Regeneration is bounded to 10 attempts; after that a
/// duplicate is tolerated so selection always terminates.
pub fn pick_next(
    level: u32,
    previous: Option<&ChordSelection>,
    rng: &mut fastrand::Rng,
) -> ChordSelection {
    const MAX_ATTEMPTS: u32 = 10;

    let mut selection = random_selection(level, rng);
    if let Some(previous) = previous {
        let mut attempts = 1;
        while attempts < MAX_ATTEMPTS
            && selection.kind == previous.kind
            && selection.pitches == previous.pitches
        {
            selection = random_selection(level, rng);
            attempts += 1;
        }
    }
    selection
}

fn random_selection(level: u32, rng: &mut fastrand::Rng) -> ChordSelection {
    let kind = if rng.bool() { ChordKind::Stable } else { ChordKind::Unstable };
    ChordSelection { kind, pitches: generate_chord(kind, level) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_stable_literal() {
        assert_eq!(
            generate_chord(ChordKind::Stable, 0),
            vec!["C2", "C3", "E3", "G3", "C4", "E4"]
        );
    }

    #[test]
    fn test_level_zero_unstable_has_cluster() {
        let chord = generate_chord(ChordKind::Unstable, 0);
        assert_eq!(chord, vec!["C2", "C3", "C#3", "F#3", "C4", "C#4"]);
    }

    #[test]
    fn test_all_tables_are_anchored_and_sized() {
        for level in 0..=MAX_CHORD_LEVEL {
            for kind in [ChordKind::Stable, ChordKind::Unstable] {
                let chord = generate_chord(kind, level);
                assert!(
                    (6..=8).contains(&chord.len()),
                    "{:?} level {} has {} notes",
                    kind,
                    level,
                    chord.len()
                );
                assert_eq!(chord[0], "C2");
                assert_eq!(chord[1], "C3", "octave-doubled root missing at level {}", level);
            }
        }
    }

    #[test]
    fn test_level_clamps() {
        assert_eq!(generate_chord(ChordKind::Stable, 99), generate_chord(ChordKind::Stable, 5));
    }

    #[test]
    fn test_transpose_chord() {
        let chord = generate_chord(ChordKind::Stable, 0);
        let up = transpose_chord(&chord, 2);
        assert_eq!(up, vec!["D2", "D3", "F#3", "A3", "D4", "F#4"]);
        assert_eq!(transpose_chord(&["C4"], 13), vec!["C#5"]);
    }

    #[test]
    fn test_transposition_range_widens_with_level() {
        assert_eq!(transposition_range(0), 3);
        assert_eq!(transposition_range(1), 3);
        assert_eq!(transposition_range(2), 4);
        assert_eq!(transposition_range(3), 5);
        assert_eq!(transposition_range(4), 6);
        assert_eq!(transposition_range(5), 7);
        assert_eq!(transposition_range(50), 7);
    }

    #[test]
    fn test_random_transposition_stays_in_range() {
        let mut rng = fastrand::Rng::with_seed(7);
        for level in 0..=MAX_CHORD_LEVEL {
            let range = transposition_range(level);
            for _ in 0..200 {
                let t = random_transposition(level, &mut rng);
                assert!(t >= -range && t <= range);
            }
        }
    }

    #[test]
    fn test_pick_next_avoids_exact_repeats() {
        let mut rng = fastrand::Rng::with_seed(42);
        let previous = ChordSelection {
            kind: ChordKind::Stable,
            pitches: generate_chord(ChordKind::Stable, 0),
        };

        // Bounded-retry property: duplicates are possible in principle but
        // need 10 identical coin flips in a row, so they stay rare.
        let mut duplicates = 0;
        for _ in 0..100 {
            let next = pick_next(0, Some(&previous), &mut rng);
            if next.kind == previous.kind && next.pitches == previous.pitches {
                duplicates += 1;
            }
        }
        assert!(duplicates <= 2, "got {} duplicates in 100 picks", duplicates);
    }

    #[test]
    fn test_pick_next_without_previous() {
        let mut rng = fastrand::Rng::with_seed(1);
        let selection = pick_next(3, None, &mut rng);
        assert_eq!(selection.pitches, generate_chord(selection.kind, 3));
    }
}
