//! Melody content and melodic pattern generators.
//!
//! The well-known melodies drive the "does it sound right" game; each one
//! carries its own quarter-note duration so nursery-rhyme tempi survive the
//! shared player. The pattern generators produce the five-note contours
//! (up, down, wave, jump) used by the sound-matching game.

use crate::note::transpose_note;

/// A well-known children's melody.
#[derive(Debug, Clone, Copy)]
pub struct Melody {
    pub id: &'static str,
    pub title: &'static str,
    /// Quarter-note length in milliseconds for this tune.
    pub quarter_note_ms: u64,
    pub notes: &'static [&'static str],
}

/// The built-in melody set.
pub const KNOWN_MELODIES: &[Melody] = &[
    Melody {
        id: "twinkle",
        title: "Twinkle, Twinkle, Little Star",
        quarter_note_ms: 500,
        notes: &[
            "C", "C4", "G4", "G4", "A4", "A4", "G4:h",
            "F4", "F4", "E4", "E4", "D4", "D4", "C4:h",
        ],
    },
    Melody {
        id: "jingle",
        title: "Jingle Bells",
        quarter_note_ms: 450,
        notes: &["E", "E4", "E4:h", "E4", "E4", "E4:h", "E4", "G4", "C4", "D4", "E4:h"],
    },
    Melody {
        id: "happy",
        title: "Happy Birthday",
        quarter_note_ms: 600,
        notes: &[
            "G3:e", "G3:e", "A3:q", "G3:q", "C4:q", "B3:h",
            "G3:e", "G3:e", "A3:q", "G3:q", "D4:q", "C4:h",
        ],
    },
    Melody {
        id: "happy-birthday",
        title: "Happy Birthday To You",
        quarter_note_ms: 600,
        notes: &[
            "C:e", "C4:e", "D4:q", "C4:q", "F4:q", "E4:h",
            "C4:e", "C4:e", "D4:q", "C4:q", "G4:q", "F4:h",
        ],
    },
    Melody {
        id: "frere-jacques",
        title: "Brother John (Frere Jacques)",
        quarter_note_ms: 500,
        notes: &[
            "C", "D4", "E4", "C4",
            "C4", "D4", "E4", "C4",
            "E4", "F4", "G4:h",
            "E4", "F4", "G4:h",
        ],
    },
    Melody {
        id: "are-you-sleeping",
        title: "Are You Sleeping?",
        quarter_note_ms: 550,
        notes: &[
            "C", "D4", "E4", "C4",
            "C4", "D4", "E4", "C4",
            "E4", "F4", "G4:h",
            "E4", "F4", "G4:h",
        ],
    },
    Melody {
        id: "little-hans",
        title: "Little Hans",
        quarter_note_ms: 550,
        notes: &[
            "G", "E4", "E4:h", "A4", "D4", "D4:h",
            "C4", "D4", "E4", "F4", "G4", "G4", "G4:h",
        ],
    },
    Melody {
        id: "all-my-little-ducklings",
        title: "All My Little Ducklings",
        quarter_note_ms: 550,
        notes: &["C", "D4", "E4", "F4", "G4:h", "G4:h", "A", "A", "A", "A", "G:h"],
    },
    Melody {
        id: "old-mcdonald",
        title: "Old McDonald Had a Farm",
        quarter_note_ms: 500,
        notes: &["F", "F4", "C4", "C4", "D4", "D4", "C4:h", "A4", "A4", "G4", "G4", "F4:h"],
    },
];

/// Look up a melody by id.
pub fn find_melody(id: &str) -> Option<&'static Melody> {
    KNOWN_MELODIES.iter().find(|m| m.id == id)
}

/// Draw a random melody, avoiding the excluded id for up to 10 attempts,
/// then forcing the next entry so consecutive rounds never repeat.
pub fn random_melody(rng: &mut fastrand::Rng, exclude: Option<&str>) -> &'static Melody {
    const MAX_ATTEMPTS: u32 = 10;

    let mut choice = &KNOWN_MELODIES[rng.usize(0..KNOWN_MELODIES.len())];
    if let Some(exclude) = exclude {
        let mut attempts = 1;
        while choice.id == exclude && attempts < MAX_ATTEMPTS {
            choice = &KNOWN_MELODIES[rng.usize(0..KNOWN_MELODIES.len())];
            attempts += 1;
        }
        if choice.id == exclude {
            let index = KNOWN_MELODIES.iter().position(|m| m.id == exclude).unwrap_or(0);
            choice = &KNOWN_MELODIES[(index + 1) % KNOWN_MELODIES.len()];
        }
    }
    choice
}

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// Copy a melody and replace one inner note with a diatonic neighbor,
/// preserving its duration modifier. Returns the altered tokens and the
/// changed index, or `None` when the melody is too short to alter safely.
///
/// The first and last notes stay untouched; a wrong opening or closing note
/// is too easy to catch and skews the game.
pub fn with_wrong_note(
    notes: &[&'static str],
    rng: &mut fastrand::Rng,
) -> Option<(Vec<String>, usize)> {
    if notes.len() < 3 {
        return None;
    }

    let index = 1 + rng.usize(0..notes.len() - 2);
    let token = notes[index];

    let (note_part, modifier) = match token.split_once(':') {
        Some((n, m)) => (n, Some(m)),
        None => (token, None),
    };

    let mut chars = note_part.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let octave: String = chars.collect();
    let current = LETTERS.iter().position(|&l| l == letter)?;

    let replacement = loop {
        let shift = rng.i32(-2..=2);
        if shift == 0 {
            continue;
        }
        let candidate = (current as i32 + shift).rem_euclid(LETTERS.len() as i32) as usize;
        if candidate != current {
            break candidate;
        }
    };

    let mut wrong = String::new();
    wrong.push(LETTERS[replacement]);
    wrong.push_str(&octave);
    if let Some(m) = modifier {
        wrong.push(':');
        wrong.push_str(m);
    }

    let mut altered: Vec<String> = notes.iter().map(|n| n.to_string()).collect();
    altered[index] = wrong;
    Some((altered, index))
}

/// Melodic contour shapes for the sound-matching game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Up,
    Down,
    Wave,
    Jump,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Up => "up",
            PatternKind::Down => "down",
            PatternKind::Wave => "wave",
            PatternKind::Jump => "jump",
        }
    }
}

/// Diatonic range the patterns move in, C3 up to C6.
pub const AVAILABLE_NOTES: [&str; 22] = [
    "C3", "D3", "E3", "F3", "G3", "A3", "B3",
    "C4", "D4", "E4", "F4", "G4", "A4", "B4",
    "C5", "D5", "E5", "F5", "G5", "A5", "B5", "C6",
];

const PATTERN_LEN: usize = 5;

/// Generate a five-note pattern with the given contour.
pub fn generate_pattern(kind: PatternKind, rng: &mut fastrand::Rng) -> Vec<String> {
    match kind {
        PatternKind::Up => {
            let start = rng.usize(0..AVAILABLE_NOTES.len() - PATTERN_LEN);
            (0..PATTERN_LEN).map(|i| AVAILABLE_NOTES[start + i].to_string()).collect()
        }
        PatternKind::Down => {
            // Start high enough that five downward steps stay in range.
            let start = (PATTERN_LEN - 1) + rng.usize(0..AVAILABLE_NOTES.len() - PATTERN_LEN);
            (0..PATTERN_LEN).map(|i| AVAILABLE_NOTES[start - i].to_string()).collect()
        }
        PatternKind::Wave => {
            let start = rng.usize(0..AVAILABLE_NOTES.len() - 4);
            let mut interval = rng.usize(1..=3) as i32;
            if rng.bool() {
                interval = -interval;
            }
            let second = (start as i32 + interval)
                .clamp(0, AVAILABLE_NOTES.len() as i32 - 1) as usize;
            let a = AVAILABLE_NOTES[start].to_string();
            let b = AVAILABLE_NOTES[second].to_string();
            vec![a.clone(), b.clone(), a.clone(), b, a]
        }
        PatternKind::Jump => {
            let mut pattern = Vec::with_capacity(PATTERN_LEN);
            let mut last: Option<usize> = None;
            while pattern.len() < PATTERN_LEN {
                let index = rng.usize(0..AVAILABLE_NOTES.len());
                if let Some(previous) = last {
                    // Jumps must be wide to sound erratic.
                    if previous.abs_diff(index) < 3 {
                        continue;
                    }
                }
                pattern.push(AVAILABLE_NOTES[index].to_string());
                last = Some(index);
            }
            pattern
        }
    }
}

/// Transpose a whole pattern or melody fragment by semitones.
pub fn transpose_pattern<S: AsRef<str>>(notes: &[S], semitones: i8) -> Vec<String> {
    notes.iter().map(|n| transpose_note(n.as_ref(), semitones)).collect()
}
