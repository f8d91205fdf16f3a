//! Per-activity game sessions.
//!
//! Each session owns the state its activity used to keep in scattered
//! globals: the current chord or melody, the transposition, whether an
//! attempt is underway, and its own random generator. That makes rounds
//! reproducible under a seed and lets several sessions coexist.
//!
//! Sessions are pure state machines over the [`ProgressStore`]; playing
//! sound stays the caller's job (a convenience hook per session drives an
//! [`AudioEngine`] with the activity's voicing).

use crate::chords::{
    pick_next, random_transposition, transpose_chord, ChordKind, ChordSelection, MAX_CHORD_LEVEL,
};
use crate::engine::AudioEngine;
use crate::melodies::{generate_pattern, random_melody, with_wrong_note, Melody, PatternKind};
use crate::progress::ProgressStore;

/// Progress points per level in the chord game.
pub const CHORD_LEVEL_STEP: u32 = 10;

/// Progress points per level in the sound-judgment game.
pub const JUDGMENT_LEVEL_STEP: u32 = 7;

/// Highest sound-judgment level.
pub const JUDGMENT_MAX_LEVEL: u32 = 6;

/// Progress points per level in the sound-matching game.
pub const MATCH_LEVEL_STEP: u32 = 10;

/// Highest sound-matching level.
pub const MATCH_MAX_LEVEL: u32 = 3;

/// Result of grading one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Counter value after the update.
    pub progress: u32,
    /// Level derived from the updated counter.
    pub level: u32,
}

/// Session state for the stable/unstable chord game.
pub struct ChordGameSession {
    activity_key: String,
    rng: fastrand::Rng,
    current: Option<ChordSelection>,
    transpose_semitones: i8,
    attempt_in_progress: bool,
}

impl ChordGameSession {
    pub fn new(activity_key: impl Into<String>) -> ChordGameSession {
        ChordGameSession::with_rng(activity_key, fastrand::Rng::new())
    }

    /// Seeded constructor for reproducible rounds.
    pub fn with_rng(activity_key: impl Into<String>, rng: fastrand::Rng) -> ChordGameSession {
        ChordGameSession {
            activity_key: activity_key.into(),
            rng,
            current: None,
            transpose_semitones: 0,
            attempt_in_progress: false,
        }
    }

    pub fn activity_key(&self) -> &str {
        &self.activity_key
    }

    /// Start a new round: pick a chord different from the previous one,
    /// draw a level-scaled transposition, and return the notes to play.
    pub fn begin_round(&mut self, store: &ProgressStore) -> Vec<String> {
        let level = store.level_of(&self.activity_key, CHORD_LEVEL_STEP, MAX_CHORD_LEVEL);
        let selection = pick_next(level, self.current.as_ref(), &mut self.rng);
        self.transpose_semitones = random_transposition(level, &mut self.rng);
        self.current = Some(selection);
        self.attempt_in_progress = true;
        self.current_pitches().unwrap_or_default()
    }

    /// The current chord as sounding (transposed) notes.
    pub fn current_pitches(&self) -> Option<Vec<String>> {
        self.current
            .as_ref()
            .map(|selection| transpose_chord(&selection.pitches, self.transpose_semitones))
    }

    /// Replay the current chord, same notes and same transposition.
    ///
    /// Replay is always an explicit request; starting a round never
    /// silently turns into one.
    pub fn replay(&self) -> Option<Vec<String>> {
        self.current_pitches()
    }

    /// The category the child has to identify. `None` before any round.
    pub fn current_kind(&self) -> Option<ChordKind> {
        self.current.as_ref().map(|s| s.kind)
    }

    pub fn attempt_in_progress(&self) -> bool {
        self.attempt_in_progress
    }

    /// Grade an answer and update progress. `None` before any round.
    ///
    /// A wrong answer keeps the current chord so it can be replayed for
    /// another try; a correct one closes the attempt.
    pub fn answer(
        &mut self,
        selected: ChordKind,
        store: &mut ProgressStore,
    ) -> Option<AnswerOutcome> {
        let kind = self.current.as_ref()?.kind;
        let correct = selected == kind;

        let progress = if correct {
            self.attempt_in_progress = false;
            store.on_correct(&self.activity_key)
        } else {
            store.on_wrong(&self.activity_key, CHORD_LEVEL_STEP)
        };

        Some(AnswerOutcome {
            correct,
            progress,
            level: store.level_of(&self.activity_key, CHORD_LEVEL_STEP, MAX_CHORD_LEVEL),
        })
    }

    /// Sound the current chord with the activity's anchored voicing: the
    /// low base note louder and longer, the color notes softer above it.
    pub fn play_current(&self, engine: &AudioEngine) -> bool {
        let pitches = match self.current_pitches() {
            Some(p) if !p.is_empty() => p,
            _ => return false,
        };
        engine.stop_all();
        let base_ok = engine.play_note(&pitches[0], 2.5, 0.9);
        for pitch in &pitches[1..] {
            engine.play_note(pitch, 2.0, 0.5);
        }
        base_ok
    }
}

struct JudgmentState {
    melody: &'static Melody,
    has_wrong_note: bool,
    notes: Vec<String>,
}

/// One round handed to the UI: what to play and how fast.
#[derive(Debug, Clone)]
pub struct JudgmentRound {
    pub melody_id: &'static str,
    pub title: &'static str,
    pub quarter_note_ms: u64,
    pub notes: Vec<String>,
}

/// Session state for the "does it sound right" game.
pub struct JudgmentSession {
    activity_key: String,
    rng: fastrand::Rng,
    current: Option<JudgmentState>,
}

impl JudgmentSession {
    pub fn new(activity_key: impl Into<String>) -> JudgmentSession {
        JudgmentSession::with_rng(activity_key, fastrand::Rng::new())
    }

    pub fn with_rng(activity_key: impl Into<String>, rng: fastrand::Rng) -> JudgmentSession {
        JudgmentSession { activity_key: activity_key.into(), rng, current: None }
    }

    pub fn activity_key(&self) -> &str {
        &self.activity_key
    }

    /// Pick the next melody (never the one just heard) and flip a coin on
    /// whether to plant a wrong note in it.
    pub fn next_round(&mut self) -> JudgmentRound {
        let previous = self.current.as_ref().map(|c| c.melody.id);
        let melody = random_melody(&mut self.rng, previous);

        let plain = || melody.notes.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let (notes, has_wrong_note) = if self.rng.bool() {
            match with_wrong_note(melody.notes, &mut self.rng) {
                Some((altered, _)) => (altered, true),
                None => (plain(), false),
            }
        } else {
            (plain(), false)
        };

        let round = JudgmentRound {
            melody_id: melody.id,
            title: melody.title,
            quarter_note_ms: melody.quarter_note_ms,
            notes: notes.clone(),
        };
        self.current = Some(JudgmentState { melody, has_wrong_note, notes });
        round
    }

    /// Tokens of the current round, for replaying.
    pub fn current_notes(&self) -> Option<&[String]> {
        self.current.as_ref().map(|c| c.notes.as_slice())
    }

    /// Whether the current melody was altered. `None` before any round.
    pub fn has_wrong_note(&self) -> Option<bool> {
        self.current.as_ref().map(|c| c.has_wrong_note)
    }

    /// Grade the child's verdict ("it sounded right" = `true`).
    pub fn answer(
        &mut self,
        says_sounds_right: bool,
        store: &mut ProgressStore,
    ) -> Option<AnswerOutcome> {
        let has_wrong_note = self.current.as_ref()?.has_wrong_note;
        let correct = says_sounds_right != has_wrong_note;

        let progress = if correct {
            store.on_correct(&self.activity_key)
        } else {
            store.on_wrong(&self.activity_key, JUDGMENT_LEVEL_STEP)
        };

        Some(AnswerOutcome {
            correct,
            progress,
            level: store.level_of(&self.activity_key, JUDGMENT_LEVEL_STEP, JUDGMENT_MAX_LEVEL),
        })
    }
}

/// Session state for the sound-matching (pattern contour) game.
pub struct MatchSoundsSession {
    activity_key: String,
    rng: fastrand::Rng,
    current: Option<(PatternKind, Vec<String>)>,
}

impl MatchSoundsSession {
    pub fn new(activity_key: impl Into<String>) -> MatchSoundsSession {
        MatchSoundsSession::with_rng(activity_key, fastrand::Rng::new())
    }

    pub fn with_rng(activity_key: impl Into<String>, rng: fastrand::Rng) -> MatchSoundsSession {
        MatchSoundsSession { activity_key: activity_key.into(), rng, current: None }
    }

    /// Contours available at the current level. Everyone starts with up
    /// and down; wave and jump unlock as levels are earned.
    pub fn unlocked_patterns(&self, store: &ProgressStore) -> Vec<PatternKind> {
        let level = store.level_of(&self.activity_key, MATCH_LEVEL_STEP, MATCH_MAX_LEVEL);
        let mut unlocked = vec![PatternKind::Up, PatternKind::Down];
        if level >= 1 {
            unlocked.push(PatternKind::Wave);
        }
        if level >= 2 {
            unlocked.push(PatternKind::Jump);
        }
        unlocked
    }

    /// Generate the next pattern from the unlocked set and return its
    /// notes. The contour stays hidden until the answer.
    pub fn next_round(&mut self, store: &ProgressStore) -> Vec<String> {
        let unlocked = self.unlocked_patterns(store);
        let kind = unlocked[self.rng.usize(0..unlocked.len())];
        let notes = generate_pattern(kind, &mut self.rng);
        self.current = Some((kind, notes.clone()));
        notes
    }

    pub fn current_kind(&self) -> Option<PatternKind> {
        self.current.as_ref().map(|(kind, _)| *kind)
    }

    pub fn current_notes(&self) -> Option<&[String]> {
        self.current.as_ref().map(|(_, notes)| notes.as_slice())
    }

    /// Grade a contour guess.
    pub fn answer(
        &mut self,
        selected: PatternKind,
        store: &mut ProgressStore,
    ) -> Option<AnswerOutcome> {
        let kind = self.current.as_ref()?.0;
        let correct = selected == kind;

        let progress = if correct {
            store.on_correct(&self.activity_key)
        } else {
            store.on_wrong(&self.activity_key, MATCH_LEVEL_STEP)
        };

        Some(AnswerOutcome {
            correct,
            progress,
            level: store.level_of(&self.activity_key, MATCH_LEVEL_STEP, MATCH_MAX_LEVEL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemoryBackend, ProgressStore};

    fn store() -> ProgressStore {
        ProgressStore::open(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn test_chord_round_and_correct_answer() {
        let mut store = store();
        let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(5));

        let pitches = session.begin_round(&store);
        assert!((6..=8).contains(&pitches.len()));
        assert!(session.attempt_in_progress());

        let kind = session.current_kind().unwrap();
        let outcome = session.answer(kind, &mut store).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.progress, 1);
        assert!(!session.attempt_in_progress());
    }

    #[test]
    fn test_chord_wrong_answer_keeps_chord_for_replay() {
        let mut store = store();
        let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(6));

        let played = session.begin_round(&store);
        let kind = session.current_kind().unwrap();
        let wrong = match kind {
            ChordKind::Stable => ChordKind::Unstable,
            ChordKind::Unstable => ChordKind::Stable,
        };

        let outcome = session.answer(wrong, &mut store).unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.progress, 0);

        // Identical notes and transposition on replay.
        assert_eq!(session.replay().unwrap(), played);
    }

    #[test]
    fn test_chord_transposition_respects_level_range() {
        let mut store = store();
        let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(7));

        for _ in 0..20 {
            let pitches = session.begin_round(&store);
            // The anchor is C2 shifted by at most ±3 semitones at level 0.
            let base = crate::note::note_name_to_midi(&pitches[0]).unwrap() as i32;
            assert!((base - 36).abs() <= 3, "base {} out of range", pitches[0]);
        }
    }

    #[test]
    fn test_answer_before_round_is_none() {
        let mut store = store();
        let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(8));
        assert!(session.answer(ChordKind::Stable, &mut store).is_none());

        let mut judgment = JudgmentSession::with_rng("judge", fastrand::Rng::with_seed(8));
        assert!(judgment.answer(true, &mut store).is_none());
    }

    #[test]
    fn test_judgment_round_flow() {
        let mut store = store();
        let mut session = JudgmentSession::with_rng("judge", fastrand::Rng::with_seed(10));

        for _ in 0..10 {
            let round = session.next_round();
            assert!(!round.notes.is_empty());

            let has_wrong = session.has_wrong_note().unwrap();
            // Answering truthfully is always graded correct.
            let outcome = session.answer(!has_wrong, &mut store).unwrap();
            assert!(outcome.correct);
        }
        assert_eq!(store.get("judge"), 10);
        assert_eq!(store.level_of("judge", JUDGMENT_LEVEL_STEP, JUDGMENT_MAX_LEVEL), 1);
    }

    #[test]
    fn test_judgment_rounds_never_repeat_melody() {
        let mut session = JudgmentSession::with_rng("judge", fastrand::Rng::with_seed(20));
        let mut previous = session.next_round().melody_id;
        for _ in 0..30 {
            let round = session.next_round();
            assert_ne!(round.melody_id, previous);
            previous = round.melody_id;
        }
    }

    #[test]
    fn test_match_sounds_unlock_progression() {
        let mut store = store();
        let session = MatchSoundsSession::with_rng("match", fastrand::Rng::with_seed(30));

        assert_eq!(
            session.unlocked_patterns(&store),
            vec![PatternKind::Up, PatternKind::Down]
        );

        for _ in 0..10 {
            store.on_correct("match");
        }
        assert!(session.unlocked_patterns(&store).contains(&PatternKind::Wave));
        assert!(!session.unlocked_patterns(&store).contains(&PatternKind::Jump));

        for _ in 0..10 {
            store.on_correct("match");
        }
        assert!(session.unlocked_patterns(&store).contains(&PatternKind::Jump));
    }

    #[test]
    fn test_match_sounds_round_flow() {
        let mut store = store();
        let mut session = MatchSoundsSession::with_rng("match", fastrand::Rng::with_seed(31));

        let notes = session.next_round(&store);
        assert_eq!(notes.len(), 5);
        let kind = session.current_kind().unwrap();
        assert!(matches!(kind, PatternKind::Up | PatternKind::Down));

        let outcome = session.answer(kind, &mut store).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.progress, 1);
    }
}
