//! Integration tests for earplay
//!
//! Exercises whole activity flows: chord rounds against the progress store,
//! melody playback through the real engine, and persistence across reopens.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use earplay::chords::{generate_chord, ChordKind};
use earplay::engine::{AudioEngine, ChordOptions};
use earplay::playback::{SequenceHandle, SequenceOptions, SequencePlayer};
use earplay::progress::{MemoryBackend, ProgressStore};
use earplay::session::{ChordGameSession, JudgmentSession, CHORD_LEVEL_STEP};

fn wait_for_finish(handle: &SequenceHandle, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_level_zero_stable_chord_reference_voicing() {
    let chord = generate_chord(ChordKind::Stable, 0);
    assert_eq!(chord, vec!["C2", "C3", "E3", "G3", "C4", "E4"]);
}

#[test]
fn test_chord_game_levels_up_after_a_full_round() {
    let mut store = ProgressStore::open(Box::new(MemoryBackend::new()));
    let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(99));

    // Ten correct answers move the game from level 0 to level 1.
    for i in 0..10u32 {
        let pitches = session.begin_round(&store);
        assert!(!pitches.is_empty());
        let answer = session.current_kind().unwrap();
        let outcome = session.answer(answer, &mut store).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.progress, i + 1);
    }
    assert_eq!(store.level_of("chords", CHORD_LEVEL_STEP, 5), 1);

    // One slip resets to the level boundary, not to zero.
    let _ = session.begin_round(&store);
    let right = session.current_kind().unwrap();
    let wrong = match right {
        ChordKind::Stable => ChordKind::Unstable,
        ChordKind::Unstable => ChordKind::Stable,
    };
    let outcome = session.answer(wrong, &mut store).unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.progress, 10);
    assert_eq!(outcome.level, 1);
}

#[test]
fn test_melody_plays_through_the_real_engine() {
    let engine = Arc::new(AudioEngine::default());
    engine.initialize().unwrap();

    let player = SequencePlayer::new(engine.clone(), "integration");
    let handle = player
        .play(&["C4:s", "E4:s", "G4:s"], SequenceOptions::new().quarter_ms(80))
        .unwrap();

    wait_for_finish(&handle, Duration::from_secs(3));
    assert!(handle.is_finished());
    // Cleanup leaves nothing behind.
    engine.stop_all();
    assert_eq!(engine.mixer().active_count(), 0);
}

#[test]
fn test_session_chord_playback_through_engine() {
    let engine = AudioEngine::default();
    engine.initialize().unwrap();

    let store = ProgressStore::open(Box::new(MemoryBackend::new()));
    let mut session = ChordGameSession::with_rng("chords", fastrand::Rng::with_seed(17));
    let pitches = session.begin_round(&store);

    assert!(session.play_current(&engine));
    // Anchored voicing: every chord member is sounding.
    assert_eq!(engine.mixer().active_count(), pitches.len());

    // Replaying replaces, never stacks.
    assert!(session.play_current(&engine));
    assert_eq!(engine.mixer().active_count(), pitches.len());
}

#[test]
fn test_known_melody_via_facade() {
    let engine = Arc::new(AudioEngine::default());
    engine.initialize().unwrap();
    let player = SequencePlayer::new(engine, "facade");

    let melody = earplay::find_melody("jingle").unwrap();
    let handle = earplay::play_melody(&player, melody).unwrap();
    assert!(handle.is_active());
    handle.cancel();
    assert!(handle.is_cancelled());
}

#[test]
fn test_judgment_progress_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");

    {
        let mut store = ProgressStore::open_file(&path);
        let mut session = JudgmentSession::with_rng("judge", fastrand::Rng::with_seed(55));
        for _ in 0..5 {
            session.next_round();
            let truth = session.has_wrong_note().unwrap();
            assert!(session.answer(!truth, &mut store).unwrap().correct);
        }
    }

    let store = ProgressStore::open_file(&path);
    assert_eq!(store.get("judge"), 5);
}

#[test]
fn test_engine_survives_malformed_content() {
    let engine = AudioEngine::default();
    engine.initialize().unwrap();

    // Bad content must degrade, never panic.
    assert!(!engine.play_note("Z9", 0.5, 0.7));
    assert!(!engine.play_chord::<&str>(&[], ChordOptions::default()));
    assert!(engine.play_chord(&["C4", "garbage", "E4"], ChordOptions::default()));
    engine.stop_all();
    engine.cleanup();
}
