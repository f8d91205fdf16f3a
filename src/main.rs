use std::env;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use earplay::chords::{generate_chord, ChordKind};
use earplay::engine::{AudioEngine, ChordOptions, EngineConfig, SpecialEffect};
use earplay::melodies::KNOWN_MELODIES;
use earplay::output::open_output;
use earplay::playback::SequencePlayer;

fn usage() -> ! {
    eprintln!("Usage: earplay list");
    eprintln!("       earplay melody <id>");
    eprintln!("       earplay chord <stable|unstable> [level]");
    eprintln!("       earplay effect <success|try_again>");
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
    }

    match args[1].as_str() {
        "list" => {
            for melody in KNOWN_MELODIES {
                println!("{:<24} {} ({}ms/quarter)", melody.id, melody.title, melody.quarter_note_ms);
            }
        }
        "melody" => {
            let id = args.get(2).unwrap_or_else(|| usage());
            let melody = match earplay::find_melody(id) {
                Some(m) => m,
                None => {
                    eprintln!("Unknown melody '{}'. Try 'earplay list'.", id);
                    process::exit(1);
                }
            };

            let engine = start_engine();
            let _output = start_output(&engine);

            let player = SequencePlayer::new(engine, "cli");
            let handle = match earplay::play_melody(&player, melody) {
                Ok(handle) => handle,
                Err(e) => {
                    eprintln!("Playback error: {}", e);
                    process::exit(1);
                }
            };

            eprintln!("Playing '{}'...", melody.title);
            while handle.is_active() {
                thread::sleep(Duration::from_millis(50));
            }
            // Let the last release tail ring out.
            thread::sleep(Duration::from_millis(800));
        }
        "chord" => {
            let kind = match args.get(2).map(String::as_str) {
                Some("stable") => ChordKind::Stable,
                Some("unstable") => ChordKind::Unstable,
                _ => usage(),
            };
            let level: u32 = args
                .get(3)
                .map(|l| l.parse().unwrap_or_else(|_| usage()))
                .unwrap_or(0);

            let engine = start_engine();
            let _output = start_output(&engine);

            let chord = generate_chord(kind, level);
            eprintln!("Playing {} chord, level {}: {}", kind.name(), level, chord.join(" "));
            engine.play_chord(&chord, ChordOptions::default());
            thread::sleep(Duration::from_millis(2600));
        }
        "effect" => {
            let effect = match args.get(2).and_then(|n| SpecialEffect::from_name(n)) {
                Some(effect) => effect,
                None => usage(),
            };

            let engine = start_engine();
            let _output = start_output(&engine);

            engine.play_special_effect(effect);
            thread::sleep(Duration::from_millis(1600));
        }
        _ => usage(),
    }
}

fn start_engine() -> Arc<AudioEngine> {
    let engine = Arc::new(AudioEngine::new(EngineConfig::default()));
    if let Err(e) = engine.initialize() {
        eprintln!("Engine error: {}", e);
        process::exit(1);
    }
    engine
}

fn start_output(engine: &Arc<AudioEngine>) -> earplay::output::OutputStream {
    match open_output(engine.mixer()) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Audio error: {}", e);
            process::exit(1);
        }
    }
}
