//! # Intonation Practice CLI
//!
//! Terminal front-end for the practice core. All musical logic lives in
//! `practice-core`; this binary wires the microphone, the estimation loop
//! and printed feedback together.
//!
//! ## Architecture
//! - **Main thread**: argument parsing, stream ownership, user input
//! - **Worker thread**: pitch estimation and session updates, one audio
//!   frame at a time
//! - **Communication**: crossbeam channels, plus a bounded shutdown
//!   channel that cancels the worker loop

use std::fs;
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, bounded, unbounded};

use practice_core::audio;
use practice_core::navigation::Navigator;
use practice_core::notation::{Sheet, parse_notation};
use practice_core::pitch::{PitchEstimator, YinEstimator};
use practice_core::session::{PracticeSession, SessionSnapshot};
use practice_core::storage::FileBookmarkStore;

/// File the practice bookmark is persisted in.
const BOOKMARK_FILE: &str = "practice_bookmark.json";

#[derive(Parser)]
#[command(name = "practice", about = "Intonation practice from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a live tuner against a fixed target note
    Tune {
        /// Target note name, e.g. A4 or C#5
        #[arg(long, default_value = "A4")]
        target: String,
    },

    /// Play through a score note-by-note with auto-advance
    Practice {
        /// Path to a score file in compact notation
        file: PathBuf,

        /// Ignore the saved bookmark and start from the first note
        #[arg(long)]
        restart: bool,
    },

    /// Parse a score file and print its structure
    Show {
        /// Path to a score file in compact notation
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Tune { target } => run_session(None, Some(target)),
        Command::Practice { file, restart } => {
            read_sheet(&file).and_then(|sheet| run_session(Some((sheet, restart)), None))
        }
        Command::Show { file } => read_sheet(&file).map(|sheet| print_sheet(&sheet)),
    };
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn read_sheet(path: &PathBuf) -> Result<Sheet> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_notation(&text))
}

/// Runs the capture and estimation loop until the user presses Enter.
///
/// The stream is acquired before anything starts listening; if that fails
/// the error is reported and no session ever begins. Stopping pauses and
/// drops the stream unconditionally.
fn run_session(score: Option<(Sheet, bool)>, target: Option<String>) -> Result<()> {
    let (frame_tx, frame_rx) = unbounded::<Vec<f32>>();
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

    let capture = audio::open_capture(frame_tx)?;
    let sample_rate = capture.sample_rate();

    let worker = thread::spawn(move || {
        run_worker(frame_rx, shutdown_rx, sample_rate, score, target);
    });

    println!("Listening. Press Enter to stop.");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);

    let _ = shutdown_tx.send(());
    if worker.join().is_err() {
        eprintln!("[MAIN] Worker thread panicked");
    }
    capture.pause();
    drop(capture);
    Ok(())
}

/// Frame-by-frame worker loop.
///
/// Estimates a pitch for every incoming frame, feeds it to the session
/// and prints feedback whenever the resulting line changes. The shutdown
/// channel breaks the loop; no frame is processed after it fires.
fn run_worker(
    frames: Receiver<Vec<f32>>,
    shutdown: Receiver<()>,
    sample_rate: u32,
    score: Option<(Sheet, bool)>,
    target: Option<String>,
) {
    let mut estimator = YinEstimator::default();
    let mut session = PracticeSession::new();

    if let Some((sheet, restart)) = score {
        println!(
            "Practicing: {} ({} notes)",
            sheet.title,
            sheet.all_notes.len()
        );
        let store = FileBookmarkStore::new(BOOKMARK_FILE);
        let mut navigator = Navigator::new(sheet.all_notes, Box::new(store));
        if restart {
            navigator.reset();
        }
        session.attach_navigator(navigator);
    }
    if let Some(target) = target {
        session.set_target_note(&target);
    }
    session.start();
    sync_target(&mut session);

    let mut last_line = String::new();
    loop {
        crossbeam_channel::select! {
            recv(frames) -> frame => match frame {
                Ok(frame) => {
                    if let Some(sample) = estimator.estimate(&frame, sample_rate) {
                        session.process_frame(sample);
                        sync_target(&mut session);
                    }
                    let line = feedback_line(&session.snapshot());
                    if line != last_line {
                        println!("{}", line);
                        last_line = line;
                    }
                }
                Err(_) => {
                    eprintln!("[SESSION] Audio channel closed");
                    break;
                }
            },
            recv(shutdown) -> _ => break,
        }
    }

    // remember where we stopped before shutting the session down
    if let Some(navigator) = session.navigator_mut() {
        navigator.set_bookmark();
    }
    session.stop();
    eprintln!("[SESSION] Stopped");
}

/// Keeps the tuning target aligned with the note under the cursor while a
/// score is loaded.
fn sync_target(session: &mut PracticeSession) {
    let Some(pitch) = session
        .navigator()
        .and_then(|nav| nav.current())
        .map(|note| note.pitch.clone())
    else {
        return;
    };
    if session.target() != pitch {
        session.set_target_note(&pitch);
    }
}

/// One line of user feedback for the current state.
fn feedback_line(snapshot: &SessionSnapshot) -> String {
    match &snapshot.note {
        Some(note) => {
            let verdict = if snapshot.in_tune {
                "in tune"
            } else if snapshot.cents > 0.0 {
                "sharp"
            } else {
                "flat"
            };
            format!(
                "{:>4} -> {:<4} {:+7.1} cents  {:<8} ({:.1} Hz)",
                note, snapshot.target, snapshot.cents, verdict, snapshot.frequency
            )
        }
        None => "listening...".to_string(),
    }
}

fn print_sheet(sheet: &Sheet) {
    println!("Title: {}", sheet.title);
    if let Some(composer) = &sheet.composer {
        println!("Composer: {}", composer);
    }
    println!("Key: {}", sheet.key);
    println!("Time signature: {}", sheet.time_signature);
    println!("Measures: {}", sheet.measures.len());
    println!();
    for measure in &sheet.measures {
        let notes: Vec<String> = measure
            .notes
            .iter()
            .map(|n| format!("{} ({:.2})", n.pitch, n.duration))
            .collect();
        println!("  {:>3} | {}", measure.number, notes.join("  "));
    }
}
