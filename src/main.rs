//! humanclick CLI - corpus inspection and dry-run entry point
//!
//! Loads a trajectory corpus, prints what the bank covers and composes a few
//! sample moves against a recording pointer, without touching the real mouse.
//!
//! Usage: `humanclick [corpus.json] [config.json]`

use std::env;
use std::process::ExitCode;

use humanclick::config::Settings;
use humanclick::input::{PointerDriver, RecordingPointer};
use humanclick::motion::{Displacement, NoPause};
use humanclick::{load_bank, HumanClick};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAMPLE_TARGETS: [(i32, i32); 4] = [(300, 0), (-150, 220), (40, -35), (600, 450)];

fn main() -> ExitCode {
    println!("humanclick - human-like mouse paths");
    println!("===================================");
    println!();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut settings = match args.get(1) {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                println!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };
    if let Some(path) = args.first() {
        settings.corpus.path = path.into();
    }

    let bank = match load_bank(&settings.corpus) {
        Ok(bank) => bank,
        Err(e) => {
            println!("Failed to load corpus {}: {}", settings.corpus.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("Corpus: {}", settings.corpus.path.display());
    println!("  - Trajectories: {}", bank.len());
    println!("  - Displacements: {}", bank.stats());
    println!();

    let mut clicker = HumanClick::with_pacer(settings, NoPause::default()).with_bank(bank);

    if let Some(composer) = clicker.composer() {
        println!("Closest recordings:");
        for (dx, dy) in SAMPLE_TARGETS {
            if let Some(info) = composer.path_info(Displacement::new(dx as f64, dy as f64)) {
                println!(
                    "  - ({}, {}): path {} ({:.1} away, {} points, {:.1}px long)",
                    dx, dy, info.index, info.distance, info.num_points, info.path_length
                );
            }
        }
        println!();
    }

    println!("Dry-run moves from (0, 0):");
    let mut rng = StdRng::from_entropy();
    for target in SAMPLE_TARGETS {
        let mut pointer = RecordingPointer::new((0, 0));
        match clicker.move_to(&mut pointer, &mut rng, target) {
            Ok(report) => {
                let end = pointer.position().unwrap_or_default();
                println!(
                    "  - {:?}: {:?} after {} segments, {} waypoints, ended at {:?} ({:?} playback)",
                    target,
                    report.path.outcome,
                    report.path.segments,
                    report.execution.moves,
                    end,
                    report.execution.elapsed
                );
            }
            Err(e) => println!("  - {:?}: failed: {}", target, e),
        }
    }

    ExitCode::SUCCESS
}
