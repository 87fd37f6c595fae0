use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};
use std::{env, path::PathBuf};

mod convert;
mod csv_out;
mod keymap;
mod midi;
mod tempo;

use convert::{ConvertOptions, convert_file};

/// Convert a MIDI file into a timed key-press CSV for a virtual piano.
///
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, only warnings are shown.
#[derive(Parser, Debug)]
#[command(version, about, verbatim_doc_comment)]
struct Opt {
    /// Standard MIDI file to read
    input: PathBuf,
    /// CSV file to write
    output: PathBuf,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Warn);
    }
    log_builder.init();

    let sched = convert_file(&opt.input, &opt.output, &ConvertOptions::default())?;
    info!(
        "{} key press(es), {} skipped, {} ticks per beat",
        sched.rows.len(),
        sched.dropped,
        sched.ticks_per_beat
    );
    println!(
        "Successfully converted {} to {}",
        opt.input.display(),
        opt.output.display()
    );
    Ok(())
}
