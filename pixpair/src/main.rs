use std::fs;
use std::path::PathBuf;

use clap::Parser;

use pixpair::data::record::{assemble_frames, ClusterRecord};
use pixpair::pairing::engine::{pair_frames, PairingConfig};

/// Pair pixel-detector clusters into particle tracks, frame by frame.
#[derive(Parser, Debug)]
#[command(name = "pixpair")]
struct Args {
    /// JSON file holding the decoded cluster records.
    input: PathBuf,
    /// Where to write the per-frame pairing reports; stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Largest group size handed to the exhaustive matching search.
    #[arg(long, default_value_t = pixpair::pairing::solver::DEFAULT_MAX_EXACT_GROUP)]
    max_exact_group: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let raw = fs::read_to_string(&args.input)?;
    let records: Vec<ClusterRecord> = serde_json::from_str(&raw)?;
    let mut frames = assemble_frames(&records)?;

    let config = PairingConfig {
        max_exact_group: args.max_exact_group,
        ..PairingConfig::default()
    };
    let reports = pair_frames(&mut frames, &config);

    let rendered = serde_json::to_string_pretty(&reports)?;
    match args.output {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}
