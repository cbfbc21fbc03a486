//! Command-line front end for the CTC greedy decoder.
//!
//! Reads a JSON decode request, loads the decoder configuration from the usual
//! sources, applies command-line overrides and prints the decoded batch as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ctc_greedy_decoder::{
    config::{DecoderConfig, ExecutionMode},
    request::DecodeRequest,
    telemetry::{init_tracing, LogFormat, TracingConfig},
    GreedyDecoder, TensorLayout,
};

#[derive(Parser, Debug)]
#[command(name = "ctc-decode", about = "Greedy CTC decoding of a batch of score sequences")]
struct Args {
    /// JSON file with `shape`, `scores` and optional `sequence_lengths`.
    input: PathBuf,

    /// Explicit TOML/YAML configuration file instead of the default lookup.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blank class index (defaults to the last class).
    #[arg(long)]
    blank_index: Option<usize>,

    /// Keep consecutive repeated labels instead of merging them.
    #[arg(long)]
    no_merge: bool,

    /// Time extent of the output rows.
    #[arg(long)]
    output_time_dim: Option<usize>,

    /// Scores are stored as `[T, N, 1, C]`.
    #[arg(long)]
    time_major: bool,

    /// Force sequential execution.
    #[arg(long)]
    sequential: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Pretty-print the response.
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn apply(&self, mut config: DecoderConfig) -> DecoderConfig {
        if let Some(blank) = self.blank_index {
            config.blank_index = Some(blank);
        }
        if self.no_merge {
            config.merge_repeated = false;
        }
        if let Some(time) = self.output_time_dim {
            config.output_time_dim = Some(time);
        }
        if self.time_major {
            config.layout = TensorLayout::TimeMajor;
        }
        if self.sequential {
            config.execution = ExecutionMode::Sequential;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(TracingConfig {
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let config = match &args.config {
        Some(path) => DecoderConfig::load_from(path)?,
        None => DecoderConfig::load()?,
    };
    let config = args.apply(config);
    let decoder = GreedyDecoder::new(config).context("Failed to create decoder")?;

    let request = DecodeRequest::from_file(&args.input)
        .with_context(|| format!("Failed to read request {:?}", args.input))?;
    let response = request.run(&decoder)?;
    info!(
        sequences = response.decoded_lengths.len(),
        "Decoded batch"
    );

    let output = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", output);

    Ok(())
}
