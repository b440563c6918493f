use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use sample_corpus::{
    load_audio_corpus, load_corpus, Corpus, Criteria, LoadOptions, Sample,
};

/// Summarise and filter a labeled sample table.
#[derive(Parser, Debug)]
#[command(name = "sample-corpus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Load a sample table, filter it by metadata and print a summary")]
struct Cli {
    /// Sample table (.parquet, .json or .csv)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Metadata filter, `field=value` or `field=v1,v2` (repeatable)
    #[arg(short, long = "filter", value_name = "FIELD=VALUES")]
    filters: Vec<String>,

    /// Treat rows as audio (consumes the rate / channel columns)
    #[arg(short, long)]
    audio: bool,

    /// Print the first N matching samples
    #[arg(short, long, default_value_t = 0, value_name = "N")]
    show: usize,

    /// JSON file with column names and defaults (see `LoadOptions`)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the payload column (overrides the config file)
    #[arg(long, value_name = "COLUMN")]
    data_column: Option<String>,

    /// Sample rate for rows without a rate column
    #[arg(long, value_name = "HZ")]
    default_rate: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => LoadOptions::from_json_file(path)?,
        None => LoadOptions::default(),
    };
    if let Some(col) = &cli.data_column {
        options.data_column = col.clone();
    }
    if cli.default_rate.is_some() {
        options.default_rate = cli.default_rate;
    }

    let criteria = cli
        .filters
        .iter()
        .map(|arg| Criteria::parse_assignment(arg))
        .collect::<Result<Criteria>>()?;

    if cli.audio {
        let corpus = load_audio_corpus(&cli.input, &options)
            .with_context(|| format!("loading {}", cli.input.display()))?;
        report(&corpus, &criteria, cli.show, |s| s.to_string())
    } else {
        let corpus = load_corpus(&cli.input, &options)
            .with_context(|| format!("loading {}", cli.input.display()))?;
        report(&corpus, &criteria, cli.show, |s| {
            format!("Data : {} values\n{}", s.data().len(), s.meta())
        })
    }
}

fn report<S: Sample>(
    corpus: &Corpus<S>,
    criteria: &Criteria,
    show: usize,
    describe: impl Fn(&S) -> String,
) -> Result<()> {
    let selected = if criteria.is_empty() {
        corpus.clone()
    } else {
        let selected = corpus.filter(criteria)?;
        info!("{} of {} samples match", selected.len(), corpus.len());
        selected
    };

    println!("{selected}");

    let shown = selected.slice(..show.min(selected.len()))?;
    for (i, sample) in shown.iter().enumerate() {
        println!("\nSample #{i}:\n{}", describe(sample));
    }
    Ok(())
}
