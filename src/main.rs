use anyhow::{Context, Result};
use carnegie_affiliations::extract::{SegmentPolicy, DEFAULT_AUTHOR_LIMIT};
use carnegie_affiliations::pipeline::{self, PipelineConfig};
use clap::Parser;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "carnegie-affiliations",
    about = "Count Kepler and K2 publications by the Carnegie Classification of their authors' institutions."
)]
struct Cli {
    #[arg(
        short,
        long,
        default_value = "kpub.db",
        help = "kpub database, or a .jsonl/.jsonl.gz export (file or directory)",
        value_name = "PATH"
    )]
    publications: PathBuf,

    #[arg(
        short,
        long,
        default_value = "CCIHE2021-PublicData.csv",
        help = "Carnegie public data table with 'name' and 'basic2021' columns",
        value_name = "CSV"
    )]
    reference: PathBuf,

    #[arg(
        short,
        long,
        default_value = "data/carnegie_aliases.csv",
        help = "Alias table with Affiliation, MergeName and CarnegieClass columns",
        value_name = "CSV"
    )]
    aliases: PathBuf,

    #[arg(
        short,
        long,
        default_value = "CCIHE2021_BASIC2021Classifications.csv",
        help = "Classification values and labels",
        value_name = "CSV"
    )]
    classifications: PathBuf,

    #[arg(
        short,
        long,
        default_value = ".",
        help = "Directory for the output CSV files",
        value_name = "DIR"
    )]
    output_dir: PathBuf,

    #[arg(
        long,
        default_value_t = DEFAULT_AUTHOR_LIMIT,
        help = "Number of leading author affiliations examined per paper"
    )]
    authors: usize,

    #[arg(
        long,
        value_enum,
        default_value_t = SegmentPolicy::First,
        help = "Which ';'-separated locations of an affiliation to examine"
    )]
    segments: SegmentPolicy,

    #[arg(
        long,
        help = "Rebuild the joined table even if affiliations_kepler_k2.csv exists"
    )]
    recompute: bool,

    #[arg(
        long,
        default_value_t = LevelFilter::Info,
        value_parser = parse_level,
        help = "Log level (ERROR, WARN, INFO, DEBUG, TRACE)"
    )]
    log_level: LevelFilter,
}

fn parse_level(input: &str) -> std::result::Result<LevelFilter, String> {
    match input.to_ascii_uppercase().as_str() {
        "ERROR" => Ok(LevelFilter::Error),
        "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        "TRACE" => Ok(LevelFilter::Trace),
        other => Err(format!("Invalid log level: {}", other)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .context("Initialize logger")?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig {
        publications: cli.publications,
        reference: cli.reference,
        aliases: cli.aliases,
        classifications: cli.classifications,
        output_dir: cli.output_dir,
        author_limit: cli.authors,
        segments: cli.segments,
        recompute: cli.recompute,
    };
    let report = pipeline::run(&config)?;
    info!(
        "{} joined affiliations, {} summary rows{}",
        report.joined_rows,
        report.summary_rows,
        if report.reused_joined {
            " (joined table reused)"
        } else {
            ""
        }
    );
    Ok(())
}
