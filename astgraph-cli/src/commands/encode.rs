use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use astgraph_core::corpus::Corpus;
use astgraph_core::encode::{EncodeSummary, TableWriter};
use astgraph_core::error::AstGraphError;
use astgraph_core::pipeline::{GraphPipeline, PipelineStats};
use astgraph_core::progress::{IndicatifReporter, NoopReporter, ProgressReporter};

use super::ConfigOptions;

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Directory of Java sources, a single Java file, or a JSONL file
    pub input: PathBuf,

    /// Directory the tables are written to
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: ConfigOptions,

    /// Fail with exit code 10 if any unit or method was skipped
    #[arg(long)]
    pub strict: bool,

    /// Summary format: text, json
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub fn run(args: EncodeArgs, quiet: bool) -> anyhow::Result<()> {
    let config = args.options.load()?;

    let corpus = Corpus::discover(&args.input, &config.corpus)
        .map_err(AstGraphError::from)
        .with_context(|| format!("Cannot read corpus at {}", args.input.display()))?;

    let mut writer = TableWriter::create(&args.output, &config.output)
        .map_err(AstGraphError::from)
        .with_context(|| format!("Cannot create output tables in {}", args.output.display()))?;

    let reporter: Box<dyn ProgressReporter> = if quiet {
        Box::new(NoopReporter)
    } else {
        Box::new(IndicatifReporter::new())
    };

    let pipeline = GraphPipeline::new(config);
    let stats = pipeline.run(&corpus, &mut writer, reporter.as_ref())?;
    let written = writer
        .finish()
        .map_err(AstGraphError::from)
        .with_context(|| format!("Cannot flush output tables in {}", args.output.display()))?;

    if !quiet {
        print_summary(&RunSummary { stats: &stats, written }, &args)?;
    }

    if args.strict && stats.is_partial() {
        anyhow::bail!(
            "partial success: {} unit(s) failed, {} method(s) skipped",
            stats.units_failed,
            stats.methods_skipped
        );
    }
    Ok(())
}

/// Pipeline statistics plus the row totals the tables actually received.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    stats: &'a PipelineStats,
    written: EncodeSummary,
}

fn print_summary(summary: &RunSummary<'_>, args: &EncodeArgs) -> anyhow::Result<()> {
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let stats = summary.stats;
    let written = summary.written;
    println!("Encoded {} into {}", args.input.display(), args.output.display());
    println!();
    println!("  Units:    {:>8} ({} failed)", stats.units, stats.units_failed);
    println!(
        "  Methods:  {:>8} ({} skipped, {} filtered)",
        stats.methods, stats.methods_skipped, stats.methods_filtered
    );
    println!("  Nodes:    {:>8}", stats.nodes);
    println!("  Edges:    {:>8}", stats.edges);
    println!(
        "  Written:  {:>8} methods ({} node rows, {} edge rows)",
        written.methods, written.nodes, written.edges
    );
    println!("  Elapsed:  {:>8.2?}", stats.duration);

    if !stats.errors.is_empty() {
        println!();
        println!("  Skipped:");
        for (location, message) in stats.errors.iter().take(10) {
            println!("    {location}: {message}");
        }
        if stats.errors.len() > 10 {
            println!("    ... and {} more", stats.errors.len() - 10);
        }
    }
    Ok(())
}
