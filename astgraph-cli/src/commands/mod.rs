pub mod config;
pub mod encode;
pub mod facts;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};

use astgraph_core::config::AstGraphConfig;
use astgraph_core::corpus::{Corpus, SourceUnit};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a corpus of Java methods into graph tables
    Encode(encode::EncodeArgs),
    /// Print the graphs of a file or JSONL corpus
    Show(show::ShowArgs),
    /// Print the relation views extracted from each method as JSON
    Facts(facts::FactsArgs),
    /// Print the effective configuration
    Config(config::ConfigArgs),
}

pub fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Encode(args) => encode::run(args, quiet),
        Command::Show(args) => show::run(args),
        Command::Facts(args) => facts::run(args),
        Command::Config(args) => config::run(&args),
    }
}

/// Configuration source and per-run overrides shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Configuration file (default: ./astgraph.toml if present)
    #[arg(long, env = "ASTGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep relations whose tokens are not identifier-shaped
    #[arg(long)]
    pub no_filter: bool,

    /// Treat constructors as methods
    #[arg(long)]
    pub constructors: bool,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    pub threads: Option<usize>,
}

impl ConfigOptions {
    /// Load the configuration and apply command-line overrides.
    pub fn load(&self) -> anyhow::Result<AstGraphConfig> {
        let cwd = std::env::current_dir().context("Cannot resolve path: current directory")?;
        let mut config = AstGraphConfig::discover(self.config.as_deref(), &cwd)
            .context("Cannot load config")?;

        if self.no_filter {
            config.extraction.filter_identifiers = false;
        }
        if self.constructors {
            config.extraction.include_constructors = true;
        }
        if let Some(threads) = self.threads {
            config.pipeline.threads = threads;
        }
        config.validate().context("Invalid config after overrides")?;
        Ok(config)
    }
}

/// Load every unit of the corpus at `path`, in corpus order. Units that
/// cannot be read are reported and skipped.
pub fn load_units(path: &Path, config: &AstGraphConfig) -> anyhow::Result<Vec<SourceUnit>> {
    let corpus = Corpus::discover(path, &config.corpus)
        .map_err(astgraph_core::error::AstGraphError::from)
        .with_context(|| format!("Cannot read corpus at {}", path.display()))?;

    Ok(corpus
        .entries()
        .iter()
        .filter_map(|entry| match entry.load() {
            Ok(unit) => Some(unit),
            Err(e) => {
                tracing::warn!(unit = %entry.name(), error = %e, "Skipping unit");
                None
            }
        })
        .collect())
}
