use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use astgraph_core::pipeline::GraphPipeline;

use super::{ConfigOptions, load_units};

#[derive(Args, Debug)]
pub struct FactsArgs {
    /// Java file, directory or JSONL file
    pub input: PathBuf,

    /// Only show methods with this name
    #[arg(long)]
    pub method: Option<String>,

    #[command(flatten)]
    pub options: ConfigOptions,
}

pub fn run(args: FactsArgs) -> anyhow::Result<()> {
    let config = args.options.load()?;
    let units = load_units(&args.input, &config)?;
    let pipeline = GraphPipeline::new(config);

    let mut records = Vec::new();
    for unit in &units {
        let source = pipeline
            .parse(unit)
            .with_context(|| format!("Cannot parse {}", unit.name))?;
        for method in source.methods() {
            if args.method.as_deref().is_some_and(|m| m != method.name()) {
                continue;
            }
            let line = method.span().start_row + 1;
            let record = match pipeline.extractor().extract(&method) {
                Ok(facts) => serde_json::json!({
                    "unit": unit.name,
                    "method": method.name(),
                    "line": line,
                    "facts": facts,
                }),
                Err(e) => serde_json::json!({
                    "unit": unit.name,
                    "method": method.name(),
                    "line": line,
                    "error": e.to_string(),
                }),
            };
            records.push(record);
        }
    }

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
