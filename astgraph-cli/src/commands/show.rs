use std::path::PathBuf;

use clap::Args;

use astgraph_core::pipeline::GraphPipeline;

use super::{ConfigOptions, load_units};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Java file, directory or JSONL file
    pub input: PathBuf,

    /// Only show methods with this name
    #[arg(long)]
    pub method: Option<String>,

    /// Output format: text, json, dot
    #[arg(long, default_value = "text", value_parser = ["text", "json", "dot"])]
    pub format: String,

    #[command(flatten)]
    pub options: ConfigOptions,
}

pub fn run(args: ShowArgs) -> anyhow::Result<()> {
    let config = args.options.load()?;
    let units = load_units(&args.input, &config)?;
    let pipeline = GraphPipeline::new(config);

    let mut documents = Vec::new();
    for unit in &units {
        let built = pipeline.build_unit(unit);
        for graph in built
            .graphs
            .iter()
            .filter(|g| args.method.as_deref().is_none_or(|m| g.name() == m))
        {
            match args.format.as_str() {
                "json" => documents.push(serde_json::json!({
                    "unit": unit.name,
                    "graph": graph.document(),
                })),
                "dot" => print!("{}", graph.to_dot()),
                _ => println!("{graph}"),
            }
        }
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&documents)?);
    }
    Ok(())
}
