use clap::Args;

use astgraph_core::config::AstGraphConfig;

use super::ConfigOptions;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub options: ConfigOptions,

    /// Print the built-in defaults, ignoring any config file
    #[arg(long)]
    pub defaults: bool,
}

pub fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = if args.defaults {
        AstGraphConfig::default()
    } else {
        args.options.load()?
    };
    print!("{}", config.to_toml()?);
    Ok(())
}
