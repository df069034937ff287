use astgraph_core::error::{AstGraphError, ConfigError, CorpusError};
use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "astgraph",
    version,
    about = "Encode Java methods as typed identifier graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into an exit code.
///
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: input not found
///   4: output I/O error
///   10: partial success (`--strict` and some units or methods skipped)
///
/// Typed errors anywhere in the chain decide first; the message is only
/// consulted for errors raised as plain text.
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AstGraphError>() {
            return match e {
                AstGraphError::Config(_) => 2,
                AstGraphError::Corpus(CorpusError::NotFound(_)) => 3,
                AstGraphError::Encode(_) => 4,
                AstGraphError::Corpus(_) | AstGraphError::Graph(_) => 1,
            };
        }
        if cause.is::<ConfigError>() {
            return 2;
        }
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("partial success") {
        10
    } else if lower.contains("input not found") || lower.contains("cannot resolve path") {
        3
    } else if lower.contains("encode error") || lower.contains("cannot create output") {
        4
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command, cli.quiet) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_input_not_found() {
        let err = anyhow::anyhow!("Corpus error: Input not found: /nonexistent");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_config() {
        let err = anyhow::anyhow!("Cannot load config: Parse error: expected `]`");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_output() {
        let err = anyhow::anyhow!("Cannot create output tables in /ro/out")
            .context("Encode error: IO error writing /ro/out/edges.csv: denied");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_partial() {
        let err = anyhow::anyhow!("partial success: 1 unit failed, 2 methods skipped");
        assert_eq!(classify_exit_code(&err), 10);
    }

    #[test]
    fn typed_errors_win_over_paths_in_messages() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = anyhow::Error::new(AstGraphError::from(
            astgraph_core::error::EncodeError::Io {
                path: "/srv/configs/out/edges.csv".to_string(),
                source: denied,
            },
        ))
        .context("Cannot flush output tables in /srv/configs/out");
        assert_eq!(classify_exit_code(&err), 4);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = anyhow::Error::new(AstGraphError::from(CorpusError::Io {
            path: "/srv/configs/A.java".to_string(),
            source: missing,
        }));
        assert_eq!(classify_exit_code(&err), 1);

        let err = anyhow::Error::new(AstGraphError::from(CorpusError::NotFound(
            "/srv/configs".to_string(),
        )))
        .context("Cannot read corpus at /srv/configs");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn bare_config_error_in_chain() {
        let err = anyhow::Error::new(ConfigError::NotFound("/etc/astgraph.toml".to_string()))
            .context("Cannot load config");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
