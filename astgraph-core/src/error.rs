/// Top-level astgraph error type.
///
/// All fallible operations in `astgraph-core` return [`Result<T, AstGraphError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum AstGraphError {
    /// Error reading the input corpus (directory walk, JSONL records).
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Error writing the output tables.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error from the graph engine (tree-sitter parsing, malformed methods).
    #[error("Graph engine error: {0}")]
    Graph(#[from] astgraph_graphs::GraphError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors while locating or reading source units.
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    /// The corpus path does not exist.
    #[error("Input not found: {0}")]
    NotFound(String),

    /// A source file or the JSONL file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A JSONL line is not a valid record.
    #[error("Invalid record at {location}: {message}")]
    Record { location: String, message: String },
}

/// Errors from the tabular encoder.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// An output file could not be created, written or flushed.
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors in configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, AstGraphError>`.
pub type Result<T> = std::result::Result<T, AstGraphError>;
