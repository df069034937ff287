use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "astgraph.toml";

/// Top-level astgraph configuration, matching `astgraph.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstGraphConfig {
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// Drop relations carrying tokens that are not identifier-shaped.
    pub filter_identifiers: bool,
    /// Treat constructors as methods.
    pub include_constructors: bool,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            filter_identifiers: true,
            include_constructors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// JSONL field holding the method code.
    pub code_field: String,
    /// JSONL field holding an optional display name.
    pub name_field: String,
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.java".into()],
            exclude_patterns: vec![
                "**/target/**".into(),
                "**/build/**".into(),
                "**/.git/**".into(),
            ],
            code_field: "code".into(),
            name_field: "name".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub node_count_file: String,
    pub edge_count_file: String,
    pub nodes_file: String,
    pub edges_file: String,
    pub write_index: bool,
    pub index_file: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            node_count_file: "num-node-list.csv".into(),
            edge_count_file: "num-edge-list.csv".into(),
            nodes_file: "node-features.csv".into(),
            edges_file: "edges.csv".into(),
            write_index: true,
            index_file: "methods.csv".into(),
        }
    }
}

impl OutputSection {
    /// Output file names in the order the encoder opens them. The index is
    /// included only when enabled.
    pub fn file_names(&self) -> Vec<&str> {
        let mut names = vec![
            self.node_count_file.as_str(),
            self.edge_count_file.as_str(),
            self.nodes_file.as_str(),
            self.edges_file.as_str(),
        ];
        if self.write_index {
            names.push(self.index_file.as_str());
        }
        names
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Worker threads; 0 uses the rayon default.
    pub threads: usize,
    /// Skip methods that have no body.
    pub skip_empty_methods: bool,
}

impl AstGraphConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Load `explicit` if given, else `astgraph.toml` under `dir` if present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in self.output.file_names() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "output file names must not be empty".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "output file {name} is used for more than one table"
                )));
            }
        }
        if self.corpus.code_field.is_empty() {
            return Err(ConfigError::Invalid("corpus.code_field must not be empty".into()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_empty_document() {
        let config = AstGraphConfig::from_toml("").unwrap();
        assert_eq!(config, AstGraphConfig::default());
        assert!(config.extraction.filter_identifiers);
        assert!(!config.extraction.include_constructors);
        assert_eq!(config.output.nodes_file, "node-features.csv");
        assert_eq!(config.pipeline.threads, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AstGraphConfig::from_toml(
            "[extraction]\nfilter_identifiers = false\n\n[output]\nedges_file = \"e.csv\"\n",
        )
        .unwrap();
        assert!(!config.extraction.filter_identifiers);
        assert_eq!(config.output.edges_file, "e.csv");
        assert_eq!(config.output.nodes_file, "node-features.csv");
        assert_eq!(config.corpus.include_patterns, vec!["**/*.java"]);
    }

    #[test]
    fn rejects_duplicate_output_names() {
        let err = AstGraphConfig::from_toml("[output]\nedges_file = \"node-features.csv\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn disabled_index_may_share_a_name() {
        let config =
            AstGraphConfig::from_toml("[output]\nwrite_index = false\nindex_file = \"edges.csv\"\n")
                .unwrap();
        assert_eq!(config.output.file_names().len(), 4);
    }

    #[test]
    fn rejects_empty_output_name() {
        let err = AstGraphConfig::from_toml("[output]\nnodes_file = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = AstGraphConfig::from_toml("[output\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn discover_prefers_explicit_then_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AstGraphConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config, AstGraphConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[pipeline]\nthreads = 2\n",
        )
        .unwrap();
        let config = AstGraphConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.pipeline.threads, 2);

        let missing = dir.path().join("nope.toml");
        let err = AstGraphConfig::discover(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AstGraphConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[extraction]"));
        assert_eq!(AstGraphConfig::from_toml(&text).unwrap(), config);
    }
}
