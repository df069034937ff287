//! Corpus ingestion: where the Java source comes from.
//!
//! A corpus is a directory tree of `.java` files, a single Java file, or a
//! line-delimited JSON file with one method snippet per record. Discovery
//! is cheap and sequential; reading file contents is deferred to
//! [`CorpusEntry::load`] so the pipeline can do it on its workers.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CorpusSection;
use crate::error::CorpusError;

/// Java source ready for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Display name used in the method index and in error locations.
    pub name: String,
    pub code: String,
    /// A bare member snippet that must be wrapped in a class before parsing.
    pub snippet: bool,
}

/// One discovered unit, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusEntry {
    File { name: String, path: PathBuf },
    Record { name: String, code: String },
    /// A JSONL line that could not be turned into a record.
    Invalid { location: String, message: String },
}

impl CorpusEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Record { name, .. } => name,
            Self::Invalid { location, .. } => location,
        }
    }

    /// Read the unit's source.
    pub fn load(&self) -> Result<SourceUnit, CorpusError> {
        match self {
            Self::File { name, path } => {
                let code = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Ok(SourceUnit {
                    name: name.clone(),
                    code,
                    snippet: false,
                })
            }
            Self::Record { name, code } => Ok(SourceUnit {
                name: name.clone(),
                code: code.clone(),
                snippet: true,
            }),
            Self::Invalid { location, message } => Err(CorpusError::Record {
                location: location.clone(),
                message: message.clone(),
            }),
        }
    }
}

/// Discovered units in a stable order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Discover the units under `path`.
    ///
    /// Directories are walked with the configured glob patterns; files with a
    /// `.jsonl` or `.json` extension are read as JSONL; any other file is a
    /// single compilation unit.
    pub fn discover(path: &Path, config: &CorpusSection) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::NotFound(path.display().to_string()));
        }
        let entries = if path.is_dir() {
            walk_directory(path, config)
        } else if is_jsonl(path) {
            read_jsonl(path, config)?
        } else {
            vec![CorpusEntry::File {
                name: file_display_name(path),
                path: path.to_path_buf(),
            }]
        };
        debug!(path = %path.display(), units = entries.len(), "Corpus discovered");
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("json"))
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}

fn walk_directory(root: &Path, config: &CorpusSection) -> Vec<CorpusEntry> {
    let excludes: Vec<Pattern> = config
        .exclude_patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %p, error = %e, "Invalid exclude pattern");
                None
            }
        })
        .collect();

    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let mut files = Vec::new();
    for pattern in &config.include_patterns {
        let full_pattern = format!("{escaped_root}/{pattern}");
        match glob::glob(&full_pattern) {
            Ok(paths) => {
                for entry in paths.flatten() {
                    if entry.is_file() && !is_excluded(&entry, root, &excludes) {
                        files.push(entry);
                    }
                }
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
            }
        }
    }

    files.sort();
    files.dedup();

    files
        .into_iter()
        .map(|path| {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            CorpusEntry::File { name, path }
        })
        .collect()
}

fn is_excluded(path: &Path, root: &Path, excludes: &[Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let options = MatchOptions {
        require_literal_separator: false,
        ..MatchOptions::new()
    };
    excludes
        .iter()
        .any(|pattern| pattern.matches_path_with(relative, options))
}

fn read_jsonl(path: &Path, config: &CorpusSection) -> Result<Vec<CorpusEntry>, CorpusError> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map_or_else(|| "record".to_string(), |s| s.to_string_lossy().to_string());

    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let line_no = index + 1;
            parse_record(line, config).map_or_else(
                |message| CorpusEntry::Invalid {
                    location: format!("{}:{line_no}", path.display()),
                    message,
                },
                |(name, code)| CorpusEntry::Record {
                    name: name.unwrap_or_else(|| format!("{stem}:{line_no}")),
                    code,
                },
            )
        })
        .collect())
}

fn parse_record(line: &str, config: &CorpusSection) -> Result<(Option<String>, String), String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let Value::Object(record) = value else {
        return Err("record is not a JSON object".to_string());
    };
    let code = record
        .get(&config.code_field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing string field `{}`", config.code_field))?;
    let name = record
        .get(&config.name_field)
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok((name, code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn names(corpus: &Corpus) -> Vec<&str> {
        corpus.entries().iter().map(CorpusEntry::name).collect()
    }

    #[test]
    fn walks_java_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/b/B.java", "class B {}");
        write(dir.path(), "src/a/A.java", "class A {}");
        write(dir.path(), "README.md", "# hi");
        write(dir.path(), "target/gen/G.java", "class G {}");

        let corpus = Corpus::discover(dir.path(), &CorpusSection::default()).unwrap();
        assert_eq!(names(&corpus), vec!["src/a/A.java", "src/b/B.java"]);

        let unit = corpus.entries()[0].load().unwrap();
        assert_eq!(unit.code, "class A {}");
        assert!(!unit.snippet);
    }

    #[test]
    fn single_file_is_one_unit() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Only.java", "class Only {}");
        let corpus =
            Corpus::discover(&dir.path().join("Only.java"), &CorpusSection::default()).unwrap();
        assert_eq!(names(&corpus), vec!["Only.java"]);
    }

    #[test]
    fn jsonl_records_are_snippets() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "methods.jsonl",
            "{\"name\": \"first\", \"code\": \"void a() {}\"}\n\n{\"code\": \"void b() {}\", \"repo\": \"x\"}\n",
        );
        let corpus =
            Corpus::discover(&dir.path().join("methods.jsonl"), &CorpusSection::default())
                .unwrap();
        assert_eq!(names(&corpus), vec!["first", "methods:3"]);
        let unit = corpus.entries()[1].load().unwrap();
        assert_eq!(unit.code, "void b() {}");
        assert!(unit.snippet);
    }

    #[test]
    fn bad_jsonl_lines_become_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "m.jsonl",
            "not json\n{\"name\": \"n\"}\n[1, 2]\n{\"code\": \"void ok() {}\"}\n",
        );
        let corpus =
            Corpus::discover(&dir.path().join("m.jsonl"), &CorpusSection::default()).unwrap();
        assert_eq!(corpus.len(), 4);
        let failures = corpus
            .entries()
            .iter()
            .filter(|e| matches!(e.load(), Err(CorpusError::Record { .. })))
            .count();
        assert_eq!(failures, 3);
        assert!(corpus.entries()[1].name().ends_with("m.jsonl:2"));
    }

    #[test]
    fn custom_field_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "m.jsonl", "{\"id\": \"k\", \"body\": \"void k() {}\"}\n");
        let config = CorpusSection {
            code_field: "body".into(),
            name_field: "id".into(),
            ..CorpusSection::default()
        };
        let corpus = Corpus::discover(&dir.path().join("m.jsonl"), &config).unwrap();
        assert_eq!(
            corpus.entries()[0],
            CorpusEntry::Record {
                name: "k".into(),
                code: "void k() {}".into()
            }
        );
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = Corpus::discover(Path::new("/definitely/not/here"), &CorpusSection::default())
            .unwrap_err();
        assert!(matches!(err, CorpusError::NotFound(_)));
    }
}
