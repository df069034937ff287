//! Tabular encoding of method graphs.
//!
//! Four append-only tables per run, plus an optional method index:
//!
//! | table        | row                              |
//! |--------------|----------------------------------|
//! | node counts  | `node_count`                     |
//! | edge counts  | `edge_count`                     |
//! | nodes        | `sequence_id,label,kind_code`    |
//! | edges        | `relation_code,source_id,target_id` |
//! | index        | `unit,method`                    |
//!
//! Count rows line up one-to-one with methods; consumers split the node and
//! edge tables by prefix sums of the counts.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use astgraph_graphs::MethodGraph;
use serde::Serialize;

use crate::config::OutputSection;
use crate::error::EncodeError;

/// Rows of one graph, rendered before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGraph {
    pub node_count: usize,
    pub edge_count: usize,
    pub node_rows: String,
    pub edge_rows: String,
}

impl EncodedGraph {
    pub fn render(graph: &MethodGraph) -> Self {
        let mut node_rows = String::new();
        for (id, node) in graph.nodes() {
            let _ = writeln!(node_rows, "{id},{},{}", csv_field(&node.label), node.kind.code());
        }
        let mut edge_rows = String::new();
        for edge in graph.edges() {
            let _ = writeln!(
                edge_rows,
                "{},{},{}",
                edge.relation.code(),
                edge.source,
                edge.target
            );
        }
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            node_rows,
            edge_rows,
        }
    }
}

/// Quote a field when it holds a separator, a quote or a line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Totals written by a [`TableWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncodeSummary {
    pub methods: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug)]
struct Table {
    path: PathBuf,
    out: BufWriter<File>,
}

impl Table {
    fn create(dir: &Path, name: &str) -> Result<Self, EncodeError> {
        let path = dir.join(name);
        let file = File::create(&path).map_err(|source| io_error(&path, source))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    fn write(&mut self, rows: &str) -> Result<(), EncodeError> {
        self.out
            .write_all(rows.as_bytes())
            .map_err(|source| io_error(&self.path, source))
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        self.out
            .flush()
            .map_err(|source| io_error(&self.path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> EncodeError {
    EncodeError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Owns the output files of one run. Files are truncated on creation and
/// closed on drop; call [`finish`](Self::finish) to surface flush errors.
#[derive(Debug)]
pub struct TableWriter {
    node_counts: Table,
    edge_counts: Table,
    nodes: Table,
    edges: Table,
    index: Option<Table>,
    summary: EncodeSummary,
}

impl TableWriter {
    /// Create (or truncate) the output files under `dir`, creating `dir`
    /// if needed.
    pub fn create(dir: &Path, output: &OutputSection) -> Result<Self, EncodeError> {
        std::fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
        Ok(Self {
            node_counts: Table::create(dir, &output.node_count_file)?,
            edge_counts: Table::create(dir, &output.edge_count_file)?,
            nodes: Table::create(dir, &output.nodes_file)?,
            edges: Table::create(dir, &output.edges_file)?,
            index: if output.write_index {
                Some(Table::create(dir, &output.index_file)?)
            } else {
                None
            },
            summary: EncodeSummary::default(),
        })
    }

    /// Append one method's rows to every table.
    pub fn write_graph(&mut self, unit: &str, graph: &MethodGraph) -> Result<(), EncodeError> {
        self.write_encoded(unit, graph.name(), &EncodedGraph::render(graph))
    }

    pub fn write_encoded(
        &mut self,
        unit: &str,
        method: &str,
        encoded: &EncodedGraph,
    ) -> Result<(), EncodeError> {
        self.node_counts.write(&format!("{}\n", encoded.node_count))?;
        self.edge_counts.write(&format!("{}\n", encoded.edge_count))?;
        self.nodes.write(&encoded.node_rows)?;
        self.edges.write(&encoded.edge_rows)?;
        if let Some(index) = &mut self.index {
            index.write(&format!("{},{}\n", csv_field(unit), csv_field(method)))?;
        }

        self.summary.methods += 1;
        self.summary.nodes += encoded.node_count;
        self.summary.edges += encoded.edge_count;
        Ok(())
    }

    /// Flush every table and return the totals.
    pub fn finish(mut self) -> Result<EncodeSummary, EncodeError> {
        self.node_counts.flush()?;
        self.edge_counts.flush()?;
        self.nodes.flush()?;
        self.edges.flush()?;
        if let Some(index) = &mut self.index {
            index.flush()?;
        }
        Ok(self.summary)
    }
}
