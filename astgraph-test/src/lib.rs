// Integration test utilities and fixture management for astgraph.

use std::path::{Path, PathBuf};

use astgraph_core::config::{AstGraphConfig, OutputSection};
use astgraph_core::corpus::Corpus;
use astgraph_core::encode::TableWriter;
use astgraph_core::pipeline::{GraphPipeline, PipelineStats};
use astgraph_core::progress::NoopReporter;

/// A temporary corpus on disk.
#[derive(Debug)]
pub struct TestCorpus {
    pub dir: tempfile::TempDir,
    /// What to hand to the pipeline: the directory or a JSONL file in it.
    pub input: PathBuf,
}

impl TestCorpus {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A small Java project covering every relation the assembler emits.
    pub fn java_project() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();

        write(
            root,
            "src/main/java/app/Runner.java",
            "package app;\n\nclass Runner {\n    void run(int x) {\n        foo();\n    }\n\n    String build(int a) {\n        String s = helper(a);\n        return s;\n    }\n\n    void cast(Object obj) {\n        Foo f = (Foo) obj;\n    }\n}\n",
        );
        write(
            root,
            "src/main/java/app/Store.java",
            "package app;\n\nimport java.io.IOException;\nimport java.util.List;\n\nclass Store {\n    private List<String> items;\n\n    void add(String item) throws IOException {\n        this.items.add(item);\n        log.info(item);\n    }\n\n    int pick(boolean first) {\n        if (first) {\n            String x = head();\n        } else {\n            Integer x = tail();\n        }\n        int n;\n        n = count(items);\n        return n;\n    }\n\n    abstract static class Base {\n        abstract Result compute(Input in) throws Failure;\n    }\n}\n",
        );
        // generated sources are excluded by default
        write(
            root,
            "build/generated/Gen.java",
            "class Gen {\n    void gen() {}\n}\n",
        );

        let input = root.to_path_buf();
        Self { dir, input }
    }

    /// A JSONL corpus with one method snippet per `(name, code)` record.
    pub fn jsonl(records: &[(&str, &str)]) -> Self {
        let lines: Vec<String> = records
            .iter()
            .map(|(name, code)| serde_json::json!({ "name": name, "code": code }).to_string())
            .collect();
        Self::jsonl_lines(&lines.join("\n"))
    }

    /// A JSONL corpus with verbatim content.
    pub fn jsonl_lines(content: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let input = dir.path().join("methods.jsonl");
        std::fs::write(&input, content).expect("write jsonl");
        Self { dir, input }
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    std::fs::write(path, content).expect("write file");
}

/// Parsed contents of the output tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub node_counts: Vec<usize>,
    pub edge_counts: Vec<usize>,
    pub nodes: Vec<NodeRow>,
    pub edges: Vec<EdgeRow>,
    /// `(unit, method)`; empty when the index is disabled.
    pub index: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub id: usize,
    pub label: String,
    pub kind: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRow {
    pub relation: u8,
    pub source: usize,
    pub target: usize,
}

/// The rows of one method, cut out of the tables by prefix sums.
#[derive(Debug, Clone, Copy)]
pub struct MethodRows<'a> {
    pub nodes: &'a [NodeRow],
    pub edges: &'a [EdgeRow],
}

impl MethodRows<'_> {
    pub fn label(&self, id: usize) -> &str {
        &self.nodes[id].label
    }

    /// Edges as `(relation_code, source_label, target_label)`.
    pub fn labelled_edges(&self) -> Vec<(u8, &str, &str)> {
        self.edges
            .iter()
            .map(|e| (e.relation, self.label(e.source), self.label(e.target)))
            .collect()
    }
}

impl Tables {
    pub fn read(dir: &Path, output: &OutputSection) -> Self {
        let read = |name: &str| std::fs::read_to_string(dir.join(name)).expect("read table");
        let counts = |name: &str| -> Vec<usize> {
            read(name)
                .lines()
                .map(|l| l.parse().expect("count row"))
                .collect()
        };

        Self {
            node_counts: counts(&output.node_count_file),
            edge_counts: counts(&output.edge_count_file),
            nodes: read(&output.nodes_file).lines().map(parse_node).collect(),
            edges: read(&output.edges_file).lines().map(parse_edge).collect(),
            index: if output.write_index {
                read(&output.index_file)
                    .lines()
                    .map(|l| {
                        let (unit, method) = l.rsplit_once(',').expect("index row");
                        (unit.to_string(), method.to_string())
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }

    pub fn method_count(&self) -> usize {
        self.node_counts.len()
    }

    /// Rows of the `i`-th method.
    pub fn method(&self, i: usize) -> MethodRows<'_> {
        let node_start: usize = self.node_counts[..i].iter().sum();
        let edge_start: usize = self.edge_counts[..i].iter().sum();
        MethodRows {
            nodes: &self.nodes[node_start..node_start + self.node_counts[i]],
            edges: &self.edges[edge_start..edge_start + self.edge_counts[i]],
        }
    }

    /// Rows of the first method named `name`.
    pub fn method_named(&self, name: &str) -> Option<MethodRows<'_>> {
        let i = self.index.iter().position(|(_, m)| m == name)?;
        Some(self.method(i))
    }
}

fn parse_node(line: &str) -> NodeRow {
    let (id, rest) = line.split_once(',').expect("node row id");
    let (label, kind) = rest.rsplit_once(',').expect("node row kind");
    let label = label
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .map_or_else(|| label.to_string(), |l| l.replace("\"\"", "\""));
    NodeRow {
        id: id.parse().expect("node id"),
        label,
        kind: kind.parse().expect("kind code"),
    }
}

fn parse_edge(line: &str) -> EdgeRow {
    let fields: Vec<usize> = line
        .split(',')
        .map(|f| f.parse().expect("edge field"))
        .collect();
    EdgeRow {
        relation: u8::try_from(fields[0]).expect("relation code"),
        source: fields[1],
        target: fields[2],
    }
}

/// Run the full pipeline over `input` into a fresh output directory.
pub fn encode(input: &Path, config: AstGraphConfig) -> (PipelineStats, Tables, tempfile::TempDir) {
    let out = tempfile::tempdir().expect("create output dir");
    let corpus = Corpus::discover(input, &config.corpus).expect("discover corpus");
    let output = config.output.clone();

    let mut writer = TableWriter::create(out.path(), &output).expect("create tables");
    let stats = GraphPipeline::new(config)
        .run(&corpus, &mut writer, &NoopReporter)
        .expect("pipeline run");
    writer.finish().expect("flush tables");

    let tables = Tables::read(out.path(), &output);
    (stats, tables, out)
}
