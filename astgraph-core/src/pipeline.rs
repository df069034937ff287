// Corpus pipeline: load → parse → extract → assemble → encode.
//
// Units are processed on rayon workers in fixed-size batches; each batch is
// collected in corpus order and written before the next one starts, so the
// tables are identical whatever the thread count. A failing unit or method
// is recorded and skipped; only output I/O aborts the run.

use std::time::{Duration, Instant};

use astgraph_graphs::{FactExtractor, GraphAssembler, JavaSource, MethodGraph};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::AstGraphConfig;
use crate::corpus::{Corpus, CorpusEntry, SourceUnit};
use crate::encode::TableWriter;
use crate::error::{ConfigError, Result};
use crate::progress::ProgressReporter;

const BATCH_SIZE: usize = 256;

/// Graphs built from one source unit, with whatever went wrong on the way.
#[derive(Debug, Default)]
pub struct UnitGraphs {
    pub name: String,
    pub graphs: Vec<MethodGraph>,
    /// `(location, message)` per failure.
    pub errors: Vec<(String, String)>,
    /// The unit itself could not be read or parsed.
    pub failed: bool,
    /// Methods left out by configuration (no body).
    pub filtered: usize,
}

/// Statistics returned by a pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineStats {
    pub units: usize,
    pub units_failed: usize,
    pub methods: usize,
    pub methods_skipped: usize,
    pub methods_filtered: usize,
    pub nodes: usize,
    pub edges: usize,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub duration: Duration,
    pub errors: Vec<(String, String)>,
}

impl PipelineStats {
    /// Whether any unit or method was dropped because of an error.
    pub fn is_partial(&self) -> bool {
        self.units_failed > 0 || self.methods_skipped > 0
    }

    fn absorb(&mut self, unit: &UnitGraphs) {
        self.units += 1;
        if unit.failed {
            self.units_failed += 1;
        } else {
            self.methods_skipped += unit.errors.len();
        }
        self.methods_filtered += unit.filtered;
        self.errors.extend(unit.errors.iter().cloned());
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Turns a corpus into encoded tables.
#[derive(Debug)]
pub struct GraphPipeline {
    config: AstGraphConfig,
    extractor: FactExtractor,
}

impl GraphPipeline {
    pub fn new(config: AstGraphConfig) -> Self {
        let extractor =
            FactExtractor::new().with_identifier_filter(config.extraction.filter_identifiers);
        Self { config, extractor }
    }

    pub fn config(&self) -> &AstGraphConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FactExtractor {
        &self.extractor
    }

    /// Parse a unit with the configured options.
    pub fn parse(&self, unit: &SourceUnit) -> astgraph_graphs::Result<JavaSource> {
        let source = if unit.snippet {
            JavaSource::parse_snippet(&unit.name, &unit.code)?
        } else {
            JavaSource::parse(&unit.name, &unit.code)?
        };
        Ok(source.with_constructors(self.config.extraction.include_constructors))
    }

    /// Build the graph of every method in `unit`, isolating per-method
    /// failures.
    pub fn build_unit(&self, unit: &SourceUnit) -> UnitGraphs {
        let mut out = UnitGraphs {
            name: unit.name.clone(),
            ..UnitGraphs::default()
        };

        let source = match self.parse(unit) {
            Ok(source) => source,
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "Failed to parse unit");
                out.failed = true;
                out.errors.push((unit.name.clone(), e.to_string()));
                return out;
            }
        };

        for method in source.methods() {
            if self.config.pipeline.skip_empty_methods && method.body().is_none() {
                out.filtered += 1;
                continue;
            }
            match self.extractor.extract(&method) {
                Ok(facts) => {
                    out.graphs
                        .push(GraphAssembler::new(method.name()).assemble(&facts));
                }
                Err(e) => {
                    let location = format!(
                        "{}:{}:{}",
                        unit.name,
                        method.span().start_row + 1,
                        method.name()
                    );
                    warn!(location = %location, error = %e, "Skipping method");
                    out.errors.push((location, e.to_string()));
                }
            }
        }

        debug!(unit = %unit.name, methods = out.graphs.len(), "Unit processed");
        out
    }

    fn build_entry(&self, entry: &CorpusEntry) -> UnitGraphs {
        match entry.load() {
            Ok(unit) => self.build_unit(&unit),
            Err(e) => {
                warn!(unit = %entry.name(), error = %e, "Failed to load unit");
                UnitGraphs {
                    name: entry.name().to_string(),
                    errors: vec![(entry.name().to_string(), e.to_string())],
                    failed: true,
                    ..UnitGraphs::default()
                }
            }
        }
    }

    fn thread_pool(&self) -> Result<Option<ThreadPool>> {
        match self.config.pipeline.threads {
            0 => Ok(None),
            threads => ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(Some)
                .map_err(|e| {
                    ConfigError::Invalid(format!("cannot start {threads} threads: {e}")).into()
                }),
        }
    }

    /// Encode every unit of `corpus` into `writer`.
    #[instrument(skip_all, name = "encode_corpus", fields(units = corpus.len()))]
    pub fn run(
        &self,
        corpus: &Corpus,
        writer: &mut TableWriter,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineStats> {
        let start = Instant::now();
        let mut stats = PipelineStats::default();
        let pool = self.thread_pool()?;

        info!(units = corpus.len(), "Encoding corpus");
        progress.start("Encoding", Some(corpus.len() as u64));

        for batch in corpus.entries().chunks(BATCH_SIZE) {
            let build = || -> Vec<UnitGraphs> {
                batch
                    .par_iter()
                    .map(|entry| {
                        let unit = self.build_entry(entry);
                        progress.advance(1);
                        unit
                    })
                    .collect()
            };
            let units = match &pool {
                Some(pool) => pool.install(build),
                None => build(),
            };

            for unit in &units {
                stats.absorb(unit);
                for graph in &unit.graphs {
                    writer.write_graph(&unit.name, graph)?;
                    stats.methods += 1;
                    stats.nodes += graph.node_count();
                    stats.edges += graph.edge_count();
                }
            }
        }

        progress.finish();
        stats.duration = start.elapsed();
        info!(
            units = stats.units,
            methods = stats.methods,
            skipped = stats.methods_skipped,
            failed_units = stats.units_failed,
            nodes = stats.nodes,
            edges = stats.edges,
            duration = ?stats.duration,
            "Corpus encoded"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::OutputSection;
    use crate::progress::NoopReporter;

    fn snippet(name: &str, code: &str) -> CorpusEntry {
        CorpusEntry::Record {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    fn run(config: AstGraphConfig, entries: Vec<CorpusEntry>, out: &Path) -> PipelineStats {
        let pipeline = GraphPipeline::new(config);
        let mut writer = TableWriter::create(out, &OutputSection::default()).unwrap();
        let stats = pipeline
            .run(&Corpus::from_entries(entries), &mut writer, &NoopReporter)
            .unwrap();
        writer.finish().unwrap();
        stats
    }

    #[test]
    fn builds_every_method_of_a_unit() {
        let pipeline = GraphPipeline::new(AstGraphConfig::default());
        let unit = SourceUnit {
            name: "A.java".into(),
            code: "class A {\n  void a() {}\n  class B { int b(int x) { return x; } }\n}\n".into(),
            snippet: false,
        };
        let built = pipeline.build_unit(&unit);
        let names: Vec<_> = built.graphs.iter().map(MethodGraph::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(built.errors.is_empty());
    }

    #[test]
    fn malformed_method_does_not_sink_its_siblings() {
        let pipeline = GraphPipeline::new(AstGraphConfig::default());
        let unit = SourceUnit {
            name: "A.java".into(),
            code: "class A {\n  void good() { f(); }\n  void bad() { int = ; }\n}\n".into(),
            snippet: false,
        };
        let built = pipeline.build_unit(&unit);
        assert!(built.graphs.iter().any(|g| g.name() == "good"));
        assert!(!built.graphs.iter().any(|g| g.name() == "bad"));
        assert!(built.errors.iter().any(|(loc, _)| loc.ends_with(":3:bad")));
    }

    #[test]
    fn skip_empty_methods_filters_bodiless_declarations() {
        let mut config = AstGraphConfig::default();
        config.pipeline.skip_empty_methods = true;
        let pipeline = GraphPipeline::new(config);
        let unit = SourceUnit {
            name: "I.java".into(),
            code: "interface I {\n  void a();\n  default void b() {}\n}\n".into(),
            snippet: false,
        };
        let built = pipeline.build_unit(&unit);
        assert_eq!(built.graphs.len(), 1);
        assert_eq!(built.filtered, 1);
    }

    #[test]
    fn run_counts_match_tables() {
        let dir = tempfile::tempdir().unwrap();
        let stats = run(
            AstGraphConfig::default(),
            vec![
                snippet("r1", "void run(int x) { foo(); }"),
                CorpusEntry::Invalid {
                    location: "m.jsonl:2".into(),
                    message: "bad".into(),
                },
                snippet("r3", "void m(int a) { String s = helper(a); }"),
            ],
            dir.path(),
        );
        assert_eq!(stats.units, 3);
        assert_eq!(stats.units_failed, 1);
        assert_eq!(stats.methods, 2);
        assert!(stats.is_partial());

        let node_counts = std::fs::read_to_string(dir.path().join("num-node-list.csv")).unwrap();
        let total: usize = node_counts.lines().map(|l| l.parse::<usize>().unwrap()).sum();
        let node_rows = std::fs::read_to_string(dir.path().join("node-features.csv")).unwrap();
        assert_eq!(total, node_rows.lines().count());
        assert_eq!(total, stats.nodes);
    }

    #[test]
    fn output_is_independent_of_thread_count() {
        let entries: Vec<_> = (0..40)
            .map(|i| snippet(&format!("r{i}"), &format!("void m{i}(int a{i}) {{ x{i} = f(a{i}); }}")))
            .collect();

        let single = tempfile::tempdir().unwrap();
        let mut config = AstGraphConfig::default();
        config.pipeline.threads = 1;
        run(config, entries.clone(), single.path());

        let many = tempfile::tempdir().unwrap();
        let mut config = AstGraphConfig::default();
        config.pipeline.threads = 4;
        run(config, entries, many.path());

        for name in OutputSection::default().file_names() {
            assert_eq!(
                std::fs::read(single.path().join(name)).unwrap(),
                std::fs::read(many.path().join(name)).unwrap(),
                "{name} differs"
            );
        }
    }

    #[test]
    fn stats_serialize_elapsed_millis() {
        let stats = PipelineStats {
            duration: Duration::from_millis(1500),
            ..PipelineStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
