//! astgraph core library: corpus ingestion, pipeline and tabular encoding.
//!
//! The main entry point is [`pipeline::GraphPipeline`], which reads a
//! [`corpus::Corpus`], builds one identifier graph per Java method and
//! appends it to the tables of an [`encode::TableWriter`].

pub mod config;
pub mod corpus;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod progress;
