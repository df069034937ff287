pub mod assembler;
pub mod facts;
pub mod method_graph;
pub mod normalize;
pub mod syntax;

use serde::{Deserialize, Serialize};

pub use assembler::GraphAssembler;
pub use facts::{
    CallArgument, CallScope, CallVar, Cast, FactExtractor, MethodFacts, SourceKind, SourceRef,
    TypedName, VarAssign,
};
pub use method_graph::{
    DocumentNode, GraphDocument, IdentifierNode, MethodGraph, NodeKind, Relation, RelationEdge,
};
pub use syntax::{JavaSource, MethodSyntax};

/// Error type for the graph engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Malformed method {method}: {message}")]
    MalformedMethod { method: String, message: String },

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

// ── Span type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl From<tree_sitter::Range> for TextRange {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_row: r.start_point.row,
            start_col: r.start_point.column,
            end_row: r.end_point.row,
            end_col: r.end_point.column,
        }
    }
}
