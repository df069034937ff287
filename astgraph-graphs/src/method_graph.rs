// Identifier graph of a single method.
//
// Nodes are keyed by (label, kind); edges by (source, target, relation).
// Sequence ids are petgraph node indices: nodes are never removed, so they
// are dense and follow insertion order, starting at 0 for the root.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

// ── Node kinds ────────────────────────────────────────────────────────

/// Role of an identifier in the method. The discriminant order is the
/// encoded `kind_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// The method itself.
    Root,
    Param,
    /// A referenced type (declared, cast-to or thrown).
    Import,
    Var,
    Call,
    /// An identifier the method uses but never declares.
    Id,
}

impl NodeKind {
    pub const ALL: [Self; 6] = [
        Self::Root,
        Self::Param,
        Self::Import,
        Self::Var,
        Self::Call,
        Self::Id,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Param => "PARAM",
            Self::Import => "IMPORT",
            Self::Var => "VAR",
            Self::Call => "CALL",
            Self::Id => "ID",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Relations ─────────────────────────────────────────────────────────

/// Edge label. The discriminant order is the encoded `relation_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    DependsOn,
    Parameter,
    Type,
    Defines,
    Calls,
    Scope,
    Arg,
    RelatedTo,
    Contains,
}

impl Relation {
    pub const ALL: [Self; 9] = [
        Self::DependsOn,
        Self::Parameter,
        Self::Type,
        Self::Defines,
        Self::Calls,
        Self::Scope,
        Self::Arg,
        Self::RelatedTo,
        Self::Contains,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DependsOn => "DEPENDS_ON",
            Self::Parameter => "PARAMETER",
            Self::Type => "TYPE",
            Self::Defines => "DEFINES",
            Self::Calls => "CALLS",
            Self::Scope => "SCOPE",
            Self::Arg => "ARG",
            Self::RelatedTo => "RELATED_TO",
            Self::Contains => "CONTAINS",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nodes and edges ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierNode {
    pub label: String,
    pub kind: NodeKind,
}

/// An edge as seen from outside the graph, with endpoints as sequence ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub relation: Relation,
    pub source: usize,
    pub target: usize,
}

// ── Method graph ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MethodGraph {
    name: String,
    graph: DiGraph<IdentifierNode, Relation>,
    root: NodeIndex,
    /// (label, kind) → node.
    by_key: HashMap<(String, NodeKind), NodeIndex>,
    /// label → earliest inserted non-root node carrying it.
    by_label: HashMap<String, NodeIndex>,
    edge_keys: HashSet<(NodeIndex, NodeIndex, Relation)>,
}

impl MethodGraph {
    /// A graph holding only the root node for method `name`.
    pub fn new(name: &str) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(IdentifierNode {
            label: name.to_string(),
            kind: NodeKind::Root,
        });
        let mut by_key = HashMap::new();
        by_key.insert((name.to_string(), NodeKind::Root), root);
        Self {
            name: name.to_string(),
            graph,
            root,
            by_key,
            by_label: HashMap::new(),
            edge_keys: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, index: NodeIndex) -> &IdentifierNode {
        &self.graph[index]
    }

    /// The node identified by `(label, kind)`.
    pub fn find(&self, label: &str, kind: NodeKind) -> Option<NodeIndex> {
        self.by_key.get(&(label.to_string(), kind)).copied()
    }

    /// Any non-root node labelled `label`, whatever its kind. When several
    /// kinds share the label, the earliest inserted node is returned.
    pub fn find_any(&self, label: &str) -> Option<NodeIndex> {
        self.by_label.get(label).copied()
    }

    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex, relation: Relation) -> bool {
        self.edge_keys.contains(&(source, target, relation))
    }

    /// Whether any edge, whatever its relation, runs from `source` to `target`.
    pub fn connected(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.graph.contains_edge(source, target)
    }

    pub fn has_incident_edge(&self, node: NodeIndex) -> bool {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .next()
            .is_some()
            || self
                .graph
                .edges_directed(node, Direction::Incoming)
                .next()
                .is_some()
    }

    /// Nodes in insertion order with their sequence ids.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &IdentifierNode)> + '_ {
        self.graph
            .node_indices()
            .map(|index| (index.index(), &self.graph[index]))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = RelationEdge> + '_ {
        self.graph.raw_edges().iter().map(|edge| RelationEdge {
            relation: edge.weight,
            source: edge.source().index(),
            target: edge.target().index(),
        })
    }

    /// Edges rendered as `source --RELATION-> target`, in insertion order.
    pub fn describe_edges(&self) -> Vec<String> {
        self.edges()
            .map(|e| {
                format!(
                    "{} --{}-> {}",
                    self.graph[NodeIndex::new(e.source)].label,
                    e.relation,
                    self.graph[NodeIndex::new(e.target)].label
                )
            })
            .collect()
    }

    /// Serializable snapshot of the graph.
    pub fn document(&self) -> GraphDocument {
        GraphDocument {
            name: self.name.clone(),
            nodes: self
                .nodes()
                .map(|(id, node)| DocumentNode {
                    id,
                    label: node.label.clone(),
                    kind: node.kind,
                })
                .collect(),
            edges: self.edges().collect(),
        }
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape_dot(&self.name));
        let _ = writeln!(out, "  node [shape=box];");
        for (id, node) in self.nodes() {
            let _ = writeln!(
                out,
                "  n{id} [label=\"{} / {}\"];",
                escape_dot(&node.label),
                node.kind
            );
        }
        for edge in self.edges() {
            let _ = writeln!(
                out,
                "  n{} -> n{} [label=\"{}\"];",
                edge.source, edge.target, edge.relation
            );
        }
        out.push_str("}\n");
        out
    }

    // ── Mutation (assembler only) ──────────────────────────────────────

    /// Return the node for `(label, kind)`, creating it if needed. The flag is
    /// true when the node was created by this call.
    pub(crate) fn ensure_node(&mut self, label: &str, kind: NodeKind) -> (NodeIndex, bool) {
        debug_assert_ne!(kind, NodeKind::Root, "a graph has exactly one root");
        if let Some(&index) = self.by_key.get(&(label.to_string(), kind)) {
            return (index, false);
        }
        let index = self.graph.add_node(IdentifierNode {
            label: label.to_string(),
            kind,
        });
        self.by_key.insert((label.to_string(), kind), index);
        self.by_label.entry(label.to_string()).or_insert(index);
        (index, true)
    }

    /// Insert `source --relation--> target` unless that exact triple exists.
    /// Returns whether an edge was added.
    pub(crate) fn add_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        relation: Relation,
    ) -> bool {
        if !self.edge_keys.insert((source, target, relation)) {
            return false;
        }
        self.graph.add_edge(source, target, relation);
        true
    }
}

impl fmt::Display for MethodGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "graph {{")?;
        for (_, node) in self.nodes() {
            writeln!(f, "\tnode: {} / {}", node.label, node.kind)?;
        }
        for edge in self.describe_edges() {
            writeln!(f, "\tedge: {edge}")?;
        }
        writeln!(f, "}}")
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

// ── Serializable form ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub name: String,
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<RelationEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: usize,
    pub label: String,
    pub kind: NodeKind,
}
