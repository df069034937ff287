//! Graph assembly: turns [`MethodFacts`] into a [`MethodGraph`].
//!
//! Passes run in a fixed order and each one only adds nodes and edges, so
//! the outcome depends on that order. Later passes look up what earlier
//! passes created: a call argument can only bind to a parameter that pass 2
//! already placed.

use petgraph::graph::NodeIndex;
use tracing::{debug, trace};

use crate::facts::{MethodFacts, SourceKind, SourceRef, TypedName};
use crate::method_graph::{MethodGraph, NodeKind, Relation};

/// Builds the identifier graph of one method.
#[derive(Debug)]
pub struct GraphAssembler {
    graph: MethodGraph,
}

impl GraphAssembler {
    pub fn new(method: &str) -> Self {
        Self {
            graph: MethodGraph::new(method),
        }
    }

    /// Run every pass over `facts` and return the finished graph.
    pub fn assemble(mut self, facts: &MethodFacts) -> MethodGraph {
        self.add_exceptions(&facts.exceptions);
        self.add_parameters(&facts.parameters);
        self.add_variables(&facts.variables);
        self.add_casts(facts);
        self.add_calls(&facts.calls);
        self.link_call_variables(facts);
        self.link_call_scopes(facts);
        self.link_call_arguments(facts);
        self.link_assignments(facts);
        self.contain_isolated();

        debug!(
            method = self.graph.name(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Assembled method graph"
        );
        self.graph
    }

    fn root(&self) -> NodeIndex {
        self.graph.root()
    }

    fn pass_done(&self, pass: &str) {
        trace!(
            pass,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Assembler pass complete"
        );
    }

    /// `ROOT --DEPENDS_ON--> IMPORT` for a referenced type.
    fn depend_on(&mut self, type_name: &str) -> NodeIndex {
        let (import, _) = self.graph.ensure_node(type_name, NodeKind::Import);
        let root = self.root();
        self.graph.add_edge(root, import, Relation::DependsOn);
        import
    }

    fn add_typed(&mut self, declared: &TypedName, kind: NodeKind, relation: Relation) {
        let (node, _) = self.graph.ensure_node(&declared.name, kind);
        let root = self.root();
        self.graph.add_edge(root, node, relation);
        if let Some(type_name) = &declared.type_name {
            let import = self.depend_on(type_name);
            self.graph.add_edge(node, import, Relation::Type);
        }
    }

    fn add_exceptions(&mut self, exceptions: &[String]) {
        for exception in exceptions {
            self.depend_on(exception);
        }
        self.pass_done("exceptions");
    }

    fn add_parameters(&mut self, parameters: &[TypedName]) {
        for param in parameters {
            self.add_typed(param, NodeKind::Param, Relation::Parameter);
        }
        self.pass_done("parameters");
    }

    fn add_variables(&mut self, variables: &[TypedName]) {
        for var in variables {
            // first declaration of a name wins
            if self.graph.find(&var.name, NodeKind::Var).is_some() {
                continue;
            }
            self.add_typed(var, NodeKind::Var, Relation::Defines);
        }
        self.pass_done("variables");
    }

    fn add_casts(&mut self, facts: &MethodFacts) {
        let root = self.root();
        for cast in &facts.casts {
            let (var, created) = self.graph.ensure_node(&cast.expression, NodeKind::Var);
            if created {
                self.graph.add_edge(root, var, Relation::Defines);
            }
            let (import, created) = self.graph.ensure_node(&cast.type_name, NodeKind::Import);
            if created {
                self.graph.add_edge(root, import, Relation::DependsOn);
            }
            self.graph.add_edge(var, import, Relation::Type);
        }
        self.pass_done("casts");
    }

    fn add_calls(&mut self, calls: &[String]) {
        for call in calls {
            self.graph.ensure_node(call, NodeKind::Call);
        }
        self.pass_done("calls");
    }

    fn link_call_variables(&mut self, facts: &MethodFacts) {
        for dep in &facts.call_var_dependency {
            let (Some(call), Some(var)) = (
                self.graph.find(&dep.call, NodeKind::Call),
                self.graph.find(&dep.var, NodeKind::Var),
            ) else {
                continue;
            };
            if !self.graph.connected(var, call) {
                self.graph.add_edge(var, call, Relation::Calls);
            }
        }
        self.pass_done("call variables");
    }

    fn link_call_scopes(&mut self, facts: &MethodFacts) {
        for scope in &facts.call_scopes {
            let Some(call) = self.graph.find(&scope.call, NodeKind::Call) else {
                continue;
            };
            match self.graph.find_any(&scope.scope) {
                Some(node) => {
                    if !self.graph.connected(node, call) {
                        self.graph.add_edge(node, call, Relation::Scope);
                    }
                }
                None => {
                    let (id, _) = self.graph.ensure_node(&scope.scope, NodeKind::Id);
                    self.graph.add_edge(id, call, Relation::Scope);
                }
            }
        }
        self.pass_done("call scopes");
    }

    fn link_call_arguments(&mut self, facts: &MethodFacts) {
        for arg in &facts.call_arguments {
            let Some(call) = self.graph.find(&arg.call, NodeKind::Call) else {
                continue;
            };
            let Some(target) = self.resolve_source(&arg.argument) else {
                continue;
            };
            self.graph.add_edge(call, target, Relation::Arg);
        }
        self.pass_done("call arguments");
    }

    fn link_assignments(&mut self, facts: &MethodFacts) {
        for assign in &facts.var_assigns {
            let Some(var) = self.graph.find(&assign.target, NodeKind::Var) else {
                continue;
            };
            let Some(source) = self.resolve_source(&assign.source) else {
                continue;
            };
            if !self.graph.connected(var, source) {
                self.graph.add_edge(var, source, Relation::RelatedTo);
            }
        }
        self.pass_done("assignments");
    }

    /// Bind an argument or assignment source to a node.
    ///
    /// Calls must already exist; names fall back from parameter to variable
    /// to a fresh `ID` node.
    fn resolve_source(&mut self, source: &SourceRef) -> Option<NodeIndex> {
        match source.kind {
            SourceKind::Call => self.graph.find(&source.name, NodeKind::Call),
            SourceKind::Var => Some(
                self.graph
                    .find(&source.name, NodeKind::Param)
                    .or_else(|| self.graph.find(&source.name, NodeKind::Var))
                    .unwrap_or_else(|| self.graph.ensure_node(&source.name, NodeKind::Id).0),
            ),
        }
    }

    fn contain_isolated(&mut self) {
        let root = self.root();
        let isolated: Vec<NodeIndex> = self
            .graph
            .nodes()
            .map(|(id, _)| NodeIndex::new(id))
            .filter(|&node| node != root && !self.graph.has_incident_edge(node))
            .collect();
        for node in isolated {
            self.graph.add_edge(root, node, Relation::Contains);
        }
        self.pass_done("contains");
    }
}
