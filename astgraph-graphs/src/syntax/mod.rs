//! Java syntax layer.
//!
//! Parses Java source with tree-sitter and exposes each method declaration
//! as a [`MethodSyntax`]: name, parameters, thrown exceptions, optional body,
//! and a pre-order "find all sub-nodes of kind K" query over the body.

mod helpers;

use tree_sitter::{Node, Parser, Tree};

use crate::{GraphError, Result, TextRange};

pub use helpers::{node_text, type_name};
use helpers::{
    child_by_field, collect_kinds, find_child_by_kind, find_first_kind, named_children,
    node_range,
};

// Bare method snippets (one JSONL record per method) are parsed inside a
// synthetic class so the grammar sees a class body.
const SNIPPET_PREFIX: &str = "class __AstGraphSnippet {\n";
const SNIPPET_SUFFIX: &str = "\n}\n";

/// A parsed Java compilation unit.
#[derive(Debug)]
pub struct JavaSource {
    source: String,
    tree: Tree,
    include_constructors: bool,
}

impl JavaSource {
    /// Parse a full compilation unit.
    pub fn parse(path: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let source = source.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| GraphError::TreeSitter(format!("Failed to set language: {e}")))?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| GraphError::Parse {
                path: path.into(),
                message: "tree-sitter parse returned None".to_string(),
            })?;

        Ok(Self {
            source,
            tree,
            include_constructors: false,
        })
    }

    /// Parse a code fragment made of class-body members (typically a single
    /// method declaration).
    pub fn parse_snippet(path: impl Into<String>, code: &str) -> Result<Self> {
        Self::parse(path, format!("{SNIPPET_PREFIX}{code}{SNIPPET_SUFFIX}"))
    }

    /// Also treat constructors as methods.
    #[must_use]
    pub fn with_constructors(mut self, include: bool) -> Self {
        self.include_constructors = include;
        self
    }

    /// Whether tree-sitter had to recover from syntax errors anywhere in the unit.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Every method declaration in the unit, in source order, including
    /// methods of nested and anonymous classes.
    pub fn methods(&self) -> Vec<MethodSyntax<'_>> {
        let kinds: &[&str] = if self.include_constructors {
            &["method_declaration", "constructor_declaration"]
        } else {
            &["method_declaration"]
        };

        let mut nodes = Vec::new();
        collect_kinds(self.tree.root_node(), kinds, &mut nodes);

        nodes
            .into_iter()
            .filter_map(|node| {
                let name = node_text(child_by_field(node, "name")?, &self.source);
                Some(MethodSyntax {
                    node,
                    source: &self.source,
                    name,
                })
            })
            .collect()
    }
}

/// Sub-node kinds the fact extractor queries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    /// Local variable declarators, enhanced-`for` variables, try resources.
    Declarator,
    /// Method invocations.
    Call,
    /// Cast expressions.
    Cast,
    /// Assignments, compound operators included.
    Assignment,
}

impl SyntaxKind {
    fn tree_sitter_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Declarator => &["variable_declarator", "enhanced_for_statement", "resource"],
            Self::Call => &["method_invocation"],
            Self::Cast => &["cast_expression"],
            Self::Assignment => &["assignment_expression"],
        }
    }
}

/// One method declaration inside a [`JavaSource`].
#[derive(Debug, Clone, Copy)]
pub struct MethodSyntax<'a> {
    node: Node<'a>,
    source: &'a str,
    name: &'a str,
}

impl<'a> MethodSyntax<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn is_constructor(&self) -> bool {
        self.node.kind() == "constructor_declaration"
    }

    pub fn span(&self) -> TextRange {
        node_range(self.node)
    }

    /// Whether the declaration contains tree-sitter error recovery nodes.
    pub fn is_malformed(&self) -> bool {
        self.node.has_error()
    }

    pub fn body(&self) -> Option<Node<'a>> {
        child_by_field(self.node, "body")
    }

    pub fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    /// Thrown exception type names, in declaration order.
    pub fn exceptions(&self) -> Vec<&'a str> {
        let Some(throws) = find_child_by_kind(self.node, "throws") else {
            return Vec::new();
        };
        named_children(throws)
            .into_iter()
            .filter_map(|ty| type_name(ty, self.source))
            .collect()
    }

    /// Formal parameters in declaration order. Receiver parameters are skipped.
    pub fn parameters(&self) -> Vec<ParameterSyntax<'a>> {
        let Some(params) = child_by_field(self.node, "parameters") else {
            return Vec::new();
        };

        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "formal_parameter" => Some(ParameterSyntax {
                    name: self.text(child_by_field(param, "name")?),
                    type_name: child_by_field(param, "type")
                        .and_then(|ty| type_name(ty, self.source)),
                }),
                "spread_parameter" => {
                    // String... args: the declarator holds the name
                    let declarator = find_child_by_kind(param, "variable_declarator")?;
                    let ty = named_children(param).into_iter().find(|c| {
                        !matches!(
                            c.kind(),
                            "modifiers" | "annotation" | "marker_annotation" | "variable_declarator"
                        )
                    });
                    Some(ParameterSyntax {
                        name: self.text(child_by_field(declarator, "name")?),
                        type_name: ty.and_then(|ty| type_name(ty, self.source)),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// All sub-nodes of `kind` in the body, pre-order. Empty without a body.
    pub fn find_all(&self, kind: SyntaxKind) -> Vec<Node<'a>> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        collect_kinds(body, kind.tree_sitter_kinds(), &mut out);
        out
    }

    pub fn declarators(&self) -> Vec<DeclaratorSyntax<'a>> {
        self.find_all(SyntaxKind::Declarator)
            .into_iter()
            .filter_map(|node| self.declarator(node))
            .collect()
    }

    fn declarator(&self, node: Node<'a>) -> Option<DeclaratorSyntax<'a>> {
        let name = self.text(child_by_field(node, "name")?);
        let (type_node, initializer) = match node.kind() {
            "variable_declarator" => {
                let parent = node.parent()?;
                if !matches!(
                    parent.kind(),
                    "local_variable_declaration" | "field_declaration" | "constant_declaration"
                ) {
                    return None;
                }
                (child_by_field(parent, "type"), child_by_field(node, "value"))
            }
            // the iterable of an enhanced for is not the variable's initializer
            "enhanced_for_statement" => (child_by_field(node, "type"), None),
            "resource" => (child_by_field(node, "type"), child_by_field(node, "value")),
            _ => return None,
        };

        Some(DeclaratorSyntax {
            name,
            type_name: type_node.and_then(|ty| type_name(ty, self.source)),
            first_call: initializer
                .and_then(|init| find_first_kind(init, "method_invocation"))
                .and_then(|call| child_by_field(call, "name"))
                .map(|n| self.text(n)),
        })
    }

    pub fn calls(&self) -> Vec<CallSyntax<'a>> {
        self.find_all(SyntaxKind::Call)
            .into_iter()
            .filter_map(|node| {
                let name = self.text(child_by_field(node, "name")?);
                let scope = child_by_field(node, "object").map(|s| self.text(s));
                let arguments = child_by_field(node, "arguments")
                    .map(|args| {
                        named_children(args)
                            .into_iter()
                            .map(|arg| self.operand(arg))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(CallSyntax {
                    name,
                    scope,
                    arguments,
                })
            })
            .collect()
    }

    pub fn casts(&self) -> Vec<CastSyntax<'a>> {
        self.find_all(SyntaxKind::Cast)
            .into_iter()
            .filter_map(|node| {
                Some(CastSyntax {
                    expression: self.text(child_by_field(node, "value")?),
                    type_name: child_by_field(node, "type")
                        .and_then(|ty| type_name(ty, self.source)),
                })
            })
            .collect()
    }

    pub fn assignments(&self) -> Vec<AssignmentSyntax<'a>> {
        self.find_all(SyntaxKind::Assignment)
            .into_iter()
            .filter_map(|node| {
                Some(AssignmentSyntax {
                    target: self.operand(child_by_field(node, "left")?),
                    value: self.operand(child_by_field(node, "right")?),
                })
            })
            .collect()
    }

    fn operand(&self, node: Node<'_>) -> Operand<'a> {
        match node.kind() {
            "method_invocation" => child_by_field(node, "name")
                .map_or(Operand::Other, |name| Operand::Call(self.text(name))),
            "identifier" => Operand::Name(self.text(node)),
            _ => Operand::Other,
        }
    }
}

/// A formal parameter: name and declared class name, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSyntax<'a> {
    pub name: &'a str,
    pub type_name: Option<&'a str>,
}

/// A local declarator with its declared class name and the name of the first
/// call (pre-order) inside its initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaratorSyntax<'a> {
    pub name: &'a str,
    pub type_name: Option<&'a str>,
    pub first_call: Option<&'a str>,
}

/// A method invocation: callee name, receiver text, classified arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSyntax<'a> {
    pub name: &'a str,
    pub scope: Option<&'a str>,
    pub arguments: Vec<Operand<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastSyntax<'a> {
    pub expression: &'a str,
    pub type_name: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentSyntax<'a> {
    pub target: Operand<'a>,
    pub value: Operand<'a>,
}

/// Shape of an expression as far as the graph cares: a call, a bare name,
/// or anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
    Call(&'a str),
    Name(&'a str),
    Other,
}
