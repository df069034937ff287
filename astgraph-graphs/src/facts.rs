//! Fact extraction: the flat relation views a method graph is assembled from.
//!
//! Every view is derived independently from the method's syntax; a method
//! without a body simply yields empty body views.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::normalize::{is_identifier, scope_token};
use crate::syntax::{MethodSyntax, Operand};
use crate::{GraphError, Result};

/// Whether an argument or assignment source is a call or a plain name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Call,
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedName {
    pub name: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cast {
    pub expression: String,
    pub type_name: String,
}

/// `Type var = call(...)`: the variable depends on the first call of its
/// initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallVar {
    pub call: String,
    pub var: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallScope {
    pub call: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallArgument {
    pub call: String,
    pub argument: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarAssign {
    pub target: String,
    pub source: SourceRef,
}

/// Relation views of one method, in the order the assembler consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFacts {
    pub exceptions: Vec<String>,
    pub parameters: Vec<TypedName>,
    /// Local declarators; the same name may appear more than once.
    pub variables: Vec<TypedName>,
    pub casts: Vec<Cast>,
    /// Distinct call names in first-seen order.
    pub calls: Vec<String>,
    pub call_var_dependency: Vec<CallVar>,
    pub call_scopes: Vec<CallScope>,
    pub call_arguments: Vec<CallArgument>,
    pub var_assigns: Vec<VarAssign>,
}

/// Derives [`MethodFacts`] from a [`MethodSyntax`].
#[derive(Debug, Clone, Copy)]
pub struct FactExtractor {
    filter_identifiers: bool,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FactExtractor {
    /// Extractor with the identifier filter enabled.
    pub fn new() -> Self {
        Self {
            filter_identifiers: true,
        }
    }

    /// Toggle the identifier filter. When enabled, any relation carrying a
    /// token that is not identifier-shaped is dropped.
    #[must_use]
    pub fn with_identifier_filter(mut self, enabled: bool) -> Self {
        self.filter_identifiers = enabled;
        self
    }

    pub fn extract(&self, method: &MethodSyntax<'_>) -> Result<MethodFacts> {
        if method.is_malformed() {
            return Err(GraphError::MalformedMethod {
                method: method.name().to_string(),
                message: "declaration contains syntax errors".to_string(),
            });
        }

        let facts = MethodFacts {
            exceptions: self.exceptions(method),
            parameters: self.parameters(method),
            variables: self.variables(method),
            casts: self.casts(method),
            calls: self.calls(method),
            call_var_dependency: self.call_var_dependency(method),
            call_scopes: self.call_scopes(method),
            call_arguments: self.call_arguments(method),
            var_assigns: self.var_assigns(method),
        };

        trace!(
            method = method.name(),
            parameters = facts.parameters.len(),
            variables = facts.variables.len(),
            calls = facts.calls.len(),
            "Extracted method facts"
        );
        Ok(facts)
    }

    fn accepts(&self, tokens: &[&str]) -> bool {
        !self.filter_identifiers || tokens.iter().all(|token| is_identifier(token))
    }

    fn typed_name(&self, name: &str, type_name: Option<&str>) -> Option<TypedName> {
        let mut tokens = vec![name];
        tokens.extend(type_name);
        self.accepts(&tokens).then(|| TypedName {
            name: name.to_string(),
            type_name: type_name.map(str::to_string),
        })
    }

    pub fn exceptions(&self, method: &MethodSyntax<'_>) -> Vec<String> {
        method
            .exceptions()
            .into_iter()
            .filter(|name| self.accepts(&[*name]))
            .map(str::to_string)
            .collect()
    }

    pub fn parameters(&self, method: &MethodSyntax<'_>) -> Vec<TypedName> {
        method
            .parameters()
            .into_iter()
            .filter_map(|p| self.typed_name(p.name, p.type_name))
            .collect()
    }

    pub fn variables(&self, method: &MethodSyntax<'_>) -> Vec<TypedName> {
        method
            .declarators()
            .into_iter()
            .filter_map(|d| self.typed_name(d.name, d.type_name))
            .collect()
    }

    /// Casts to a class type. Casts to primitives carry no type name and are
    /// skipped.
    pub fn casts(&self, method: &MethodSyntax<'_>) -> Vec<Cast> {
        method
            .casts()
            .into_iter()
            .filter_map(|c| {
                let type_name = c.type_name?;
                self.accepts(&[c.expression, type_name]).then(|| Cast {
                    expression: c.expression.to_string(),
                    type_name: type_name.to_string(),
                })
            })
            .collect()
    }

    pub fn calls(&self, method: &MethodSyntax<'_>) -> Vec<String> {
        let mut seen = HashSet::new();
        method
            .calls()
            .into_iter()
            .filter(|c| self.accepts(&[c.name]))
            .filter(|c| seen.insert(c.name))
            .map(|c| c.name.to_string())
            .collect()
    }

    pub fn call_var_dependency(&self, method: &MethodSyntax<'_>) -> Vec<CallVar> {
        method
            .declarators()
            .into_iter()
            .filter_map(|d| {
                let call = d.first_call?;
                self.accepts(&[call, d.name]).then(|| CallVar {
                    call: call.to_string(),
                    var: d.name.to_string(),
                })
            })
            .collect()
    }

    pub fn call_scopes(&self, method: &MethodSyntax<'_>) -> Vec<CallScope> {
        method
            .calls()
            .into_iter()
            .filter_map(|c| {
                let scope = scope_token(c.scope?)?;
                self.accepts(&[c.name, scope.as_str()]).then(|| CallScope {
                    call: c.name.to_string(),
                    scope,
                })
            })
            .collect()
    }

    pub fn call_arguments(&self, method: &MethodSyntax<'_>) -> Vec<CallArgument> {
        method
            .calls()
            .into_iter()
            .flat_map(|c| {
                let call = c.name;
                c.arguments
                    .into_iter()
                    .filter_map(source_ref)
                    .filter(|arg| self.accepts(&[call, arg.name.as_str()]))
                    .map(|argument| CallArgument {
                        call: call.to_string(),
                        argument,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Assignments to a bare name from a call or a bare name.
    pub fn var_assigns(&self, method: &MethodSyntax<'_>) -> Vec<VarAssign> {
        method
            .assignments()
            .into_iter()
            .filter_map(|a| {
                let Operand::Name(target) = a.target else {
                    return None;
                };
                let source = source_ref(a.value)?;
                self.accepts(&[target, source.name.as_str()]).then(|| VarAssign {
                    target: target.to_string(),
                    source,
                })
            })
            .collect()
    }
}

fn source_ref(operand: Operand<'_>) -> Option<SourceRef> {
    match operand {
        Operand::Call(name) => Some(SourceRef {
            name: name.to_string(),
            kind: SourceKind::Call,
        }),
        Operand::Name(name) => Some(SourceRef {
            name: name.to_string(),
            kind: SourceKind::Var,
        }),
        Operand::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::JavaSource;

    fn facts_of(body: &str) -> MethodFacts {
        facts_with(FactExtractor::new(), body)
    }

    fn facts_with(extractor: FactExtractor, member: &str) -> MethodFacts {
        let unit = JavaSource::parse_snippet("Test.java", member).unwrap();
        let methods = unit.methods();
        extractor.extract(&methods[0]).unwrap()
    }

    fn typed(name: &str, type_name: Option<&str>) -> TypedName {
        TypedName {
            name: name.to_string(),
            type_name: type_name.map(str::to_string),
        }
    }

    fn src(name: &str, kind: SourceKind) -> SourceRef {
        SourceRef {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn exceptions_and_parameters() {
        let facts = facts_of("void m(String s, int n) throws IOException { }");
        assert_eq!(facts.exceptions, vec!["IOException"]);
        assert_eq!(
            facts.parameters,
            vec![typed("s", Some("String")), typed("n", None)]
        );
    }

    #[test]
    fn bodiless_method_yields_signature_views_only() {
        let facts = facts_of("abstract Foo m(Bar b) throws E;");
        assert_eq!(facts.exceptions, vec!["E"]);
        assert_eq!(facts.parameters, vec![typed("b", Some("Bar"))]);
        assert!(facts.variables.is_empty());
        assert!(facts.calls.is_empty());
        assert!(facts.casts.is_empty());
        assert!(facts.var_assigns.is_empty());
    }

    #[test]
    fn variables_keep_duplicates() {
        let facts = facts_of(
            "void m() { if (a) { String x = \"\"; } else { Integer x = 1; } int y; }",
        );
        assert_eq!(
            facts.variables,
            vec![
                typed("x", Some("String")),
                typed("x", Some("Integer")),
                typed("y", None),
            ]
        );
    }

    #[test]
    fn casts_skip_primitive_targets() {
        let facts = facts_of("void m() { Foo f = (Foo) obj; int i = (int) d; }");
        assert_eq!(
            facts.casts,
            vec![Cast {
                expression: "obj".to_string(),
                type_name: "Foo".to_string()
            }]
        );
    }

    #[test]
    fn casts_of_expressions_are_filtered() {
        let member = "void m() { Foo f = (Foo) make(x); }";
        assert!(facts_of(member).casts.is_empty());

        let unfiltered = facts_with(FactExtractor::new().with_identifier_filter(false), member);
        assert_eq!(unfiltered.casts[0].expression, "make(x)");
    }

    #[test]
    fn calls_are_distinct_in_first_seen_order() {
        let facts = facts_of("void m() { b(); a(); b(); x.a(); }");
        assert_eq!(facts.calls, vec!["b", "a"]);
    }

    #[test]
    fn call_var_dependency_uses_first_call() {
        let facts = facts_of("void m() { String s = a.b().c(); int n = 3; T t = wrap(inner()); }");
        assert_eq!(
            facts.call_var_dependency,
            vec![
                CallVar { call: "c".to_string(), var: "s".to_string() },
                CallVar { call: "wrap".to_string(), var: "t".to_string() },
            ]
        );
    }

    #[test]
    fn call_scopes_take_the_last_receiver_segment() {
        let facts = facts_of("void m() { this.items.add(x); foo(); builder.with(a).build(); }");
        assert_eq!(
            facts.call_scopes,
            vec![
                CallScope { call: "add".to_string(), scope: "items".to_string() },
                CallScope { call: "build".to_string(), scope: "with".to_string() },
                CallScope { call: "with".to_string(), scope: "builder".to_string() },
            ]
        );
    }

    #[test]
    fn call_scopes_drop_non_identifier_receivers() {
        let facts = facts_of("void m() { new Foo().run(); \"s\".trim(); }");
        assert!(facts.call_scopes.is_empty());
    }

    #[test]
    fn call_arguments_are_tagged() {
        let facts = facts_of("void m(int a) { helper(a, compute(), 1, b.c); }");
        assert_eq!(
            facts.call_arguments,
            vec![
                CallArgument { call: "helper".to_string(), argument: src("a", SourceKind::Var) },
                CallArgument {
                    call: "helper".to_string(),
                    argument: src("compute", SourceKind::Call)
                },
            ]
        );
    }

    #[test]
    fn var_assigns_need_a_bare_target() {
        let facts = facts_of("void m() { x = load(); y = x; this.z = x; w = 1; v += u; }");
        assert_eq!(
            facts.var_assigns,
            vec![
                VarAssign { target: "x".to_string(), source: src("load", SourceKind::Call) },
                VarAssign { target: "y".to_string(), source: src("x", SourceKind::Var) },
                VarAssign { target: "v".to_string(), source: src("u", SourceKind::Var) },
            ]
        );
    }

    #[test]
    fn malformed_method_is_an_error() {
        let unit = JavaSource::parse_snippet("Test.java", "void m() { int = ; }").unwrap();
        let methods = unit.methods();
        assert_eq!(methods.len(), 1, "recovery keeps the declaration");
        assert!(methods[0].is_malformed());
        let err = FactExtractor::new().extract(&methods[0]).unwrap_err();
        assert!(matches!(err, GraphError::MalformedMethod { ref method, .. } if method == "m"));
    }

    #[test]
    fn deeply_nested_initializer_is_extracted() {
        let terms = vec!["\"s\""; 20_000].join(" + ");
        let facts = facts_of(&format!("void m() {{ String s = {terms} + tail(); }}"));
        assert_eq!(facts.calls, vec!["tail".to_string()]);
        assert_eq!(
            facts.call_var_dependency,
            vec![CallVar { call: "tail".to_string(), var: "s".to_string() }]
        );
    }

    #[test]
    fn wrapped_chain_scopes_match_one_line_form() {
        let wrapped = facts_of("void m() {\n  builder.add(\n      a,\n      b)\n    .build();\n}");
        let one_line = facts_of("void m() { builder.add(a, b).build(); }");
        assert_eq!(wrapped.call_scopes, one_line.call_scopes);
        assert!(wrapped.call_scopes.contains(&CallScope {
            call: "build".to_string(),
            scope: "add".to_string(),
        }));
    }

    #[test]
    fn facts_serialize_with_lowercase_kinds() {
        let facts = facts_of("void m() { f(x); }");
        let json = serde_json::to_value(&facts).unwrap();
        assert_eq!(json["call_arguments"][0]["argument"]["kind"], "var");
    }
}
