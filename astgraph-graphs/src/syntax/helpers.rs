use tree_sitter::{Node, TreeCursor};

use crate::TextRange;

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Named children, skipping comments and other extras.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Convert a tree-sitter node to a `TextRange`.
pub fn node_range(node: Node<'_>) -> TextRange {
    node.range().into()
}

/// Visit `node` and its descendants in pre-order until `visit` returns
/// `false`.
///
/// Walks with a [`TreeCursor`] rather than recursion; expression trees
/// (long `+` chains, nested builders) can be deeper than a worker stack.
fn preorder<'a>(node: Node<'a>, mut visit: impl FnMut(Node<'a>) -> bool) {
    let mut cursor: TreeCursor<'a> = node.walk();
    let mut depth = 0usize;
    loop {
        if !visit(cursor.node()) {
            return;
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if depth == 0 {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// Collect every node under (and including) `node` whose kind is in `kinds`,
/// in pre-order.
pub fn collect_kinds<'a>(node: Node<'a>, kinds: &[&str], out: &mut Vec<Node<'a>>) {
    preorder(node, |n| {
        if kinds.contains(&n.kind()) {
            out.push(n);
        }
        true
    });
}

/// First node of `kind` under (and including) `node`, in pre-order.
pub fn find_first_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut found = None;
    preorder(node, |n| {
        if n.kind() == kind {
            found = Some(n);
        }
        found.is_none()
    });
    found
}

/// Simple class name of a type node.
///
/// `List<String>` gives `List`, `Map.Entry` gives `Entry`, `Foo[]` gives
/// `Foo`. Primitive types, `void` and the inferred `var` have no class name.
pub fn type_name<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "type_identifier" => {
            let name = node_text(node, source);
            (name != "var").then_some(name)
        }
        "generic_type" => {
            // List<String>: the base type comes first
            let base = named_children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
            type_name(base, source)
        }
        "scoped_type_identifier" => {
            // Map.Entry: the last segment names the class
            let last = named_children(node)
                .into_iter()
                .rev()
                .find(|c| c.kind() == "type_identifier")?;
            Some(node_text(last, source))
        }
        "array_type" => type_name(child_by_field(node, "element")?, source),
        "annotated_type" => named_children(node)
            .into_iter()
            .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
            .find_map(|c| type_name(c, source)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_java(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn local_type(decl: &str) -> Option<String> {
        let source = format!("class T {{ void m() {{ {decl} }} }}");
        let tree = parse_java(&source);
        let local = find_first_kind(tree.root_node(), "local_variable_declaration").unwrap();
        let ty = child_by_field(local, "type").unwrap();
        type_name(ty, &source).map(str::to_string)
    }

    #[test]
    fn simple_and_generic_types() {
        assert_eq!(local_type("String s;").as_deref(), Some("String"));
        assert_eq!(local_type("List<String> xs;").as_deref(), Some("List"));
        assert_eq!(
            local_type("Map<String, List<Integer>> m;").as_deref(),
            Some("Map")
        );
    }

    #[test]
    fn scoped_and_array_types() {
        assert_eq!(local_type("Map.Entry<K, V> e;").as_deref(), Some("Entry"));
        assert_eq!(local_type("Foo[] foos;").as_deref(), Some("Foo"));
    }

    #[test]
    fn primitive_and_inferred_types_have_no_name() {
        assert_eq!(local_type("int i;"), None);
        assert_eq!(local_type("boolean[] flags;"), None);
        assert_eq!(local_type("var v = 1;"), None);
    }

    #[test]
    fn collect_kinds_is_preorder() {
        let source = "class T { void m() { a(b(), c()); } }";
        let tree = parse_java(source);
        let mut calls = Vec::new();
        collect_kinds(tree.root_node(), &["method_invocation"], &mut calls);
        let names: Vec<_> = calls
            .iter()
            .map(|c| node_text(child_by_field(*c, "name").unwrap(), source))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn find_first_kind_stops_at_first_match() {
        let source = "class T { void m() { int x = 1 + f(g()) + h(); } }";
        let tree = parse_java(source);
        let call = find_first_kind(tree.root_node(), "method_invocation").unwrap();
        assert_eq!(node_text(child_by_field(call, "name").unwrap(), source), "f");
        assert!(find_first_kind(tree.root_node(), "cast_expression").is_none());
    }

    #[test]
    fn walks_survive_deeply_nested_expressions() {
        // a left-nested binary_expression chain far deeper than a recursive
        // walk could follow on a test thread's stack
        let terms = vec!["\"s\""; 20_000].join(" + ");
        let source = format!("class T {{ void m() {{ String s = {terms} + tail(); }} }}");
        let tree = parse_java(&source);

        let mut calls = Vec::new();
        collect_kinds(tree.root_node(), &["method_invocation"], &mut calls);
        assert_eq!(calls.len(), 1);

        let call = find_first_kind(tree.root_node(), "method_invocation").unwrap();
        assert_eq!(node_text(child_by_field(call, "name").unwrap(), &source), "tail");
    }
}
