// Textual normalization of tokens pulled out of the syntax tree.
//
// Both helpers are heuristics over source text, not symbol resolution. They
// live here, apart from the extractor, so their limits stay visible.

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_\p{Sc}][\p{L}\p{N}_\p{Sc}]*$").expect("identifier pattern is valid")
});

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\(.*?\)").expect("parenthesized pattern is valid"));

/// Whether `token` is shaped like a Java identifier: a letter, underscore or
/// currency sign, then letters, digits, underscores or currency signs.
///
/// Keywords are not rejected.
pub fn is_identifier(token: &str) -> bool {
    IDENTIFIER.is_match(token)
}

/// Reduce a call's receiver text to the token the graph binds the call to.
///
/// Runs of whitespace are collapsed to one space, so a receiver wrapped
/// over several lines reduces exactly like its one-line form. Parenthesized
/// groups are then stripped (non-greedy) so the arguments of an earlier call
/// in a chain are not mistaken for the receiver. The last non-empty
/// dot-separated segment wins:
///
/// - `list` → `list`
/// - `this.items` → `items`
/// - `builder.add(x).add(y)` → `add`
/// - `get(a.b)` → `get`
///
/// Returns `None` when nothing is left.
pub fn scope_token(scope: &str) -> Option<String> {
    let collapsed = scope.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = PARENTHESIZED.replace_all(&collapsed, "");
    stripped
        .split('.')
        .map(str::trim)
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        for token in ["x", "_tmp", "$proxy", "camelCase2", "ñandú", "€rate", "this"] {
            assert!(is_identifier(token), "{token} should be accepted");
        }
    }

    #[test]
    fn rejects_expression_fragments() {
        for token in ["", "1x", "a.b", "foo()", "a + b", "\"str\"", "42", "new Foo", "x[0]"] {
            assert!(!is_identifier(token), "{token} should be rejected");
        }
    }

    #[test]
    fn scope_of_plain_receiver() {
        assert_eq!(scope_token("list").as_deref(), Some("list"));
        assert_eq!(scope_token("this.items").as_deref(), Some("items"));
        assert_eq!(scope_token("System.out").as_deref(), Some("out"));
    }

    #[test]
    fn scope_strips_previous_call_arguments() {
        assert_eq!(scope_token("builder.add(x).add(y)").as_deref(), Some("add"));
        assert_eq!(scope_token("get(a.b)").as_deref(), Some("get"));
        assert_eq!(scope_token("factory()").as_deref(), Some("factory"));
    }

    #[test]
    fn scope_stripping_is_non_greedy() {
        // The first `)` closes the group, so nested calls leave debris behind.
        assert_eq!(scope_token("a(b(c)).d").as_deref(), Some("d"));
        assert_eq!(scope_token("a(b(c))").as_deref(), Some("a)"));
    }

    #[test]
    fn scope_handles_multiline_chains() {
        assert_eq!(
            scope_token("stream\n    .filter(x -> x > 0)\n    .map(f)").as_deref(),
            Some("map")
        );
    }

    #[test]
    fn scope_strips_argument_lists_spanning_lines() {
        assert_eq!(
            scope_token("builder.add(\n      a,\n      b)").as_deref(),
            Some("add")
        );
        assert_eq!(
            scope_token("client\n    .request(\n        url)\n    .header(k,\n v)").as_deref(),
            Some("header")
        );
        assert_eq!(
            scope_token("builder.add(\r\n\ta,\r\n\tb)"),
            scope_token("builder.add(a, b)")
        );
    }

    #[test]
    fn empty_scope_has_no_token() {
        assert_eq!(scope_token(""), None);
        assert_eq!(scope_token("."), None);
        assert_eq!(scope_token("()"), None);
    }
}
