// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grammar-based backend: tree-sitter concrete syntax trees
//!
//! A syntax tree carries no linkage information, so every function definition
//! in the file is a user-function candidate. Matching is name based, exactly as
//! in the frontend backend.

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{GrammarLoadError, ParseFailure};
use crate::model::{CallRecord, UserFunctionSet};
use crate::parser::grammar::{load_grammar, GrammarSource, LoadedGrammar};

/// A parsed file: the tree plus the bytes its ranges point into.
///
/// Sources are kept as raw bytes; only identifier nodes need to be UTF-8.
pub struct SyntaxUnit {
    tree: Tree,
    source: Vec<u8>,
}

/// Tree-sitter backed parser for C/C++ sources
pub struct GrammarBackend {
    grammar: Arc<LoadedGrammar>,
    reject_syntax_errors: bool,
    timeout: Option<Duration>,
}

impl GrammarBackend {
    /// Load the grammar (cached process-wide) and build a backend around it.
    pub fn load(source: &GrammarSource) -> Result<Self, GrammarLoadError> {
        Ok(Self {
            grammar: load_grammar(source)?,
            reject_syntax_errors: true,
            timeout: None,
        })
    }

    /// Accept or reject trees containing ERROR/MISSING nodes
    pub fn with_syntax_errors_rejected(mut self, reject: bool) -> Self {
        self.reject_syntax_errors = reject;
        self
    }

    /// Abort parsing a single file after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read and parse a file.
    pub fn parse(&self, path: &Path) -> Result<SyntaxUnit, ParseFailure> {
        let source = std::fs::read(path).map_err(|e| ParseFailure::Io(e.to_string()))?;
        self.parse_source(source)
    }

    /// Parse in-memory source.
    pub fn parse_source(&self, source: impl Into<Vec<u8>>) -> Result<SyntaxUnit, ParseFailure> {
        let source = source.into();
        let mut parser = Parser::new();
        parser
            .set_language(self.grammar.language())
            .map_err(|e| ParseFailure::BackendUnavailable(e.to_string()))?;
        if let Some(timeout) = self.timeout {
            parser.set_timeout_micros(timeout.as_micros().min(u64::MAX as u128) as u64);
        }

        let tree = match parser.parse(&source, None) {
            Some(tree) => tree,
            None => {
                return Err(match self.timeout {
                    Some(timeout) => ParseFailure::Timeout(timeout),
                    None => ParseFailure::NoTree,
                })
            }
        };

        if self.reject_syntax_errors && tree.root_node().has_error() {
            let line = first_error_line(tree.root_node()).unwrap_or(1);
            return Err(ParseFailure::Syntax { line });
        }

        Ok(SyntaxUnit { tree, source })
    }

    /// Both passes over one unit: collect user functions, then match call sites.
    pub fn extract_calls(&self, unit: &SyntaxUnit, path: &Path) -> Vec<CallRecord> {
        let functions = collect_user_functions(unit);
        tracing::debug!(
            file = %path.display(),
            functions = ?functions.sorted_names(),
            "user-defined functions detected"
        );
        match_calls(unit, &functions, path)
    }
}

/// Pass 1: names of all function definitions in the unit.
pub fn collect_user_functions(unit: &SyntaxUnit) -> UserFunctionSet {
    let source = unit.source.as_slice();
    let mut functions = UserFunctionSet::new();

    walk_tree(unit.tree.root_node(), &mut |node| {
        if node.kind() != "function_definition" {
            return;
        }
        if let Some(name) = definition_name(node, source) {
            functions.insert(name, node.start_position().row + 1);
        }
    });

    functions
}

/// Pass 2: call sites whose callee names a function in `functions`, ordered by
/// line, attributed to the innermost enclosing definition.
///
/// Calls on one line keep traversal order (outer call first).
pub fn match_calls(
    unit: &SyntaxUnit,
    functions: &UserFunctionSet,
    path: &Path,
) -> Vec<CallRecord> {
    let source = unit.source.as_slice();
    let mut calls = Vec::new();

    let mut stack: Vec<(Node<'_>, Option<Rc<str>>)> = vec![(unit.tree.root_node(), None)];
    while let Some((node, enclosing)) = stack.pop() {
        let mut scope = enclosing;

        match node.kind() {
            "function_definition" => {
                if let Some(name) = definition_name(node, source) {
                    scope = Some(Rc::from(name));
                }
            }
            "call_expression" => {
                let callee = node.child_by_field_name("function");
                let name = callee.and_then(|callee| unqualified_name(callee, source));
                if let (Some(callee), Some(name)) = (callee, name) {
                    if functions.contains(&name) {
                        calls.push(CallRecord::new(
                            scope.as_deref(),
                            name,
                            path,
                            call_line(node, callee),
                        ));
                    }
                }
            }
            _ => {}
        }

        push_children_reversed(node, &scope, &mut stack);
    }

    calls.sort_by_key(|call| call.line);
    calls
}

/// Member calls are placed on the line of the member name, so each link of a
/// chain split over several lines gets its own line.
fn call_line<'t>(call: Node<'t>, callee: Node<'t>) -> usize {
    let anchor = match callee.kind() {
        "field_expression" => callee.child_by_field_name("field").unwrap_or(call),
        _ => call,
    };
    anchor.start_position().row + 1
}

fn push_children_reversed<'t>(
    node: Node<'t>,
    scope: &Option<Rc<str>>,
    stack: &mut Vec<(Node<'t>, Option<Rc<str>>)>,
) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    for child in children.into_iter().rev() {
        stack.push((child, scope.clone()));
    }
}

/// Pre-order, left-to-right walk.
fn walk_tree<'t, F>(root: Node<'t>, visitor: &mut F)
where
    F: FnMut(Node<'t>),
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visitor(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut line = None;
    walk_tree(root, &mut |node| {
        if line.is_none() && (node.is_error() || node.is_missing()) {
            line = Some(node.start_position().row + 1);
        }
    });
    line
}

/// Name of the function a `function_definition` defines, unqualified.
fn definition_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let mut declarator = node.child_by_field_name("declarator")?;
    loop {
        match declarator.kind() {
            "function_declarator" => {
                let name = declarator.child_by_field_name("declarator")?;
                return unqualified_name(name, source);
            }
            "pointer_declarator"
            | "reference_declarator"
            | "parenthesized_declarator"
            | "attributed_declarator" => {
                declarator = inner_declarator(declarator)?;
            }
            _ => return None,
        }
    }
}

fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind().ends_with("declarator"));
    found
}

/// Unqualified spelling of a callee or declarator name node.
///
/// `ns::f` -> `f`, `obj.f` / `ptr->f` -> `f`, `f<int>` -> `f`. Anything else
/// (calls through pointers, lambdas, call results) has no name.
fn unqualified_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "field_identifier" | "destructor_name" | "operator_name" => {
            let text = node.utf8_text(source).ok()?.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        "qualified_identifier" | "template_function" | "template_method" => {
            unqualified_name(node.child_by_field_name("name")?, source)
        }
        "field_expression" => unqualified_name(node.child_by_field_name("field")?, source),
        "parenthesized_expression" => unqualified_name(node.named_child(0)?, source),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNRESOLVED_CALLER;

    fn backend() -> GrammarBackend {
        GrammarBackend::load(&GrammarSource::Bundled).unwrap()
    }

    fn calls_in(source: &str) -> Vec<CallRecord> {
        let backend = backend();
        let unit = backend.parse_source(source.to_string()).unwrap();
        backend.extract_calls(&unit, Path::new("test.cpp"))
    }

    fn callees(calls: &[CallRecord]) -> Vec<(&str, usize)> {
        calls
            .iter()
            .map(|c| (c.callee_function.as_str(), c.line))
            .collect()
    }

    #[test]
    fn test_definition_before_and_after_use() {
        let source = r#"
int add(int a, int b) { return a + b; }

int main() {
    int x = add(1, 2);
    return twice(x);
}

int twice(int v) { return add(v, v); }
"#;
        let calls = calls_in(source);
        assert_eq!(callees(&calls), vec![("add", 5), ("twice", 6), ("add", 9)]);
        assert_eq!(calls[0].caller_function, "main");
        assert_eq!(calls[2].caller_function, "twice");
        assert!(calls.iter().all(|c| c.file == Path::new("test.cpp")));
    }

    #[test]
    fn test_library_calls_are_dropped() {
        let source = r#"
#include <iostream>
#include <cstdio>

int add(int a, int b) { return a + b; }

int main() {
    std::cout << add(5, 3) << std::endl;
    printf("%d\n", 1);
    return 0;
}
"#;
        let calls = calls_in(source);
        assert_eq!(callees(&calls), vec![("add", 8)]);
    }

    #[test]
    fn test_zero_calls_is_empty_success() {
        let calls = calls_in("int add(int a, int b) { return a + b; }\n");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_qualified_and_member_calls_use_unqualified_name() {
        let source = r#"
namespace math {
int square(int v) { return v * v; }
}

class Widget {
public:
    void draw() {}
};

void Widget_render(Widget &w, Widget *p) {
    w.draw();
    p->draw();
    math::square(3);
}
"#;
        let calls = calls_in(source);
        assert_eq!(
            callees(&calls),
            vec![("draw", 12), ("draw", 13), ("square", 14)]
        );
        assert!(calls.iter().all(|c| c.caller_function == "Widget_render"));
    }

    #[test]
    fn test_out_of_line_method_definition_is_collected() {
        let source = r#"
struct Counter { void bump(); };
void Counter::bump() {}
int main() { Counter c; c.bump(); return 0; }
"#;
        let backend = backend();
        let unit = backend.parse_source(source.to_string()).unwrap();
        let functions = collect_user_functions(&unit);
        assert!(functions.contains("bump"));
        assert!(functions.contains("main"));
        assert_eq!(functions.definition_line("bump"), Some(3));
    }

    #[test]
    fn test_static_functions_are_candidates() {
        let source = r#"
static int helper() { return 1; }
int main() { return helper(); }
"#;
        let calls = calls_in(source);
        assert_eq!(callees(&calls), vec![("helper", 3)]);
    }

    #[test]
    fn test_function_pointer_calls_are_dropped() {
        let source = r#"
int add(int a, int b) { return a + b; }
int main() {
    int (*fp)(int, int) = add;
    return (*fp)(1, 2);
}
"#;
        assert!(calls_in(source).is_empty());
    }

    #[test]
    fn test_nested_calls_keep_line_order() {
        let source = r#"
int f(int v) { return v; }
int g() { return 1; }
int main() {
    return f(
        g());
}
"#;
        let calls = calls_in(source);
        assert_eq!(callees(&calls), vec![("f", 5), ("g", 6)]);
        let lines: Vec<usize> = calls.iter().map(|c| c.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_calls_outside_functions_are_unresolved() {
        let source = r#"
int seed() { return 4; }
int global_value = seed();
"#;
        let calls = calls_in(source);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].caller_function, UNRESOLVED_CALLER);
    }

    #[test]
    fn test_syntax_errors_are_rejected_by_default() {
        let backend = backend();
        let result = backend.parse_source("int main( { return add(1, 2) }\n".to_string());
        assert!(matches!(result, Err(ParseFailure::Syntax { line: 1 })));
    }

    #[test]
    fn test_syntax_errors_tolerated_when_configured() {
        let backend = backend().with_syntax_errors_rejected(false);
        assert!(backend
            .parse_source("int main( { return 0 }\n".to_string())
            .is_ok());
    }

    #[test]
    fn test_chained_member_calls_use_member_lines() {
        let source = r#"
struct B { B &first() { return *this; } B &second() { return *this; } };
int main() {
    B b;
    b
        .first()
        .second();
    return 0;
}
"#;
        let calls = calls_in(source);
        assert_eq!(callees(&calls), vec![("first", 6), ("second", 7)]);
        assert!(calls.iter().all(|c| c.caller_function == "main"));
    }

    #[test]
    fn test_non_utf8_source_still_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.cpp");
        std::fs::write(
            &path,
            b"// Copyright \xA9 2020 M\xFCller\n\
              int add(int a, int b) { return a + b; }\n\
              int main() { return add(1, 2); }\n",
        )
        .unwrap();

        let backend = backend();
        let unit = backend.parse(&path).unwrap();
        let calls = backend.extract_calls(&unit, &path);
        assert_eq!(callees(&calls), vec![("add", 3)]);
        assert_eq!(calls[0].caller_function, "main");
    }

    #[test]
    fn test_parse_timeout_is_reported() {
        let source: String = (0..20_000)
            .map(|i| format!("int f{i}(int v) {{ return v + {i}; }}\n"))
            .collect();
        let timeout = Duration::from_micros(1);
        let result = backend().with_timeout(Some(timeout)).parse_source(source);
        assert!(matches!(result, Err(ParseFailure::Timeout(t)) if t == timeout));
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let result = backend().parse(Path::new("/nonexistent/file.cpp"));
        assert!(matches!(result, Err(ParseFailure::Io(_))));
    }
}
