//! Go test source scanning with tree-sitter.
//!
//! Indexes top-level `func TestXxx` declarations. A test whose body calls
//! `RunSpecs` (bare or package-qualified) is the `go test` entry point of a
//! Ginkgo suite and is flagged as bootstrap.

use std::fs;
use std::path::Path;

use tree_sitter::{Node, Parser};
use trellis_model::paths::{relative_dir, slash_path};
use trellis_model::TestLocation;

use crate::walk::{test_package_dirs, test_source_files};
use crate::{LocationIndex, LocationResolver};

/// Function that hands control to the Ginkgo spec runner.
pub const SPEC_RUNNER: &str = "RunSpecs";

/// Resolver for Go `*_test.go` sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoResolver;

impl GoResolver {
    pub fn new() -> Self {
        GoResolver
    }

    fn parser() -> Option<Parser> {
        let mut parser = Parser::new();
        match parser.set_language(&tree_sitter_go::LANGUAGE.into()) {
            Ok(()) => Some(parser),
            Err(e) => {
                tracing::warn!("failed to load Go grammar: {e}");
                None
            }
        }
    }

    fn scan_package(parser: &mut Parser, root: &Path, dir: &Path, index: &mut LocationIndex) {
        let Some(dir_key) = relative_dir(root, dir) else {
            tracing::debug!(dir = %dir.display(), "package outside root, not indexed");
            return;
        };

        for path in test_source_files(dir) {
            let file = path
                .strip_prefix(root)
                .map_or_else(|_| slash_path(&path), slash_path);
            scan_file(parser, &path, &file, &dir_key, index);
        }
    }
}

impl LocationResolver for GoResolver {
    fn resolve(&self, root: &Path, dir: &Path) -> LocationIndex {
        let mut index = LocationIndex::new();
        let Some(mut parser) = Self::parser() else {
            return index;
        };
        for package in test_package_dirs(dir) {
            Self::scan_package(&mut parser, root, &package, &mut index);
        }
        tracing::debug!(entries = index.len(), "indexed test locations");
        index
    }

    fn resolve_package(&self, root: &Path, dir: &Path) -> LocationIndex {
        let mut index = LocationIndex::new();
        if let Some(mut parser) = Self::parser() {
            Self::scan_package(&mut parser, root, dir, &mut index);
        }
        index
    }
}

fn scan_file(parser: &mut Parser, path: &Path, file: &str, dir_key: &str, index: &mut LocationIndex) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(file, "skipping unreadable test source: {e}");
            return;
        }
    };
    let Some(tree) = parser.parse(&source, None) else {
        tracing::warn!(file, "parser gave up on test source");
        return;
    };

    let root = tree.root_node();
    if root.has_error() {
        // Still index whatever declarations parsed cleanly.
        tracing::debug!(file, "test source has syntax errors");
    }

    let bytes = source.as_bytes();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() != "function_declaration" {
            continue;
        }
        let Some(name) = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(bytes).ok())
        else {
            continue;
        };
        if !is_test_entry(name) {
            continue;
        }

        let line = u32::try_from(node.start_position().row + 1).unwrap_or(u32::MAX);
        let mut location = TestLocation::new(file, line);
        if node
            .child_by_field_name("body")
            .is_some_and(|body| calls_spec_runner(body, bytes))
        {
            location = location.bootstrap();
        }
        index.insert(dir_key, name, location);
    }
}

/// `go test` naming rule: `Test` followed by nothing or a non-lowercase
/// character. `TestMain` is the package's setup hook, not a test.
pub fn is_test_entry(name: &str) -> bool {
    if name == "TestMain" {
        return false;
    }
    name.strip_prefix("Test")
        .is_some_and(|rest| !rest.starts_with(char::is_lowercase))
}

fn calls_spec_runner(body: Node<'_>, source: &[u8]) -> bool {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .and_then(|f| callee_name(f, source))
                == Some(SPEC_RUNNER)
        {
            return true;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}

fn callee_name<'s>(function: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    match function.kind() {
        "identifier" => function.utf8_text(source).ok(),
        "selector_expression" => function.child_by_field_name("field")?.utf8_text(source).ok(),
        _ => None,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
