//! Flat list → directory/file/suite tree.

use std::collections::{BTreeMap, BTreeSet};

use trellis_model::paths::{package_dir, package_path};
use trellis_model::{Framework, Test, TestKind};

/// Tests of one suite path, with nested suites keyed by name.
#[derive(Default)]
struct SuiteTrie<'a> {
    suites: BTreeMap<&'a str, SuiteTrie<'a>>,
    tests: Vec<&'a Test>,
}

impl<'a> SuiteTrie<'a> {
    fn insert(&mut self, test: &'a Test) {
        let mut node = self;
        for segment in &test.suite {
            node = node.suites.entry(segment.as_str()).or_default();
        }
        node.tests.push(test);
    }

    /// Sub-suites first (alphabetical), then this level's tests in input
    /// order.
    fn into_children(self, context: &NodeContext<'_>, parents: &[String], under_file: bool) -> Vec<Test> {
        let mut children = Vec::with_capacity(self.suites.len() + self.tests.len());
        for (name, trie) in self.suites {
            let mut suite = context.container(TestKind::Suite, name);
            suite.suite = parents.to_vec();
            let mut chain = parents.to_vec();
            chain.push(name.to_string());
            suite.children = trie.into_children(context, &chain, under_file);
            children.push(suite);
        }
        for test in self.tests {
            let mut leaf = test.clone();
            leaf.children.clear();
            if under_file {
                leaf.file.clear();
            }
            children.push(leaf);
        }
        children
    }
}

/// Fields shared by every container built for one directory.
struct NodeContext<'a> {
    framework: Framework,
    package: &'a str,
    package_path: String,
}

impl NodeContext<'_> {
    fn container(&self, kind: TestKind, name: &str) -> Test {
        let mut node = Test::container(kind, self.framework, name);
        node.package = self.package.to_string();
        node.package_path.clone_from(&self.package_path);
        node
    }
}

/// Directory key of a test: `.` or segments joined by `/`, empty segments
/// removed.
fn dir_key(test: &Test) -> String {
    let dir = package_dir(&test.package_path);
    if dir == "." {
        return ".".to_string();
    }
    let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

fn depth(dir: &str) -> usize {
    dir.matches('/').count()
}

fn last_segment(dir: &str) -> &str {
    dir.rsplit_once('/').map_or(dir, |(_, last)| last)
}

/// File path of `test` relative to `dir`.
fn relative_file<'t>(dir: &str, file: &'t str) -> &'t str {
    if dir == "." {
        return file.strip_prefix("./").unwrap_or(file);
    }
    file.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(file)
}

/// Directory node with its file buckets and loose tests. Subdirectories
/// are attached later.
fn directory_node(dir: &str, framework: Framework, tests: &[&Test]) -> Test {
    let context = NodeContext {
        framework,
        package: tests.first().map_or("", |t| t.package.as_str()),
        package_path: package_path(dir),
    };

    let mut node = context.container(TestKind::Directory, last_segment(dir));

    let mut files: BTreeMap<&str, (&str, SuiteTrie<'_>)> = BTreeMap::new();
    let mut loose = SuiteTrie::default();
    for &test in tests {
        if test.file.is_empty() {
            loose.insert(test);
        } else {
            let (_, trie) = files
                .entry(relative_file(dir, &test.file))
                .or_insert_with(|| (test.file.as_str(), SuiteTrie::default()));
            trie.insert(test);
        }
    }

    for (name, (original, trie)) in files {
        let mut file = context.container(TestKind::File, name);
        // Kept on the file node so flattening can restore it on leaves.
        file.file = original.to_string();
        file.children = trie.into_children(&context, &[], true);
        node.children.push(file);
    }
    node.children
        .extend(loose.into_children(&context, &[], false));
    node
}

/// Build the report tree. Roots are sorted by name; `.` is its own root.
pub fn build_tree(tests: &[Test]) -> Vec<Test> {
    let mut by_dir: BTreeMap<String, Vec<&Test>> = BTreeMap::new();
    for test in tests {
        by_dir.entry(dir_key(test)).or_default().push(test);
    }

    // Every ancestor becomes a directory too; the framework of the first
    // test below it labels the container.
    let mut frameworks: BTreeMap<String, Framework> = BTreeMap::new();
    for (dir, dir_tests) in &by_dir {
        let Some(framework) = dir_tests.first().map(|t| t.framework) else {
            continue;
        };
        let mut prefix = dir.as_str();
        loop {
            frameworks.entry(prefix.to_string()).or_insert(framework);
            match prefix.rsplit_once('/') {
                Some((parent, _)) => prefix = parent,
                None => break,
            }
        }
    }

    let mut nodes: BTreeMap<String, Test> = frameworks
        .iter()
        .map(|(dir, &framework)| {
            let dir_tests = by_dir.get(dir).map_or(&[][..], Vec::as_slice);
            (dir.clone(), directory_node(dir, framework, dir_tests))
        })
        .collect();

    let mut order: Vec<String> = nodes.keys().cloned().collect();
    order.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));
    let mut roots = BTreeSet::new();
    for dir in order {
        let Some((parent, _)) = dir.rsplit_once('/') else {
            roots.insert(dir);
            continue;
        };
        let Some(child) = nodes.remove(&dir) else {
            continue;
        };
        if let Some(parent) = nodes.get_mut(parent) {
            parent.children.push(child);
        }
    }

    let mut roots: Vec<Test> = roots
        .into_iter()
        .filter_map(|dir| nodes.remove(&dir))
        .collect();
    for root in &mut roots {
        propagate_failed(root);
    }
    roots
}

/// Set `failed` on every container with a failing descendant leaf.
fn propagate_failed(node: &mut Test) -> bool {
    if node.is_leaf() {
        return node.failed;
    }
    let mut failed = false;
    for child in &mut node.children {
        failed |= propagate_failed(child);
    }
    node.failed = failed;
    failed
}

/// Leaves of `roots` in tree order, with `file` restored from the enclosing
/// file node. Building a tree from the result reproduces `roots`.
pub fn flatten_leaves(roots: &[Test]) -> Vec<Test> {
    let mut out = Vec::new();
    for root in roots {
        collect(root, None, &mut out);
    }
    out
}

fn collect(node: &Test, file: Option<&str>, out: &mut Vec<Test>) {
    if node.is_leaf() {
        let mut leaf = node.clone();
        if let Some(file) = file {
            if leaf.file.is_empty() {
                leaf.file = file.to_string();
            }
        }
        out.push(leaf);
        return;
    }
    let file = if node.kind == TestKind::File {
        Some(node.file.as_str())
    } else {
        file
    };
    for child in &node.children {
        collect(child, file, out);
    }
}
