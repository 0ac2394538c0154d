//! Verbosity and empty-section pruning.

use trellis_model::{Test, TestKind};

/// How much of the tree a report keeps.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Failed and skipped leaves plus their ancestors.
    #[default]
    FailuresOnly,
    /// Containers with counts; leaves hidden.
    Sections,
    /// Everything.
    Full,
}

impl Verbosity {
    /// Map a numeric level; anything above 2 is [`Verbosity::Full`].
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::FailuresOnly,
            1 => Verbosity::Sections,
            _ => Verbosity::Full,
        }
    }
}

pub fn apply_verbosity(roots: Vec<Test>, verbosity: Verbosity) -> Vec<Test> {
    match verbosity {
        Verbosity::FailuresOnly => roots.into_iter().filter_map(keep_failures).collect(),
        Verbosity::Sections => {
            let mut roots = roots;
            for root in &mut roots {
                // Cache counts while the leaves are still present.
                root.summary();
                hide_leaves(root);
            }
            roots
        }
        Verbosity::Full => roots,
    }
}

fn keep_failures(mut node: Test) -> Option<Test> {
    if node.is_leaf() {
        return (node.failed || node.skipped).then_some(node);
    }
    let children = std::mem::take(&mut node.children);
    node.children = children.into_iter().filter_map(keep_failures).collect();
    if node.children.is_empty() {
        return None;
    }
    node.invalidate_summary();
    Some(node)
}

fn hide_leaves(node: &mut Test) {
    node.children.retain(|child| !child.is_leaf());
    for child in &mut node.children {
        hide_leaves(child);
    }
}

/// Remove every container, other than file nodes, with no tests below it.
///
/// Counts come from [`Test::summary`], so sections whose leaves were hidden
/// with their counts cached survive.
pub fn prune_empty_sections(roots: Vec<Test>) -> Vec<Test> {
    roots.into_iter().filter_map(prune_node).collect()
}

fn prune_node(mut node: Test) -> Option<Test> {
    if node.is_leaf() {
        return Some(node);
    }
    if node.kind != TestKind::File && node.summary().total == 0 {
        return None;
    }
    let children = std::mem::take(&mut node.children);
    node.children = children.into_iter().filter_map(prune_node).collect();
    Some(node)
}
