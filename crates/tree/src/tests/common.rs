//! Shared fixtures for the in-crate test suites.

use crate::id::NodeId;
use crate::mem::{MemoryRepository, NodeSpec};
use crate::node::SortKey;
use crate::repo::Repository;

/// Fresh repository labelled `master`.
pub fn repo() -> MemoryRepository {
    MemoryRepository::new("master")
}

/// Builds a parent with one child per key, inserted in slice order, and
/// returns the parent id plus the child ids.
pub fn sibling_set(repo: &MemoryRepository, keys: &[SortKey]) -> (NodeId, Vec<NodeId>) {
    let parent = repo.add_node(None, NodeSpec::named("parent")).unwrap();
    let children = keys
        .iter()
        .enumerate()
        .map(|(index, &key)| {
            repo.add_node(
                Some(parent),
                NodeSpec::named(format!("child-{index}")).with_sort_key(key),
            )
            .unwrap()
        })
        .collect();
    (parent, children)
}

/// Sort keys of `parent`'s children in display order.
pub fn keys_of(repo: &MemoryRepository, parent: NodeId) -> Vec<SortKey> {
    repo.children(parent)
        .unwrap()
        .into_iter()
        .map(|node| node.sort_key)
        .collect()
}

/// Child ids of `parent` in display order.
pub fn order_of(repo: &MemoryRepository, parent: NodeId) -> Vec<NodeId> {
    repo.children(parent)
        .unwrap()
        .into_iter()
        .map(|node| node.id)
        .collect()
}
