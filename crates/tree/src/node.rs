//! Node records as the repository hands them out.

use crate::id::{NodeId, TemplateId};

/// Sibling sort key. Children of a parent display in ascending key order;
/// ties fall back to insertion order.
pub type SortKey = i32;

/// Snapshot of one content item.
///
/// A `Node` is a value, not a handle: mutating it has no effect on the
/// store. All writes go through [`Repository`](crate::repo::Repository)
/// methods.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// Identifier of this node.
    pub id: NodeId,
    /// Parent node, `None` for a tree root.
    pub parent: Option<NodeId>,
    /// Item name, unique only by convention.
    pub name: String,
    /// Human-facing name, when it differs from `name`.
    pub display_name: Option<String>,
    /// Template this node was created from.
    pub template: TemplateId,
    /// Current sibling sort key.
    pub sort_key: SortKey,
    /// Protected items refuse moves.
    pub protected: bool,
    /// Virtual nodes are projections without storage of their own.
    pub is_virtual: bool,
    /// Label of the store this node lives in, e.g. `"master"`.
    pub origin: String,
}

impl Node {
    /// Name to show in dialogs: display name when set, item name otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
