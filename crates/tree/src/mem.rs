//! In-memory reference repository.
//!
//! Backs the test-suites and pins down the behaviour host adapters must
//! reproduce. It deliberately includes the auto-versioning quirk the
//! scoped-edit guard works around: committing an edit scope on a node
//! with no stored versions materialises version 1, whether or not the
//! scope staged any changes.

#[cfg(test)]
#[path = "tests/mem.rs"]
mod tests;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::error::TreeError;
use crate::id::{templates, NodeId, TemplateId};
use crate::node::{Node, SortKey};
use crate::repo::Repository;

/// Description of a node to insert into a [`MemoryRepository`].
#[derive(Clone, Debug)]
pub struct NodeSpec {
    name: String,
    display_name: Option<String>,
    template: TemplateId,
    sort_key: SortKey,
    protected: bool,
    is_virtual: bool,
    shadowed: bool,
    origin: Option<String>,
    versions: usize,
}

impl NodeSpec {
    /// Starts a spec for an ordinary item: standard template, sort key 0,
    /// one stored version.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            template: templates::STANDARD,
            sort_key: 0,
            protected: false,
            is_virtual: false,
            shadowed: false,
            origin: None,
            versions: 1,
        }
    }

    /// Sets the initial sort key.
    #[must_use]
    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    /// Sets a display name distinct from the item name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the template.
    #[must_use]
    pub fn with_template(mut self, template: TemplateId) -> Self {
        self.template = template;
        self
    }

    /// Marks the node protected; protected items refuse moves.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Marks the node as a virtual projection.
    #[must_use]
    pub fn virtual_item(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Marks the node as having shadow projections elsewhere.
    #[must_use]
    pub fn shadowed(mut self) -> Self {
        self.shadowed = true;
        self
    }

    /// Overrides the origin label, e.g. to model a cross-store node.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the number of pre-existing versions.
    #[must_use]
    pub fn with_versions(mut self, versions: usize) -> Self {
        self.versions = versions;
        self
    }
}

#[derive(Clone, Debug)]
struct Slot {
    node: Node,
    children: IndexSet<NodeId>,
    versions: usize,
    editing: bool,
    staged_key: Option<SortKey>,
    shadowed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: IndexMap<NodeId, Slot>,
    roots: IndexSet<NodeId>,
}

/// Thread-safe in-memory [`Repository`].
#[derive(Debug)]
pub struct MemoryRepository {
    store: String,
    inner: RwLock<Inner>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new("master")
    }
}

impl MemoryRepository {
    /// Creates an empty repository labelled `store`.
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Label stamped on nodes created in this repository.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Inserts a node described by `spec` under `parent`, or as a root
    /// when `parent` is `None`, and returns its id.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `parent` does not exist.
    pub fn add_node(
        &self,
        parent: Option<NodeId>,
        spec: NodeSpec,
    ) -> Result<NodeId, TreeError> {
        let id = NodeId::random();
        let mut inner = self.inner.write();

        match parent {
            Some(parent) => {
                let slot = inner
                    .nodes
                    .get_mut(&parent)
                    .ok_or(TreeError::NotFound(parent))?;
                let _ignored = slot.children.insert(id);
            }
            None => {
                let _ignored = inner.roots.insert(id);
            }
        }

        let node = Node {
            id,
            parent,
            name: spec.name,
            display_name: spec.display_name,
            template: spec.template,
            sort_key: spec.sort_key,
            protected: spec.protected,
            is_virtual: spec.is_virtual,
            origin: spec.origin.unwrap_or_else(|| self.store.clone()),
        };

        let _ignored = inner.nodes.insert(
            id,
            Slot {
                node,
                children: IndexSet::new(),
                versions: spec.versions,
                editing: false,
                staged_key: None,
                shadowed: spec.shadowed,
            },
        );

        Ok(id)
    }

    /// Number of edit scopes currently open, for leak checks.
    #[must_use]
    pub fn open_edits(&self) -> usize {
        self.inner
            .read()
            .nodes
            .values()
            .filter(|slot| slot.editing)
            .count()
    }

    fn with_slot<T>(
        &self,
        id: NodeId,
        read: impl FnOnce(&Slot) -> T,
    ) -> Result<T, TreeError> {
        let inner = self.inner.read();
        inner.nodes.get(&id).map(read).ok_or(TreeError::NotFound(id))
    }

    fn copy_subtree(
        &self,
        inner: &mut Inner,
        source: NodeId,
        new_parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        let original = inner.nodes.get(&source).ok_or(TreeError::NotFound(source))?;
        let mut node = original.node.clone();
        let children: Vec<NodeId> = original.children.iter().copied().collect();
        let versions = original.versions;

        let id = NodeId::random();
        node.id = id;
        node.parent = Some(new_parent);
        if let Some(name) = name {
            node.name = name.to_owned();
        }
        // Copies are materialised in this store as real items.
        node.is_virtual = false;
        node.origin = self.store.clone();

        let dest = inner
            .nodes
            .get_mut(&new_parent)
            .ok_or(TreeError::NotFound(new_parent))?;
        let _ignored = dest.children.insert(id);

        let _ignored = inner.nodes.insert(
            id,
            Slot {
                node,
                children: IndexSet::new(),
                versions,
                editing: false,
                staged_key: None,
                shadowed: false,
            },
        );

        for child in children {
            let _ignored = self.copy_subtree(inner, child, id, None)?;
        }

        Ok(id)
    }
}

impl Repository for MemoryRepository {
    fn node(&self, id: NodeId) -> Result<Node, TreeError> {
        self.with_slot(id, |slot| slot.node.clone())
    }

    fn children(&self, parent: NodeId) -> Result<Vec<Node>, TreeError> {
        let inner = self.inner.read();
        let slot = inner
            .nodes
            .get(&parent)
            .ok_or(TreeError::NotFound(parent))?;

        let mut nodes: Vec<Node> = slot
            .children
            .iter()
            .filter_map(|child| inner.nodes.get(child))
            .map(|child| child.node.clone())
            .collect();

        // Stable sort: ties keep insertion order.
        nodes.sort_by_key(|node| node.sort_key);
        Ok(nodes)
    }

    fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        self.with_slot(id, |slot| slot.node.parent)
    }

    fn open_edit(&self, id: NodeId) -> Result<(), TreeError> {
        let mut inner = self.inner.write();
        let slot = inner.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        slot.editing = true;
        Ok(())
    }

    fn set_sort_key(&self, id: NodeId, key: SortKey) -> Result<(), TreeError> {
        let mut inner = self.inner.write();
        let slot = inner.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        if !slot.editing {
            return Err(TreeError::EditNotOpen(id));
        }
        slot.staged_key = Some(key);
        Ok(())
    }

    fn close_edit(&self, id: NodeId) -> Result<(), TreeError> {
        let mut inner = self.inner.write();
        let slot = inner.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        if !slot.editing {
            return Err(TreeError::EditNotOpen(id));
        }
        slot.editing = false;
        if let Some(key) = slot.staged_key.take() {
            slot.node.sort_key = key;
        }
        // The quirk under test: a commit on a version-less node creates
        // version 1.
        if slot.versions == 0 {
            slot.versions = 1;
        }
        Ok(())
    }

    fn version_count(&self, id: NodeId) -> Result<usize, TreeError> {
        self.with_slot(id, |slot| slot.versions)
    }

    fn purge_versions(&self, id: NodeId) -> Result<(), TreeError> {
        let mut inner = self.inner.write();
        let slot = inner.nodes.get_mut(&id).ok_or(TreeError::NotFound(id))?;
        slot.versions = 0;
        Ok(())
    }

    fn move_node(&self, id: NodeId, new_parent: NodeId) -> Result<(), TreeError> {
        let mut inner = self.inner.write();

        if !inner.nodes.contains_key(&id) {
            return Err(TreeError::NotFound(id));
        }
        if !inner.nodes.contains_key(&new_parent) {
            return Err(TreeError::NotFound(new_parent));
        }

        // A parent inside the moved subtree would detach it from the tree.
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(TreeError::Backend(
                    "cannot move a node beneath its own subtree".to_owned(),
                ));
            }
            cursor = inner
                .nodes
                .get(&current)
                .and_then(|slot| slot.node.parent);
        }

        let old_parent = inner
            .nodes
            .get(&id)
            .and_then(|slot| slot.node.parent);

        match old_parent {
            Some(old) => {
                if let Some(slot) = inner.nodes.get_mut(&old) {
                    let _ignored = slot.children.shift_remove(&id);
                }
            }
            None => {
                let _ignored = inner.roots.shift_remove(&id);
            }
        }

        if let Some(dest) = inner.nodes.get_mut(&new_parent) {
            let _ignored = dest.children.insert(id);
        }
        if let Some(slot) = inner.nodes.get_mut(&id) {
            slot.node.parent = Some(new_parent);
        }

        Ok(())
    }

    fn copy_node(
        &self,
        id: NodeId,
        new_parent: NodeId,
        name: &str,
    ) -> Result<NodeId, TreeError> {
        let mut inner = self.inner.write();
        self.copy_subtree(&mut inner, id, new_parent, Some(name))
    }

    fn has_shadows(&self, id: NodeId) -> Result<bool, TreeError> {
        self.with_slot(id, |slot| slot.shadowed)
    }
}
