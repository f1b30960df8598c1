//! Repository contract and the scoped-edit guard.

#[cfg(test)]
#[path = "tests/repo.rs"]
mod tests;

use tracing::debug;

use crate::error::TreeError;
use crate::id::NodeId;
use crate::node::{Node, SortKey};

/// Narrow contract over the host item store.
///
/// The ordering and pipeline layers only ever talk to the store through
/// this trait, so a host adapts its own repository once and gets the whole
/// toolkit. [`MemoryRepository`](crate::mem::MemoryRepository) is the
/// reference implementation and pins down the observable behaviour,
/// including the versioning quirk documented on [`ScopedEdit`].
///
/// Implementations are not required to be thread-safe for overlapping
/// writes to one sibling set; callers serialize those.
pub trait Repository {
    /// Returns the node snapshot for `id`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if no such node exists.
    fn node(&self, id: NodeId) -> Result<Node, TreeError>;

    /// Returns the children of `parent` in display order: ascending sort
    /// key, insertion order on ties.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `parent` does not exist.
    fn children(&self, parent: NodeId) -> Result<Vec<Node>, TreeError>;

    /// Returns the parent of `id`, or `None` for a root.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, TreeError>;

    /// Opens an edit scope on `id`. Opening an already-open scope is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    fn open_edit(&self, id: NodeId) -> Result<(), TreeError>;

    /// Stages a new sort key for `id` inside its open edit scope. The key
    /// becomes visible when the scope closes.
    ///
    /// # Errors
    ///
    /// [`TreeError::EditNotOpen`] if no edit scope is open on `id`.
    fn set_sort_key(&self, id: NodeId, key: SortKey) -> Result<(), TreeError>;

    /// Closes the edit scope on `id`, committing staged changes.
    ///
    /// # Errors
    ///
    /// [`TreeError::EditNotOpen`] if no edit scope is open on `id`.
    fn close_edit(&self, id: NodeId) -> Result<(), TreeError>;

    /// Number of stored versions of `id`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    fn version_count(&self, id: NodeId) -> Result<usize, TreeError>;

    /// Removes every stored version of `id`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    fn purge_versions(&self, id: NodeId) -> Result<(), TreeError>;

    /// Re-parents `id` under `new_parent`, keeping its sort key.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if either node does not exist, or
    /// [`TreeError::Backend`] if the move would detach the subtree.
    fn move_node(&self, id: NodeId, new_parent: NodeId) -> Result<(), TreeError>;

    /// Copies the subtree rooted at `id` under `new_parent`, naming the
    /// copied root `name`. Returns the id of the copied root.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if either node does not exist.
    fn copy_node(
        &self,
        id: NodeId,
        new_parent: NodeId,
        name: &str,
    ) -> Result<NodeId, TreeError>;

    /// Whether shadow projections of `id` exist elsewhere in the tree.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    fn has_shadows(&self, id: NodeId) -> Result<bool, TreeError>;

    /// Whether `ancestor` lies on the parent chain of `id`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if a node on the chain disappears mid-walk.
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> Result<bool, TreeError> {
        let mut current = self.parent_of(id)?;
        while let Some(node) = current {
            if node == ancestor {
                return Ok(true);
            }
            current = self.parent_of(node)?;
        }
        Ok(false)
    }
}

/// Edit scope that cleans up the version the close materialises.
///
/// Closing an edit scope on a node that has no stored versions makes the
/// host store create version 1, so a plain sort-key write silently grows a
/// version history onto nodes that never had one. `ScopedEdit` records the
/// zero-version state before opening the scope, closes the scope on every
/// exit path, and purges the stray version after a close when the node
/// started out empty.
#[derive(Debug)]
pub struct ScopedEdit<'a, R: Repository + ?Sized> {
    repo: &'a R,
    id: NodeId,
    purge_on_close: bool,
    open: bool,
}

impl<'a, R: Repository + ?Sized> ScopedEdit<'a, R> {
    /// Opens an edit scope on `id`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `id` does not exist.
    pub fn begin(repo: &'a R, id: NodeId) -> Result<Self, TreeError> {
        let purge_on_close = repo.version_count(id)? == 0;
        repo.open_edit(id)?;
        Ok(Self {
            repo,
            id,
            purge_on_close,
            open: true,
        })
    }

    /// Stages a new sort key on the edited node.
    ///
    /// # Errors
    ///
    /// Propagates [`TreeError`] from the store.
    pub fn set_sort_key(&self, key: SortKey) -> Result<(), TreeError> {
        self.repo.set_sort_key(self.id, key)
    }

    /// Closes the scope, committing staged changes, and removes the
    /// version the close created when the node had none before.
    ///
    /// # Errors
    ///
    /// Propagates [`TreeError`] from the store.
    pub fn commit(mut self) -> Result<(), TreeError> {
        self.open = false;
        self.repo.close_edit(self.id)?;
        if self.purge_on_close {
            debug!(id = %self.id, "removing version materialised by edit scope");
            self.repo.purge_versions(self.id)?;
        }
        Ok(())
    }
}

impl<R: Repository + ?Sized> Drop for ScopedEdit<'_, R> {
    fn drop(&mut self) {
        if self.open {
            // Abandoned scope: still close and still clean up the stray
            // version. Errors here have nowhere to go.
            let _ignored = self.repo.close_edit(self.id);
            if self.purge_on_close {
                let _ignored = self.repo.purge_versions(self.id);
            }
        }
    }
}

/// Writes `key` as the sort key of `id` through a scoped edit.
///
/// # Errors
///
/// Propagates [`TreeError`] from the store.
pub fn update_sort_key<R>(repo: &R, id: NodeId, key: SortKey) -> Result<(), TreeError>
where
    R: Repository + ?Sized,
{
    let edit = ScopedEdit::begin(repo, id)?;
    edit.set_sort_key(key)?;
    edit.commit()
}
