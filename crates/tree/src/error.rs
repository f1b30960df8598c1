//! Errors surfaced by repository and ordering operations.

use thiserror::Error as ThisError;

use crate::id::NodeId;

/// Failure of a tree operation.
///
/// None of these are retried internally: callers see the first failure and
/// decide what to do with the tree state they can observe.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum TreeError {
    /// The node, or parent context the operation needs, does not exist.
    #[error("node {0} not found")]
    NotFound(NodeId),

    /// The node and its anchor were not siblings at mutation time.
    #[error("node {node} is not in the sibling set of {anchor}")]
    InvalidState {
        /// Node being placed.
        node: NodeId,
        /// Sibling it was to be placed against.
        anchor: NodeId,
    },

    /// A staged write was attempted outside an open edit scope.
    #[error("node {0} is not open for editing")]
    EditNotOpen(NodeId),

    /// Failure reported by the backing store, passed through unchanged.
    #[error("repository failure: {0}")]
    Backend(String),
}
