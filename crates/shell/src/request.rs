//! Drag requests and outcomes as the client exchanges them.

use grove_tree::id::NodeId;
use grove_tree::node::SortKey;
use grove_tree::order::Direction;
use serde::{Deserialize, Serialize};

/// Where the dragged node lands relative to the drop target.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPosition {
    /// Append as a child of the target.
    Into,
    /// Insert among the target's siblings, immediately before it.
    Before,
    /// Insert among the target's siblings, immediately after it.
    After,
}

impl DropPosition {
    /// Sibling direction for the balancer; `None` for [`Self::Into`]
    /// drops, which leave sort keys alone.
    #[must_use]
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Into => None,
            Self::Before => Some(Direction::Before),
            Self::After => Some(Direction::After),
        }
    }
}

/// Whether the drag moves the node or copies it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DragMode {
    /// Relocate the node.
    Move,
    /// Duplicate the subtree at the destination.
    Copy,
}

impl DragMode {
    /// `true` for [`Self::Copy`].
    #[must_use]
    pub fn is_copy(self) -> bool {
        matches!(self, Self::Copy)
    }

    /// Verb for dialogs and audit lines.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }
}

/// One drag-item-to request as submitted by the client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    /// Node being dragged.
    pub source: NodeId,
    /// Drop target: the new parent for [`DropPosition::Into`], the anchor
    /// sibling otherwise.
    pub target: NodeId,
    /// Where the node lands relative to the target.
    pub position: DropPosition,
    /// Move or copy.
    pub mode: DragMode,
    /// Ask the user to confirm before executing.
    #[serde(default)]
    pub confirm: bool,
}

/// What a completed drag operation did.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragOutcome {
    /// The relocated node, or the root of the new copy.
    pub node: NodeId,
    /// Parent the node ended up under.
    pub parent: NodeId,
    /// Sort key the balancer assigned; `None` for `Into` drops.
    pub sort_key: Option<SortKey>,
    /// Mode the operation ran in.
    pub mode: DragMode,
}
