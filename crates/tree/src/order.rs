//! Sibling sort-order balancing.
//!
//! Placing a node next to an anchor sibling works in two tiers. When the
//! integer gap between the anchor and its neighbour still admits a
//! midpoint, the node takes the midpoint and nothing else is touched.
//! When the gap has collapsed below [`MIN_BISECT_GAP`], the whole sibling
//! set is renumbered at [`SPACING`] intervals and the node slots in
//! halfway between the anchor and the requested side. Placement is O(1)
//! in the common case and O(n) exactly when a renumber is forced.
//!
//! Every key write goes through a [`ScopedEdit`](crate::repo::ScopedEdit),
//! so the version-cleanup workaround applies to renumbered bystanders too.

#[cfg(test)]
#[path = "tests/order.rs"]
mod tests;

use tracing::debug;

use crate::error::TreeError;
use crate::id::NodeId;
use crate::node::{Node, SortKey};
use crate::repo::{update_sort_key, Repository};

/// Spacing between keys after a renumber, and the offset used when the
/// anchor has no neighbour on the requested side.
pub const SPACING: SortKey = 100;

/// Smallest anchor-to-neighbour gap that still admits a midpoint.
pub const MIN_BISECT_GAP: SortKey = 2;

/// Side of the anchor a placed node lands on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Immediately before the anchor in display order.
    Before,
    /// Immediately after the anchor in display order.
    After,
}

/// Assigns `moved` a sort key that places it immediately before or after
/// `anchor` in the anchor's sibling set, and returns the key.
///
/// `moved` must already live under the anchor's parent; relocating it
/// there is the caller's job. The rest of the sibling set keeps its keys
/// unless the gap next to the anchor has collapsed, in which case the set
/// is renumbered in a single pass.
///
/// # Errors
///
/// - [`TreeError::InvalidState`] if `moved` and `anchor` are not siblings.
/// - [`TreeError::NotFound`] if either node is missing, or the anchor
///   loses its parent while a renumber is underway.
/// - Any error from the store, which aborts the operation where it stands.
pub fn place<R>(
    repo: &R,
    moved: NodeId,
    anchor: NodeId,
    direction: Direction,
) -> Result<SortKey, TreeError>
where
    R: Repository + ?Sized,
{
    let base = repo.node(anchor)?.sort_key;

    if repo.parent_of(moved)? != repo.parent_of(anchor)? {
        return Err(TreeError::InvalidState {
            node: moved,
            anchor,
        });
    }

    let key = match neighbor_of(repo, anchor, moved, direction)? {
        None => match direction {
            Direction::After => base + SPACING,
            Direction::Before => base - SPACING,
        },
        Some(neighbor) => {
            let gap = neighbor.sort_key - base;
            if gap.abs() >= MIN_BISECT_GAP {
                // Truncating division lands odd gaps on the key nearer
                // the anchor, matching the historical assignment exactly.
                match direction {
                    Direction::After => base + gap / 2,
                    Direction::Before => base - (base - neighbor.sort_key) / 2,
                }
            } else {
                return resort(repo, moved, anchor, direction);
            }
        }
    };

    update_sort_key(repo, moved, key)?;
    Ok(key)
}

/// Sibling adjacent to `anchor` on `direction`'s side, with `moved`
/// ignored: the node being placed must not serve as its own neighbour.
fn neighbor_of<R>(
    repo: &R,
    anchor: NodeId,
    moved: NodeId,
    direction: Direction,
) -> Result<Option<Node>, TreeError>
where
    R: Repository + ?Sized,
{
    let Some(parent) = repo.parent_of(anchor)? else {
        return Ok(None);
    };

    let mut siblings = repo.children(parent)?;
    siblings.retain(|node| node.id != moved);

    let Some(at) = siblings.iter().position(|node| node.id == anchor) else {
        return Ok(None);
    };

    Ok(match direction {
        Direction::After => siblings.get(at + 1).cloned(),
        Direction::Before => at.checked_sub(1).and_then(|i| siblings.get(i)).cloned(),
    })
}

/// Renumbers the anchor's sibling set at [`SPACING`] intervals, in display
/// order, and gives `moved` the key halfway between the anchor and the
/// requested side.
///
/// `moved` is skipped during the renumber; it receives its final key once,
/// at the end. Running the same renumber twice produces identical keys.
fn resort<R>(
    repo: &R,
    moved: NodeId,
    anchor: NodeId,
    direction: Direction,
) -> Result<SortKey, TreeError>
where
    R: Repository + ?Sized,
{
    let parent = repo.parent_of(anchor)?.ok_or(TreeError::NotFound(anchor))?;

    debug!(%parent, %anchor, "sibling keys exhausted, renumbering set");

    let mut assigned = None;
    let mut index: SortKey = 0;

    for sibling in repo.children(parent)? {
        if sibling.id == moved {
            continue;
        }
        let key = index * SPACING;
        update_sort_key(repo, sibling.id, key)?;
        if sibling.id == anchor {
            assigned = Some(match direction {
                Direction::Before => key - SPACING / 2,
                Direction::After => key + SPACING / 2,
            });
        }
        index += 1;
    }

    let key = assigned.ok_or(TreeError::NotFound(anchor))?;
    update_sort_key(repo, moved, key)?;
    Ok(key)
}
