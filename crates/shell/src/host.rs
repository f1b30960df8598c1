//! Host collaborator seams.
//!
//! The pipeline core stays deterministic and synchronous; everything
//! environment-shaped (security, the link database, client dialogs,
//! background jobs) arrives through these traits.

use async_trait::async_trait;
use grove_tree::id::NodeId;

use crate::error::ShellError;

/// Security gate over the destination of a drag.
pub trait AccessPolicy {
    /// Whether the current user may create items under `parent`.
    fn can_create(&self, parent: NodeId) -> bool;

    /// Whether `source` may be moved under `target`.
    fn can_move_to(&self, source: NodeId, target: NodeId) -> bool;

    /// Whether `source` may be copied under `target`.
    fn can_copy_to(&self, source: NodeId, target: NodeId) -> bool;
}

/// Policy that permits everything. Useful in development setups and
/// anywhere security is enforced upstream.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermitAll;

impl AccessPolicy for PermitAll {
    fn can_create(&self, _parent: NodeId) -> bool {
        true
    }

    fn can_move_to(&self, _source: NodeId, _target: NodeId) -> bool {
        true
    }

    fn can_copy_to(&self, _source: NodeId, _target: NodeId) -> bool {
        true
    }
}

/// Link database: who points at a node, and rewriting those links after
/// the node moves.
#[async_trait]
pub trait LinkIndex: Send + Sync {
    /// Number of items holding links to `id`.
    ///
    /// # Errors
    ///
    /// [`ShellError::Links`] when the index cannot answer.
    fn referrer_count(&self, id: NodeId) -> Result<usize, ShellError>;

    /// Rewrites links pointing into the subtree rooted at `root`. Invoked
    /// from the background worker, not from the postback path.
    ///
    /// # Errors
    ///
    /// [`ShellError::Links`] when the rewrite fails.
    async fn repair(&self, root: NodeId) -> Result<(), ShellError>;
}

/// Client dialog surface. Implementations render; answers come back on a
/// later postback through the pipeline, not through return values here.
pub trait Frontend {
    /// Shows a blocking alert for an operation that was just rejected.
    fn alert(&self, message: &str);

    /// Shows a yes/no dialog. The answer arrives via
    /// [`DragPipeline::resume`](crate::pipeline::DragPipeline::resume).
    fn confirm(&self, message: &str);

    /// Whether the client editor state permits starting the operation.
    /// `false` (unsaved changes, typically) abandons the drag without any
    /// dialog.
    fn check_modified(&self) -> bool {
        true
    }
}

/// Background-job submission seam.
pub trait JobScheduler {
    /// Queues a link-repair pass rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`ShellError::Jobs`] when the job cannot be queued.
    fn schedule_link_repair(&self, root: NodeId) -> Result<(), ShellError>;
}

/// Scheduler that drops every job. For hosts without a link database.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJobs;

impl JobScheduler for NoJobs {
    fn schedule_link_repair(&self, _root: NodeId) -> Result<(), ShellError> {
        Ok(())
    }
}
