//! Background link-repair worker.
//!
//! Moving an item leaves inbound links pointing at its old location. The
//! pipeline queues a repair pass instead of holding the postback open for
//! it: [`LinkRepairQueue`] feeds roots through an unbounded channel to a
//! single worker task, which drives [`LinkIndex::repair`] one root at a
//! time and keeps going when a repair fails.

use std::sync::Arc;

use grove_tree::id::NodeId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ShellError;
use crate::host::{JobScheduler, LinkIndex};

/// Job queue draining into a [`LinkIndex`] on its own task.
#[derive(Clone, Debug)]
pub struct LinkRepairQueue {
    tx: mpsc::UnboundedSender<NodeId>,
}

impl LinkRepairQueue {
    /// Spawns the worker task on the current runtime and returns the
    /// queue handle. The worker stops once every handle is dropped and
    /// the backlog is drained.
    pub fn spawn<L>(links: Arc<L>) -> Self
    where
        L: LinkIndex + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        drop(tokio::spawn(async move {
            while let Some(root) = rx.recv().await {
                match links.repair(root).await {
                    Ok(()) => debug!(%root, "link repair completed"),
                    Err(err) => warn!(%root, %err, "link repair failed"),
                }
            }
        }));

        Self { tx }
    }
}

impl JobScheduler for LinkRepairQueue {
    fn schedule_link_repair(&self, root: NodeId) -> Result<(), ShellError> {
        self.tx
            .send(root)
            .map_err(|_| ShellError::Jobs("link repair worker is gone".to_owned()))
    }
}
