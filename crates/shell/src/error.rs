//! Pipeline-level errors.

use grove_tree::error::TreeError;
use thiserror::Error as ThisError;

use crate::state::OperationId;

/// Failure of a drag operation.
///
/// Guard rejections and user declines are not errors; they end the
/// operation through [`DragStatus::Aborted`](crate::pipeline::DragStatus).
/// These variants cover broken requests and failing collaborators.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum ShellError {
    /// Tree or repository failure, passed through unchanged.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Postback for an operation id the pipeline is not tracking.
    #[error("unknown operation {0}")]
    UnknownOperation(OperationId),

    /// Postback for an operation that has no outstanding dialog.
    #[error("operation {0} is not awaiting confirmation")]
    NotAwaiting(OperationId),

    /// The link index could not answer or repair.
    #[error("link index failure: {0}")]
    Links(String),

    /// Background job submission failed.
    #[error("job scheduler failure: {0}")]
    Jobs(String),
}
