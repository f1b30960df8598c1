//! Confirmation state for suspended drag operations.
//!
//! A drag that needs the user's blessing parks between postbacks. Its
//! lifecycle is a small state machine:
//!
//! ```text
//! Init ──ask──> AwaitingConfirmation ──yes──> Confirmed ──ask──> ...
//!                        │
//!                        no
//!                        ▼
//!                     Aborted
//! ```
//!
//! `Confirmed` records which step asked, so the driver resumes with the
//! step after it; a later step may ask again. `Aborted` is terminal.

use core::fmt::{self, Debug, Display, Formatter};
use core::str::FromStr;

use rand::RngCore;
use tokio::sync::oneshot;

use crate::pipeline::DragStatus;
use crate::steps::{DragTask, StepId};

/// Correlation id handed to the client for a parked operation.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OperationId([u8; 16]);

impl OperationId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0_u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Debug for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({self})")
    }
}

impl FromStr for OperationId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0_u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// The user's answer to a confirm dialog.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Answer {
    /// Proceed past the asking step.
    Yes,
    /// Abandon the operation.
    No,
}

/// Where an operation stands in its confirmation lifecycle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfirmState {
    /// No dialog asked yet; steps run freely.
    Init,
    /// A dialog is on the client; the operation is parked.
    AwaitingConfirmation {
        /// Step that asked.
        step: StepId,
        /// Question put to the user.
        prompt: String,
    },
    /// The last dialog was answered yes.
    Confirmed {
        /// Step whose question was confirmed.
        step: StepId,
    },
    /// The user declined, or a guard rejected the operation.
    Aborted,
}

impl ConfirmState {
    /// Transition into waiting on `step`'s question.
    #[must_use]
    pub fn ask(step: StepId, prompt: String) -> Self {
        Self::AwaitingConfirmation { step, prompt }
    }

    /// Applies a postback answer. Returns `None` when no dialog is
    /// outstanding, which the driver reports as a protocol error.
    #[must_use]
    pub fn answered(&self, answer: Answer) -> Option<Self> {
        match self {
            Self::AwaitingConfirmation { step, .. } => Some(match answer {
                Answer::Yes => Self::Confirmed { step: *step },
                Answer::No => Self::Aborted,
            }),
            Self::Init | Self::Confirmed { .. } | Self::Aborted => None,
        }
    }

    /// Step whose question is outstanding, if any.
    #[must_use]
    pub fn awaiting(&self) -> Option<StepId> {
        match self {
            Self::AwaitingConfirmation { step, .. } => Some(*step),
            Self::Init | Self::Confirmed { .. } | Self::Aborted => None,
        }
    }
}

/// A parked operation: the resolved task, the step cursor it stopped at,
/// its confirmation state, and the completion channel, if anyone watches.
#[derive(Debug)]
pub(crate) struct PendingDrag {
    pub task: DragTask,
    pub cursor: usize,
    pub state: ConfirmState,
    pub done: Option<oneshot::Sender<DragStatus>>,
}
