//! Drag-item-to pipeline for Grove content trees.
//!
//! Dragging a node onto a target runs a fixed sequence of guard steps
//! (permissions, language copies, heavily-linked moves, shadowed sources),
//! asks the user to confirm when a step calls for it, and finally executes
//! the move or copy, fixes up the sibling sort order through
//! [`grove_tree::order`], and queues link repair for moves.
//!
//! The pipeline is postback-shaped: [`pipeline::DragPipeline::start`] runs
//! until a step needs an answer, parks the operation, and returns an
//! [`pipeline::DragStatus::AwaitingConfirmation`] carrying an operation id.
//! The client echoes that id back through
//! [`pipeline::DragPipeline::resume`] with the user's answer, and the
//! pipeline picks up where it stopped. Any number of operations can be
//! parked at once.

pub mod error;
pub mod host;
pub mod jobs;
pub mod naming;
pub mod pipeline;
pub mod request;
pub mod state;
pub mod steps;
