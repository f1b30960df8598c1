//! Content-tree primitives and sibling ordering for Grove.
//!
//! This crate owns the data model of a content tree (nodes, identifiers,
//! integer sort keys), the [`Repository`](repo::Repository) contract a host
//! store implements, and the [`order`] module that keeps sibling sort keys
//! spaced out as nodes are dragged around.
//!
//! Sort keys are plain integers. New placements reuse the gap next to the
//! anchor sibling when one is available and renumber the whole sibling set
//! at a fixed spacing when the gap has collapsed, so arbitrarily many
//! placements at the same spot stay cheap in the common case.
//!
//! The [`mem`] module ships an in-memory repository that doubles as the
//! behavioural reference for host implementations, including the
//! auto-versioning quirk that [`repo::ScopedEdit`] exists to clean up after.

#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing,
        reason = "tests are allowed to panic on bad fixtures"
    )
)]

pub mod error;
pub mod id;
pub mod mem;
pub mod node;
pub mod order;
pub mod repo;
