// SPDX-License-Identifier: MIT

//! Store-level error type

use thiserror::Error;

/// Failures surfaced by a [`DocumentStore`](super::store::DocumentStore)
/// implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying backend failed (network, I/O, serialization on the
    /// wire). The resolver contains these per-branch; everything else
    /// propagates them.
    #[error("store transport failure: {0}")]
    Transport(String),

    /// A malformed `collection/id` path.
    #[error("invalid document path: {0}")]
    InvalidPath(String),

    /// A document body that is not a field mapping.
    #[error("invalid document body: {0}")]
    InvalidBody(String),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
