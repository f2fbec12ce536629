// SPDX-License-Identifier: MIT

//! lattice-rs: a backend mediating between client applications and a
//! document-oriented store, with recursive reference resolution and
//! snapshot-based workflow graph reconciliation.

pub mod docstore;
pub mod lattice;
