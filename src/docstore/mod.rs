// SPDX-License-Identifier: MIT

//! Document-store kit: the value/reference data model, the async store
//! contract, and the in-memory implementation.

pub mod error;
pub mod memory;
pub mod store;
pub mod value;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{DocumentStore, FieldFilter};
pub use value::{fields_from_json, fields_to_json, Document, Fields, Reference, Value};
