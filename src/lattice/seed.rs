// SPDX-License-Identifier: MIT

//! Seed loader - YAML fixture loading into a store
//!
//! A seed file maps collection names to documents:
//!
//! ```yaml
//! users:
//!   u1:
//!     name: ada
//! tasks:
//!   t1:
//!     title: ship
//!     assigned_to:
//!       $ref: users/u1
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::docstore::{fields_from_json, DocumentStore};
use crate::lattice::error::LatticeError;

type SeedFile = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

pub struct SeedLoader;

impl SeedLoader {
    /// Load a seed file and write every document into the store. Returns the
    /// number of documents written.
    pub async fn load<P: AsRef<Path>>(
        path: P,
        store: &dyn DocumentStore,
    ) -> Result<usize, LatticeError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content, store).await
    }

    /// Parse seed YAML and write it into the store.
    pub async fn load_str(
        content: &str,
        store: &dyn DocumentStore,
    ) -> Result<usize, LatticeError> {
        let seed: SeedFile = serde_yaml::from_str(content)?;
        let mut written = 0;
        for (collection, docs) in &seed {
            for (id, body) in docs {
                let fields = fields_from_json(body)?;
                store.set(collection, id, fields, false).await?;
                written += 1;
            }
        }
        log::info!("seeded {} documents", written);
        Ok(written)
    }
}
