// SPDX-License-Identifier: MIT

//! Application layer: resolver, graph reconciler, HTTP surface, reports,
//! chat proxy, and seed loading, all over an injected document store.

pub mod chat;
pub mod error;
pub mod reports;
pub mod resolver;
pub mod seed;
pub mod server;
pub mod workflow;
