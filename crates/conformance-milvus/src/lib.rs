//! Service backends for the conformance suite.
//!
//! [`MilvusRestClient`] talks to a live Milvus deployment over its REST API v2.
//! [`InMemoryMilvus`] is an in-process service enforcing the same collection
//! rules; scenarios run against it offline, and it supports fault injection.
//!
//! # Example
//!
//! ```rust,no_run
//! use conformance_core::{CreateCollection, MilvusService};
//! use conformance_milvus::{MilvusConfig, MilvusRestClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MilvusRestClient::new(MilvusConfig::new("http://localhost:19530"))?;
//! client.create_collection(&CreateCollection::fast("books", 128)).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod memory;
mod rest;
mod wire;

pub use config::{MilvusConfig, DEFAULT_ENDPOINT};
pub use memory::InMemoryMilvus;
pub use rest::MilvusRestClient;
