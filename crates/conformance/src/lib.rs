//! Conformance: black-box conformance testing for Milvus-style collection services.
//!
//! This crate re-exports the conformance sub-crates for single-import usage.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `driver`, `milvus` |
//! | `driver` | Scenarios, sessions, table-driven cases and parallel runs |
//! | `milvus` | REST v2 client and the in-memory reference service |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use conformance::catalog::Action;
//! use conformance::core::CreateCollection;
//! use conformance::driver::{Scenario, ScenarioContext};
//! use conformance::milvus::InMemoryMilvus;
//! ```

/// Error taxonomy, message templates, schema model, naming oracle and the
/// `MilvusService` trait. Always available.
pub use conformance_core as core;

/// Expectations, state predicates, `check` and reports. Always available.
pub use conformance_eval as eval;

/// The action catalog: `Action` with predict, invoke and apply.
pub use conformance_catalog as catalog;

/// Scenario driver.
#[cfg(feature = "driver")]
pub use conformance_driver as driver;

/// Service backends.
#[cfg(feature = "milvus")]
pub use conformance_milvus as milvus;
