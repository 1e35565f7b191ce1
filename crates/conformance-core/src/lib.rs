//! Core types for black-box conformance testing of a vector collection service.
//!
//! The crate holds everything that does not talk to a live service:
//!
//! - [`ConformanceError`] and the [`ErrorKind`] taxonomy,
//! - [`ErrorTemplate`], the literal messages a conforming service returns,
//! - the naming and schema [`oracle`],
//! - the [`Resource`]/[`Registry`] mirror used to predict outcomes,
//! - the [`MilvusService`] trait every backend implements.

mod error;
pub mod filter;
pub mod metric;
pub mod oracle;
mod resource;
mod schema;
mod service;
mod template;

pub use error::{ConformanceError, ErrorKind, SchemaErrorKind};
pub use filter::{CompareOp, Filter};
pub use oracle::ServiceLimits;
pub use resource::{vector_of, IndexState, LoadState, Registry, Resource};
pub use schema::{
    default_metric_for, stringify, CollectionSchema, ConsistencyLevel, CreateCollection,
    DataType, FieldSchema, IdType, IndexSpec, IndexType, MetricType, PrimaryKey, Row,
};
pub use service::{
    CollectionDescription, DeleteSelector, IndexDescription, InsertResult, MilvusService,
    SearchHit, SearchRequest,
};
pub use template::ErrorTemplate;
