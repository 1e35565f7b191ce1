//! Scenario driver.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s. Each step is predicted
//! from the mirror held in the [`ScenarioContext`], invoked through one of the
//! context's [`Session`]s, checked, and folded back into the mirror when both
//! prediction and outcome were a success. The first failing step aborts the
//! scenario and is reported by index.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use conformance_catalog::Action;
//! use conformance_core::{CreateCollection, MilvusService};
//! use conformance_driver::{DriverConfig, Scenario, ScenarioContext, Session};
//!
//! # async fn example(service: Arc<dyn MilvusService>) {
//! let mut ctx = ScenarioContext::new(DriverConfig::default(), Session::new("default", service));
//! let name = ctx.names().unique("books");
//! let report = Scenario::new("create then drop")
//!     .step(Action::create_collection(CreateCollection::fast(&name, 128)))
//!     .step(Action::drop_collection(&name))
//!     .run(&mut ctx)
//!     .await;
//! assert!(report.passed());
//! # }
//! ```

mod config;
pub mod data;
mod names;
mod runner;
mod scenario;
mod session;
mod table;

pub use config::DriverConfig;
pub use names::NameGen;
pub use runner::{run_all, run_scenarios};
pub use scenario::{Declared, Scenario, ScenarioContext, ScenarioReport, Step, StepRecord};
pub use session::Session;
pub use table::{Case, CaseTable};
