//! The action catalog.
//!
//! Every operation the framework can issue is an [`Action`] variant carrying
//! its parameters, with three faces:
//!
//! - [`Action::predict`] derives an [`Expectation`](conformance_eval::Expectation)
//!   from the mirrored [`Registry`](conformance_core::Registry) using the oracle,
//! - [`Action::invoke`] issues the real call through a
//!   [`MilvusService`](conformance_core::MilvusService),
//! - [`Action::apply`] folds a successful outcome back into the mirror.

mod action;
mod apply;
mod invoke;
mod predict;

pub use action::Action;
