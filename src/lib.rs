//! kubectl-prune: remove ConfigMaps and Secrets that no running pod references.
//!
//! A run is two passes. [`liveness::collect`] scans every pod in scope and
//! freezes the set of referenced objects; the [`prune`] engine then walks
//! the requested objects, keeps anything referenced, platform-managed, or in
//! an excluded namespace, and deletes the rest under operator control.
//!
//! The cluster is reached only through [`store::ObjectStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod query;
pub mod types;

pub mod store;

pub mod liveness;
pub mod prune;

pub mod pipeline;
