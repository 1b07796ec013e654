//! # spm-core
//!
//! Generic resource lifecycle engine for security-policy manager REST APIs.
//!
//! Endpoint types are described by static [`descriptor::ResourceDescriptor`]
//! tables; one [`engine::RestEngine`] drives validation, pagination,
//! filtering, dry-run interception, and response merging for all of them.
//! Rule-like membership fields are maintained through
//! [`reconcile::ReferenceSetReconciler`], and oversized create/delete batches
//! are chunked by [`bulk::BulkCoordinator`].
//!
//! ## Modules
//!
//! - [`error`] - Error types for configuration-class failures
//! - [`outcome`] - Non-fatal operation outcomes and skip reasons
//! - [`version`] - Manager version parsing and the minimum-version gate
//! - [`descriptor`] - Static per-endpoint metadata tables
//! - [`instance`] - Mutable per-resource state
//! - [`filter`] - Listing and bulk-delete filter encoding
//! - [`transport`] - Wire collaborator contract
//! - [`http`] - reqwest-backed transport implementation
//! - [`engine`] - The generic lifecycle engine
//! - [`bulk`] - Bulk chunking and sequencing
//! - [`reconcile`] - Reference-set reconciliation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bulk;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod http;
pub mod instance;
pub mod outcome;
pub mod reconcile;
pub mod transport;
pub mod version;

// Re-export commonly used types
pub use error::{Error, Result};
pub use outcome::{Outcome, Skip};
