//! Object catalog for the security policy manager API.
//!
//! This crate names the reusable object endpoints (hosts, networks, ports,
//! zones, devices) as [`spm_core`] resource descriptors and provides
//! listing-backed name resolvers for reference-set reconciliation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use spm_core::engine::{EngineConfig, RestEngine, Selector};
//! use spm_core::http::HttpTransportBuilder;
//! use spm_core::instance::ResourceInstance;
//! use spm_core::version::ServerVersion;
//! use spm_objects::catalog::ObjectKind;
//!
//! # async fn example() -> spm_core::Result<()> {
//! let transport = Arc::new(
//!     HttpTransportBuilder::new()
//!         .with_token("session-token")
//!         .build()?,
//! );
//! let config = EngineConfig::new(
//!     "https://mgr.example.com",
//!     ServerVersion::parse("7.2.0")?,
//! );
//!
//! let instance = ResourceInstance::new().with_parent_id("domainId", "global");
//! let mut hosts =
//!     RestEngine::with_instance(ObjectKind::Host.descriptor(), instance, transport)?;
//! let listing = hosts.get(Selector::All, &config).await?;
//! # let _ = listing;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod group;
pub mod resolver;

pub use catalog::ObjectKind;
pub use group::NetworkGroup;
pub use resolver::{ListingResolver, ResolverChain};
