//! Access-policy facade for the security policy manager API.
//!
//! Builds on [`spm_core`]'s lifecycle engine and [`spm_objects`]'s resolver
//! chains to offer a typed surface over access policies and their rules.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use spm_core::engine::EngineConfig;
//! use spm_core::http::HttpTransportBuilder;
//! use spm_core::transport::Transport;
//! use spm_core::version::ServerVersion;
//! use spm_objects::{ObjectKind, ResolverChain};
//! use spm_policy::access::{AccessRule, CollectionAction, RuleAction, RuleField};
//!
//! # async fn example() -> spm_core::Result<()> {
//! let transport: Arc<dyn Transport> = Arc::new(
//!     HttpTransportBuilder::new()
//!         .with_token("session-token")
//!         .build()?,
//! );
//! let config = EngineConfig::new(
//!     "https://mgr.example.com",
//!     ServerVersion::parse("7.2.0")?,
//! );
//!
//! let chain = ResolverChain::fetch(
//!     ObjectKind::network_candidates(),
//!     Arc::clone(&transport),
//!     &config,
//!     "global",
//! )
//! .await?;
//!
//! let mut rule = AccessRule::new("global", "policy-1", transport)?;
//! rule.set_name("allow-web");
//! rule.set_action(RuleAction::Allow);
//! rule.reconcile(
//!     RuleField::SourceNetworks,
//!     CollectionAction::Add,
//!     Some("Net-A"),
//!     None,
//!     &chain.as_refs(),
//! )?;
//! let outcome = rule.post(&config).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod access;

pub use access::{AccessRule, CollectionAction, RuleAction, RuleField};
