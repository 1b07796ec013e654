//! Listing-backed name resolvers for the reconciler.
//!
//! A [`ListingResolver`] snapshots one endpoint listing and answers name
//! lookups from it; a [`ResolverChain`] fetches several listings through the
//! lifecycle engine and resolves in catalog-declaration order.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use spm_core::engine::{EngineConfig, RestEngine, Selector};
use spm_core::error::Result;
use spm_core::instance::ResourceInstance;
use spm_core::reconcile::{NameResolver, ObjectRef};
use spm_core::transport::Transport;

use crate::catalog::ObjectKind;

/// Name resolver over one fetched listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingResolver {
    kind: ObjectKind,
    entries: Vec<(String, String)>,
}

impl ListingResolver {
    /// Builds a resolver from a listing's `items`, keeping entries that carry
    /// both a `name` and an `id`.
    #[must_use]
    pub fn from_items(kind: ObjectKind, items: &[Value]) -> Self {
        let entries = items
            .iter()
            .filter_map(|item| {
                let name = item.get("name").and_then(Value::as_str)?;
                let id = item.get("id").and_then(Value::as_str)?;
                Some((name.to_string(), id.to_string()))
            })
            .collect();
        Self { kind, entries }
    }

    /// Returns the kind whose listing this resolver snapshots.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Returns the number of known entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the snapshot holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameResolver for ListingResolver {
    fn resolve(&self, name: &str) -> Option<ObjectRef> {
        // First occurrence in listing order wins.
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(entry_name, id)| ObjectRef::new(entry_name, id, self.kind.type_label()))
    }
}

/// Ordered set of listing resolvers built from live listings.
///
/// Snapshots are taken once at construction; a chain does not observe
/// objects created after it was fetched.
#[derive(Debug, Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<ListingResolver>,
}

impl ResolverChain {
    /// Fetches the listings for the given kinds, in order, through the
    /// lifecycle engine.
    ///
    /// A listing that cannot be fetched contributes an empty resolver and a
    /// warning rather than failing the whole chain.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a descriptor or URL is invalid.
    pub async fn fetch(
        kinds: &[ObjectKind],
        transport: Arc<dyn Transport>,
        config: &EngineConfig,
        domain_id: &str,
    ) -> Result<Self> {
        let mut resolvers = Vec::with_capacity(kinds.len());

        for kind in kinds {
            let instance = ResourceInstance::new().with_parent_id("domainId", domain_id);
            let mut engine =
                RestEngine::with_instance(kind.descriptor(), instance, Arc::clone(&transport))?;

            let outcome = engine.get(Selector::All, config).await?;
            let items: Vec<Value> = outcome
                .value()
                .and_then(|value| value.get("items"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if outcome.is_performed() {
                debug!(kind = %kind, count = items.len(), "Listing snapshot taken");
            } else {
                warn!(
                    kind = %kind,
                    "Listing unavailable; chain will not resolve names of this kind"
                );
            }
            resolvers.push(ListingResolver::from_items(*kind, &items));
        }

        Ok(Self { resolvers })
    }

    /// Builds a chain from pre-fetched resolvers, preserving order.
    #[must_use]
    pub fn from_resolvers(resolvers: Vec<ListingResolver>) -> Self {
        Self { resolvers }
    }

    /// Resolves a name through the chain, first success wins.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ObjectRef> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(name))
    }

    /// Returns the chain as trait-object references for the reconciler.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn NameResolver> {
        self.resolvers
            .iter()
            .map(|resolver| resolver as &dyn NameResolver)
            .collect()
    }
}

impl NameResolver for ResolverChain {
    fn resolve(&self, name: &str) -> Option<ObjectRef> {
        Self::resolve(self, name)
    }
}
