//! Reference-set reconciliation for rule-like container fields.
//!
//! Rule resources express membership (source networks, zones, ports, VLAN
//! tags) as a field holding named object references plus inline literal
//! values. This module implements the add/remove/clear contract once, for
//! every such field, given a name-resolver chain supplied by the caller.
//!
//! The reconciler only manages membership links; it never creates or deletes
//! the referenced entities themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::instance::ResourceInstance;

/// A named object reference: no embedded data, just the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object name, unique within a collection.
    pub name: String,
    /// Server-side object id.
    pub id: String,
    /// Object type label (e.g. `Host`, `Network`, `SecurityZone`).
    #[serde(rename = "type")]
    pub kind: String,
}

impl ObjectRef {
    /// Creates a reference from its three parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Inferred kind of an inline literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    /// Single address
    Host,
    /// CIDR block
    Network,
    /// Dashed address range
    Range,
}

impl LiteralKind {
    /// Infers the kind from the raw value: a slash means a network, a dash a
    /// range, anything else a host.
    #[must_use]
    pub fn infer(value: &str) -> Self {
        if value.contains('/') {
            Self::Network
        } else if value.contains('-') {
            Self::Range
        } else {
            Self::Host
        }
    }
}

/// Which literal kinds a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralPolicy {
    /// Hosts, networks, and ranges.
    #[default]
    AllowAll,
    /// Group-typed fields accept host and network literals only.
    HostAndNetworkOnly,
}

impl LiteralPolicy {
    /// Returns true if the policy accepts the given kind.
    #[must_use]
    pub const fn accepts(&self, kind: LiteralKind) -> bool {
        match self {
            Self::AllowAll => true,
            Self::HostAndNetworkOnly => !matches!(kind, LiteralKind::Range),
        }
    }
}

/// The wire shape of a reference-collection field.
///
/// Both halves are always serialized while the field exists; field absence,
/// not emptiness, is what keeps a collection off the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCollection {
    /// Named object references, unique by name.
    #[serde(default)]
    pub objects: Vec<ObjectRef>,
    /// Inline literal values, keyed by the raw value.
    #[serde(default)]
    pub literals: BTreeMap<String, LiteralKind>,
}

impl ReferenceCollection {
    /// Returns true when both halves are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.literals.is_empty()
    }

    /// Returns true if an object with the given name is present.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.objects.iter().any(|entry| entry.name == name)
    }
}

/// Maps a name to an object reference, or nothing.
///
/// The reconciler consults resolvers in declared order and takes the first
/// match, mirroring how candidate listings are ordered (e.g. named addresses
/// before groups before dynamic objects).
pub trait NameResolver {
    /// Resolves a name to an object reference.
    fn resolve(&self, name: &str) -> Option<ObjectRef>;
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> Option<ObjectRef>,
{
    fn resolve(&self, name: &str) -> Option<ObjectRef> {
        self(name)
    }
}

/// Resolves a name through an ordered resolver chain, first success wins.
#[must_use]
pub fn resolve_first(resolvers: &[&dyn NameResolver], name: &str) -> Option<ObjectRef> {
    resolvers.iter().find_map(|resolver| resolver.resolve(name))
}

/// What a reconciliation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// The membership change was applied.
    Applied,
    /// The entry was already present; idempotent no-op.
    Duplicate,
    /// No resolver knew the name; collection left unchanged.
    Unresolved,
    /// The literal kind is not accepted by this field; no mutation.
    RejectedLiteral,
    /// Nothing matched the removal target; no mutation.
    NotFound,
    /// The field was removed from the instance.
    Cleared,
    /// The field was already absent.
    AlreadyAbsent,
}

impl ReconcileStatus {
    /// Returns true when the call mutated the instance.
    #[must_use]
    pub const fn mutated(&self) -> bool {
        matches!(self, Self::Applied | Self::Cleared)
    }
}

/// Add/remove/clear driver for one reference-collection field.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSetReconciler<'a> {
    field: &'a str,
    policy: LiteralPolicy,
}

impl<'a> ReferenceSetReconciler<'a> {
    /// Creates a reconciler for the named instance field.
    #[must_use]
    pub const fn new(field: &'a str) -> Self {
        Self {
            field,
            policy: LiteralPolicy::AllowAll,
        }
    }

    /// Restricts which literal kinds the field accepts.
    #[must_use]
    pub const fn with_policy(mut self, policy: LiteralPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the field name this reconciler manages.
    #[must_use]
    pub const fn field(&self) -> &str {
        self.field
    }

    /// Adds a named reference or an inline literal to the collection.
    ///
    /// Exactly one of `name` and `literal` must be supplied. Adds are
    /// idempotent: a duplicate name or literal value is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExclusiveArguments`] when both or neither argument is
    /// supplied; no mutation is performed in that case.
    pub fn add(
        &self,
        instance: &mut ResourceInstance,
        name: Option<&str>,
        literal: Option<&str>,
        resolvers: &[&dyn NameResolver],
    ) -> Result<ReconcileStatus> {
        match (name, literal) {
            (Some(name), None) => Ok(self.add_name(instance, name, resolvers)),
            (None, Some(literal)) => Ok(self.add_literal(instance, literal)),
            _ => Err(self.exclusive_arguments()),
        }
    }

    /// Removes a named reference or an inline literal from the collection.
    ///
    /// Removing the last entry while the other half is empty deletes the
    /// field from the instance entirely, so it is no longer serialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExclusiveArguments`] when both or neither argument is
    /// supplied; no mutation is performed in that case.
    pub fn remove(
        &self,
        instance: &mut ResourceInstance,
        name: Option<&str>,
        literal: Option<&str>,
    ) -> Result<ReconcileStatus> {
        match (name, literal) {
            (Some(name), None) => Ok(self.remove_entry(instance, |collection| {
                let before = collection.objects.len();
                collection.objects.retain(|entry| entry.name != name);
                collection.objects.len() < before
            })),
            (None, Some(literal)) => Ok(self.remove_entry(instance, |collection| {
                collection.literals.remove(literal).is_some()
            })),
            _ => Err(self.exclusive_arguments()),
        }
    }

    /// Deletes the field from the instance regardless of current state.
    pub fn clear(&self, instance: &mut ResourceInstance) -> ReconcileStatus {
        if instance.remove_field(self.field).is_some() {
            ReconcileStatus::Cleared
        } else {
            ReconcileStatus::AlreadyAbsent
        }
    }

    fn add_name(
        &self,
        instance: &mut ResourceInstance,
        name: &str,
        resolvers: &[&dyn NameResolver],
    ) -> ReconcileStatus {
        let Some(reference) = resolve_first(resolvers, name) else {
            warn!(
                field = self.field,
                name, "No candidate listing resolved the name; collection unchanged"
            );
            return ReconcileStatus::Unresolved;
        };

        let mut collection = self.load(instance);
        if collection.contains_name(name) {
            debug!(field = self.field, name, "Reference already present");
            return ReconcileStatus::Duplicate;
        }
        collection.objects.push(reference);
        self.store(instance, &collection);
        ReconcileStatus::Applied
    }

    fn add_literal(&self, instance: &mut ResourceInstance, literal: &str) -> ReconcileStatus {
        let kind = LiteralKind::infer(literal);
        if !self.policy.accepts(kind) {
            error!(
                field = self.field,
                literal, "Literal kind not accepted by this field; no mutation"
            );
            return ReconcileStatus::RejectedLiteral;
        }

        let mut collection = self.load(instance);
        if collection.literals.contains_key(literal) {
            debug!(field = self.field, literal, "Literal already present");
            return ReconcileStatus::Duplicate;
        }
        collection.literals.insert(literal.to_string(), kind);
        self.store(instance, &collection);
        ReconcileStatus::Applied
    }

    fn remove_entry<F>(&self, instance: &mut ResourceInstance, remove: F) -> ReconcileStatus
    where
        F: FnOnce(&mut ReferenceCollection) -> bool,
    {
        if !instance.has_field(self.field) {
            debug!(field = self.field, "Field absent; nothing to remove");
            return ReconcileStatus::NotFound;
        }

        let mut collection = self.load(instance);
        if !remove(&mut collection) {
            warn!(field = self.field, "Removal target not found; no mutation");
            return ReconcileStatus::NotFound;
        }

        if collection.is_empty() {
            // Field presence controls serialization, so the empty collection
            // is deleted rather than written back.
            instance.remove_field(self.field);
        } else {
            self.store(instance, &collection);
        }
        ReconcileStatus::Applied
    }

    fn load(&self, instance: &ResourceInstance) -> ReferenceCollection {
        instance
            .field(self.field)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    fn store(&self, instance: &mut ResourceInstance, collection: &ReferenceCollection) {
        // Serialization of the collection shape cannot fail.
        if let Ok(value) = serde_json::to_value(collection) {
            instance.insert_field(self.field, value);
        }
    }

    fn exclusive_arguments(&self) -> Error {
        Error::ExclusiveArguments(format!(
            "field `{}`: supply exactly one of `name` or `literal`",
            self.field
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELD: &str = "sourceNetworks";

    fn resolver_for(name: &'static str, id: &'static str, kind: &'static str) -> impl NameResolver {
        move |query: &str| {
            if query == name {
                Some(ObjectRef::new(name, id, kind))
            } else {
                None
            }
        }
    }

    fn no_match(_: &str) -> Option<ObjectRef> {
        None
    }

    #[test]
    fn literal_kind_inference() {
        assert_eq!(LiteralKind::infer("10.0.0.1"), LiteralKind::Host);
        assert_eq!(LiteralKind::infer("10.0.0.0/24"), LiteralKind::Network);
        assert_eq!(LiteralKind::infer("10.0.0.1-10.0.0.9"), LiteralKind::Range);
    }

    #[test]
    fn add_name_transitions_absent_to_objects_only() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        let resolver = resolver_for("Net-A", "uuid-1", "Network");

        let status = reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();

        assert_eq!(status, ReconcileStatus::Applied);
        assert_eq!(
            instance.field(FIELD),
            Some(&json!({
                "objects": [{"name": "Net-A", "id": "uuid-1", "type": "Network"}],
                "literals": {}
            }))
        );
    }

    #[test]
    fn add_name_is_idempotent() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        let resolver = resolver_for("Net-A", "uuid-1", "Network");

        reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();
        let second = reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();

        assert_eq!(second, ReconcileStatus::Duplicate);
        let objects = instance.field(FIELD).unwrap()["objects"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(objects, 1);
    }

    #[test]
    fn add_unresolved_name_leaves_collection_unchanged() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);

        let status = reconciler
            .add(&mut instance, Some("Ghost"), None, &[&no_match])
            .unwrap();

        assert_eq!(status, ReconcileStatus::Unresolved);
        assert!(!instance.has_field(FIELD));
    }

    #[test]
    fn resolver_chain_order_decides() {
        let groups = resolver_for("Net-A", "uuid-group", "NetworkGroup");
        let hosts = resolver_for("Net-A", "uuid-host", "Host");

        let first = resolve_first(&[&hosts, &groups], "Net-A").unwrap();
        assert_eq!(first.id, "uuid-host");

        let first = resolve_first(&[&groups, &hosts], "Net-A").unwrap();
        assert_eq!(first.id, "uuid-group");
    }

    #[test]
    fn add_name_to_literals_only_preserves_literals() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        reconciler
            .add(&mut instance, None, Some("10.0.0.0/24"), &[])
            .unwrap();

        let resolver = resolver_for("Net-A", "uuid-1", "Network");
        reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();

        let field = instance.field(FIELD).unwrap();
        assert_eq!(field["objects"].as_array().unwrap().len(), 1);
        assert_eq!(field["literals"]["10.0.0.0/24"], json!("network"));
    }

    #[test]
    fn add_duplicate_literal_is_noop() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);

        reconciler
            .add(&mut instance, None, Some("10.0.0.1"), &[])
            .unwrap();
        let second = reconciler
            .add(&mut instance, None, Some("10.0.0.1"), &[])
            .unwrap();

        assert_eq!(second, ReconcileStatus::Duplicate);
    }

    #[test]
    fn group_policy_rejects_range_literals() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new("networkGroupMembers")
            .with_policy(LiteralPolicy::HostAndNetworkOnly);

        let status = reconciler
            .add(&mut instance, None, Some("10.0.0.1-10.0.0.9"), &[])
            .unwrap();

        assert_eq!(status, ReconcileStatus::RejectedLiteral);
        assert!(!instance.has_field("networkGroupMembers"));

        // Hosts and networks still pass.
        let status = reconciler
            .add(&mut instance, None, Some("10.0.0.0/24"), &[])
            .unwrap();
        assert_eq!(status, ReconcileStatus::Applied);
    }

    #[test]
    fn both_arguments_is_config_error_without_mutation() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        let resolver = resolver_for("Net-A", "uuid-1", "Network");

        let err = reconciler
            .add(&mut instance, Some("Net-A"), Some("10.0.0.1"), &[&resolver])
            .unwrap_err();
        assert!(matches!(err, Error::ExclusiveArguments(_)));
        assert!(!instance.has_field(FIELD));

        let err = reconciler.remove(&mut instance, None, None).unwrap_err();
        assert!(matches!(err, Error::ExclusiveArguments(_)));
    }

    #[test]
    fn removing_last_entry_deletes_the_field() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        let resolver = resolver_for("Net-A", "uuid-1", "Network");

        reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();
        let status = reconciler
            .remove(&mut instance, Some("Net-A"), None)
            .unwrap();

        assert_eq!(status, ReconcileStatus::Applied);
        // The field is gone, not an empty collection.
        assert!(!instance.has_field(FIELD));
    }

    #[test]
    fn remove_missing_target_is_noop() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);

        let status = reconciler
            .remove(&mut instance, Some("Ghost"), None)
            .unwrap();
        assert_eq!(status, ReconcileStatus::NotFound);

        reconciler
            .add(&mut instance, None, Some("10.0.0.1"), &[])
            .unwrap();
        let status = reconciler
            .remove(&mut instance, None, Some("10.9.9.9"))
            .unwrap();
        assert_eq!(status, ReconcileStatus::NotFound);
        assert!(instance.has_field(FIELD));
    }

    #[test]
    fn clear_is_unconditional_and_idempotent() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);

        assert_eq!(reconciler.clear(&mut instance), ReconcileStatus::AlreadyAbsent);

        reconciler
            .add(&mut instance, None, Some("10.0.0.1"), &[])
            .unwrap();
        assert_eq!(reconciler.clear(&mut instance), ReconcileStatus::Cleared);
        assert!(!instance.has_field(FIELD));
    }

    #[test]
    fn full_lifecycle_scenario() {
        let mut instance = ResourceInstance::new();
        let reconciler = ReferenceSetReconciler::new(FIELD);
        let resolver = resolver_for("Net-A", "uuid-1", "Network");

        reconciler
            .add(&mut instance, Some("Net-A"), None, &[&resolver])
            .unwrap();
        assert_eq!(
            instance.field(FIELD),
            Some(&json!({
                "objects": [{"name": "Net-A", "id": "uuid-1", "type": "Network"}],
                "literals": {}
            }))
        );

        reconciler
            .add(&mut instance, None, Some("10.0.0.0/24"), &[])
            .unwrap();
        assert_eq!(
            instance.field(FIELD),
            Some(&json!({
                "objects": [{"name": "Net-A", "id": "uuid-1", "type": "Network"}],
                "literals": {"10.0.0.0/24": "network"}
            }))
        );

        // Literals remain, so the field survives the object removal.
        reconciler
            .remove(&mut instance, Some("Net-A"), None)
            .unwrap();
        assert_eq!(
            instance.field(FIELD),
            Some(&json!({
                "objects": [],
                "literals": {"10.0.0.0/24": "network"}
            }))
        );

        reconciler
            .remove(&mut instance, None, Some("10.0.0.0/24"))
            .unwrap();
        assert!(!instance.has_field(FIELD));
    }

    #[test]
    fn collection_round_trips_through_serde() {
        let mut collection = ReferenceCollection::default();
        collection.objects.push(ObjectRef::new("Z", "uuid-9", "SecurityZone"));
        collection
            .literals
            .insert("10.1.0.0/16".to_string(), LiteralKind::Network);

        let value = serde_json::to_value(&collection).unwrap();
        let back: ReferenceCollection = serde_json::from_value(value).unwrap();
        assert_eq!(back, collection);
        assert!(back.contains_name("Z"));
        assert!(!back.is_empty());
    }
}
