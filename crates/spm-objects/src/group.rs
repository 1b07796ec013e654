//! Network group membership editing.
//!
//! A network group's `members` field is a reference collection like a rule's
//! source networks, with one extra restriction: inline literals may be hosts
//! or networks, never ranges.

use std::sync::Arc;

use serde_json::Value;

use spm_core::engine::{EngineConfig, RestEngine, Selector};
use spm_core::error::Result;
use spm_core::instance::ResourceInstance;
use spm_core::outcome::Outcome;
use spm_core::reconcile::{
    LiteralPolicy, NameResolver, ReconcileStatus, ReferenceSetReconciler,
};
use spm_core::transport::Transport;

use crate::catalog;

const MEMBERS_FIELD: &str = "members";

/// One network group and its membership.
#[derive(Debug)]
pub struct NetworkGroup {
    engine: RestEngine,
}

impl NetworkGroup {
    /// Creates a group instance under the given domain.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the group descriptor is invalid.
    pub fn new(domain_id: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let instance = ResourceInstance::new().with_parent_id("domainId", domain_id);
        let engine =
            RestEngine::with_instance(catalog::network_groups(), instance, transport)?;
        Ok(Self { engine })
    }

    /// Returns the underlying instance.
    #[must_use]
    pub const fn instance(&self) -> &ResourceInstance {
        self.engine.instance()
    }

    /// Sets the group name.
    pub fn set_name(&mut self, name: &str) {
        self.engine
            .instance_mut()
            .insert_field("name", Value::String(name.to_string()));
    }

    /// Adds a named member or an inline literal.
    ///
    /// Range literals are rejected with no mutation; group members accept
    /// host and network literals only.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when both or neither of `name` and
    /// `literal` is supplied.
    pub fn add_member(
        &mut self,
        name: Option<&str>,
        literal: Option<&str>,
        resolvers: &[&dyn NameResolver],
    ) -> Result<ReconcileStatus> {
        Self::reconciler().add(self.engine.instance_mut(), name, literal, resolvers)
    }

    /// Removes a named member or an inline literal. Removing the last member
    /// deletes the `members` field from the instance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when both or neither of `name` and
    /// `literal` is supplied.
    pub fn remove_member(
        &mut self,
        name: Option<&str>,
        literal: Option<&str>,
    ) -> Result<ReconcileStatus> {
        Self::reconciler().remove(self.engine.instance_mut(), name, literal)
    }

    /// Deletes the `members` field regardless of current state.
    pub fn clear_members(&mut self) -> ReconcileStatus {
        Self::reconciler().clear(self.engine.instance_mut())
    }

    /// Fetches the group by the given selector.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn get(
        &mut self,
        selector: Selector<'_>,
        config: &EngineConfig,
    ) -> Result<Outcome> {
        self.engine.get(selector, config).await
    }

    /// Creates the group.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn post(&mut self, config: &EngineConfig) -> Result<Outcome> {
        self.engine.post(config).await
    }

    /// Updates the group.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn put(&mut self, config: &EngineConfig) -> Result<Outcome> {
        self.engine.put(config).await
    }

    /// Deletes the group.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn delete(&mut self, config: &EngineConfig) -> Result<Outcome> {
        self.engine.delete(config).await
    }

    const fn reconciler() -> ReferenceSetReconciler<'static> {
        ReferenceSetReconciler::new(MEMBERS_FIELD)
            .with_policy(LiteralPolicy::HostAndNetworkOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spm_core::reconcile::ObjectRef;

    mockall::mock! {
        pub Wire {}

        #[async_trait::async_trait]
        impl Transport for Wire {
            async fn send(
                &self,
                verb: spm_core::transport::Verb,
                url: String,
                body: Option<Value>,
            ) -> Result<Option<Value>>;
        }
    }

    fn group() -> NetworkGroup {
        NetworkGroup::new("global", Arc::new(MockWire::new())).unwrap()
    }

    fn host_resolver() -> impl NameResolver {
        |name: &str| {
            (name == "web-1").then(|| ObjectRef::new("web-1", "uuid-1", "Host"))
        }
    }

    #[test]
    fn range_literals_are_rejected() {
        let mut group = group();

        let status = group
            .add_member(None, Some("10.0.0.1-10.0.0.9"), &[])
            .unwrap();
        assert_eq!(status, ReconcileStatus::RejectedLiteral);
        assert!(!group.instance().has_field("members"));
    }

    #[test]
    fn hosts_and_networks_are_accepted() {
        let mut group = group();

        assert_eq!(
            group.add_member(None, Some("10.0.0.1"), &[]).unwrap(),
            ReconcileStatus::Applied
        );
        assert_eq!(
            group.add_member(None, Some("10.0.0.0/24"), &[]).unwrap(),
            ReconcileStatus::Applied
        );

        let members = group.instance().field("members").unwrap();
        assert_eq!(
            members["literals"],
            json!({"10.0.0.0/24": "network", "10.0.0.1": "host"})
        );
    }

    #[test]
    fn named_members_resolve_through_the_chain() {
        let mut group = group();
        let resolver = host_resolver();

        let status = group
            .add_member(Some("web-1"), None, &[&resolver])
            .unwrap();
        assert_eq!(status, ReconcileStatus::Applied);
        assert_eq!(
            group.instance().field("members").unwrap()["objects"],
            json!([{"name": "web-1", "id": "uuid-1", "type": "Host"}])
        );
    }

    #[test]
    fn removing_last_member_deletes_the_field() {
        let mut group = group();
        group.add_member(None, Some("10.0.0.1"), &[]).unwrap();

        let status = group.remove_member(None, Some("10.0.0.1")).unwrap();
        assert_eq!(status, ReconcileStatus::Applied);
        assert!(!group.instance().has_field("members"));

        assert_eq!(group.clear_members(), ReconcileStatus::AlreadyAbsent);
    }
}
