//! Access policies and their rules.
//!
//! An access policy is a container; its rules live at a nested endpoint under
//! the policy's id. [`AccessRule`] wraps the lifecycle engine for one rule and
//! wires the reference-collection fields (networks, zones, ports, VLAN tags)
//! through the reconciler.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use spm_core::bulk::{BulkConfig, BulkCoordinator, BulkReport};
use spm_core::descriptor::{Operation, ResourceDescriptor};
use spm_core::engine::{EngineConfig, RestEngine, Selector};
use spm_core::error::{Error, Result};
use spm_core::instance::ResourceInstance;
use spm_core::outcome::{Outcome, Skip};
use spm_core::reconcile::{LiteralPolicy, NameResolver, ReconcileStatus, ReferenceSetReconciler};
use spm_core::transport::Transport;
use spm_core::version::ServerVersion;

fn min(version: &str) -> ServerVersion {
    // Catalog literals are compile-time constants; a bad one is a bug here.
    ServerVersion::parse(version).unwrap_or_else(|_| {
        unreachable!("catalog version literal `{version}` must parse")
    })
}

/// Access policy containers.
#[must_use]
pub fn access_policies() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "AccessPolicy",
        "/api/policy/v1/domain/{domainId}/policy/accesspolicies",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "defaultAction", "description"])
    .with_required_fields(Operation::Post, ["name", "defaultAction"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Access rules, nested under their policy container.
#[must_use]
pub fn access_rules() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "AccessRule",
        "/api/policy/v1/domain/{domainId}/policy/accesspolicies/{containerId}/accessrules",
        min("6.1.0"),
    )
    .with_allowed_fields([
        "name",
        "action",
        "enabled",
        "sourceNetworks",
        "destinationNetworks",
        "sourceZones",
        "destinationZones",
        "sourcePorts",
        "destinationPorts",
        "vlanTags",
        "logBegin",
        "logEnd",
        "description",
    ])
    .with_required_fields(Operation::Post, ["name", "action"])
    .with_required_fields(Operation::Put, ["name", "action"])
}

/// What an access rule does with matching traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Permit the traffic, subject to further inspection.
    Allow,
    /// Permit the traffic and bypass inspection.
    Trust,
    /// Drop the traffic.
    Block,
    /// Log the traffic and continue rule evaluation.
    Monitor,
}

impl RuleAction {
    /// Returns the wire value for this action.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Trust => "TRUST",
            Self::Block => "BLOCK",
            Self::Monitor => "MONITOR",
        }
    }
}

impl FromStr for RuleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ALLOW" => Ok(Self::Allow),
            "TRUST" => Ok(Self::Trust),
            "BLOCK" => Ok(Self::Block),
            "MONITOR" => Ok(Self::Monitor),
            _ => Err(Error::ConfigError(format!("Unknown rule action: {s}"))),
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Membership operation on a rule's reference-collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    /// Add a named reference or literal.
    Add,
    /// Remove a named reference or literal.
    Remove,
    /// Delete the whole field.
    Clear,
}

/// The reference-collection fields an access rule carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    /// Traffic sources, networks and literals.
    SourceNetworks,
    /// Traffic destinations, networks and literals.
    DestinationNetworks,
    /// Ingress zones, object references only.
    SourceZones,
    /// Egress zones, object references only.
    DestinationZones,
    /// Source ports, object references only.
    SourcePorts,
    /// Destination ports, object references only.
    DestinationPorts,
    /// VLAN tags, object references only.
    VlanTags,
}

impl RuleField {
    /// Returns the wire field name.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::SourceNetworks => "sourceNetworks",
            Self::DestinationNetworks => "destinationNetworks",
            Self::SourceZones => "sourceZones",
            Self::DestinationZones => "destinationZones",
            Self::SourcePorts => "sourcePorts",
            Self::DestinationPorts => "destinationPorts",
            Self::VlanTags => "vlanTags",
        }
    }

    /// Returns true for fields that accept inline literal values.
    #[must_use]
    pub const fn accepts_literals(&self) -> bool {
        matches!(self, Self::SourceNetworks | Self::DestinationNetworks)
    }
}

/// One access rule bound to its policy container.
#[derive(Debug)]
pub struct AccessRule {
    engine: RestEngine,
}

impl AccessRule {
    /// Creates a rule instance under the given domain and policy container.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rule descriptor is invalid.
    pub fn new(
        domain_id: &str,
        policy_id: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let instance = ResourceInstance::new()
            .with_parent_id("domainId", domain_id)
            .with_parent_id("containerId", policy_id);
        let engine = RestEngine::with_instance(access_rules(), instance, transport)?;
        Ok(Self { engine })
    }

    /// Returns the underlying instance.
    #[must_use]
    pub const fn instance(&self) -> &ResourceInstance {
        self.engine.instance()
    }

    /// Sets the rule name.
    pub fn set_name(&mut self, name: &str) {
        self.engine
            .instance_mut()
            .insert_field("name", Value::String(name.to_string()));
    }

    /// Sets the rule action.
    pub fn set_action(&mut self, action: RuleAction) {
        self.engine
            .instance_mut()
            .insert_field("action", Value::String(action.wire_name().to_string()));
    }

    /// Enables or disables the rule.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.engine
            .instance_mut()
            .insert_field("enabled", Value::Bool(enabled));
    }

    /// Applies a membership operation to one of the rule's reference fields.
    ///
    /// `Add` takes exactly one of `name` or `literal`; `Remove` likewise;
    /// `Clear` takes neither. Zone, port, and VLAN fields accept object
    /// references only.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the name/literal arguments violate
    /// the operation's contract, or when a literal is supplied for an
    /// objects-only field.
    pub fn reconcile(
        &mut self,
        field: RuleField,
        action: CollectionAction,
        name: Option<&str>,
        literal: Option<&str>,
        resolvers: &[&dyn NameResolver],
    ) -> Result<ReconcileStatus> {
        if literal.is_some() && !field.accepts_literals() {
            return Err(Error::ConfigError(format!(
                "field `{}` accepts object references only",
                field.wire_name()
            )));
        }

        let reconciler = ReferenceSetReconciler::new(field.wire_name())
            .with_policy(LiteralPolicy::AllowAll);
        let instance = self.engine.instance_mut();
        match action {
            CollectionAction::Add => reconciler.add(instance, name, literal, resolvers),
            CollectionAction::Remove => reconciler.remove(instance, name, literal),
            CollectionAction::Clear => {
                if name.is_some() || literal.is_some() {
                    return Err(Error::ExclusiveArguments(format!(
                        "field `{}`: clear takes no name or literal",
                        field.wire_name()
                    )));
                }
                Ok(reconciler.clear(instance))
            }
        }
    }

    /// Fetches the rule by the given selector.
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

    /// Creates the rule, validating the action value before dispatch.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn post(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = validate_action(self.engine.instance().field("action")) {
            warn!(reason = %skip, "Rule POST not performed");
            return Ok(Outcome::NotPerformed(skip));
        }
        self.engine.post(config).await
    }

    /// Updates the rule, validating the action value before dispatch.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn put(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = validate_action(self.engine.instance().field("action")) {
            warn!(reason = %skip, "Rule PUT not performed");
            return Ok(Outcome::NotPerformed(skip));
        }
        self.engine.put(config).await
    }

    /// Deletes the rule.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn delete(&mut self, config: &EngineConfig) -> Result<Outcome> {
        self.engine.delete(config).await
    }

    /// Creates many rules under this policy through the chunking coordinator.
    ///
    /// Every rule body's action is validated before the first round-trip; one
    /// invalid action rejects the whole batch.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn post_bulk(
        &mut self,
        rules: Vec<Value>,
        bulk: BulkConfig,
        config: &EngineConfig,
    ) -> Result<BulkReport> {
        let coordinator = BulkCoordinator::new(bulk);
        for rule in &rules {
            if let Some(skip) = validate_action(rule.get("action")) {
                warn!(reason = %skip, "Bulk rule POST rejected before any chunk was sent");
                return Ok(BulkReport::rejected(
                    coordinator.config().chunk_count(rules.len()),
                ));
            }
        }
        coordinator.post(&mut self.engine, rules, config).await
    }
}

fn validate_action(value: Option<&Value>) -> Option<Skip> {
    // An absent action falls through to the required-field check.
    let value = value?;
    match value.as_str() {
        Some(action) if RuleAction::from_str(action).is_ok() => None,
        _ => Some(Skip::Validation(format!(
            "invalid rule action: {value}"
        ))),
    }
}
