//! Descriptor tables for the named-object endpoints.
//!
//! Each function returns the static [`ResourceDescriptor`] for one endpoint
//! type; the lifecycle engine does the rest. Field tables list what a caller
//! may supply, not everything the manager returns.

use std::fmt;
use std::str::FromStr;

use spm_core::descriptor::{KeyField, Operation, ResourceDescriptor};
use spm_core::error::{Error, Result};
use spm_core::version::ServerVersion;

fn min(version: &str) -> ServerVersion {
    // Catalog literals are compile-time constants; a bad one is a bug here.
    ServerVersion::parse(version).unwrap_or_else(|_| {
        unreachable!("catalog version literal `{version}` must parse")
    })
}

/// Object kinds the catalog knows, in resolver-declaration order: named
/// addresses resolve before groups and dynamic objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    /// Single-address object
    Host,
    /// CIDR network object
    Network,
    /// Address-range object
    Range,
    /// Dynamic FQDN object
    Fqdn,
    /// Group of network-like objects
    NetworkGroup,
    /// Protocol/port object
    Port,
    /// Group of port objects
    PortGroup,
    /// Security zone
    SecurityZone,
    /// VLAN tag object
    VlanTag,
    /// Managed device record
    Device,
}

impl ObjectKind {
    /// Returns the wire `type` label for references of this kind.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Host => "Host",
            Self::Network => "Network",
            Self::Range => "Range",
            Self::Fqdn => "FQDN",
            Self::NetworkGroup => "NetworkGroup",
            Self::Port => "ProtocolPortObject",
            Self::PortGroup => "PortObjectGroup",
            Self::SecurityZone => "SecurityZone",
            Self::VlanTag => "VlanTag",
            Self::Device => "Device",
        }
    }

    /// Returns the descriptor for this kind.
    #[must_use]
    pub fn descriptor(&self) -> ResourceDescriptor {
        match self {
            Self::Host => hosts(),
            Self::Network => networks(),
            Self::Range => ranges(),
            Self::Fqdn => fqdns(),
            Self::NetworkGroup => network_groups(),
            Self::Port => ports(),
            Self::PortGroup => port_groups(),
            Self::SecurityZone => security_zones(),
            Self::VlanTag => vlan_tags(),
            Self::Device => devices(),
        }
    }

    /// Candidate kinds for resolving a network-like name, in the order the
    /// listings are consulted.
    #[must_use]
    pub const fn network_candidates() -> &'static [Self] {
        &[
            Self::Host,
            Self::Network,
            Self::Range,
            Self::Fqdn,
            Self::NetworkGroup,
        ]
    }

    /// Candidate kinds for resolving a port-like name.
    #[must_use]
    pub const fn port_candidates() -> &'static [Self] {
        &[Self::Port, Self::PortGroup]
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Host" => Ok(Self::Host),
            "Network" => Ok(Self::Network),
            "Range" => Ok(Self::Range),
            "FQDN" => Ok(Self::Fqdn),
            "NetworkGroup" => Ok(Self::NetworkGroup),
            "ProtocolPortObject" => Ok(Self::Port),
            "PortObjectGroup" => Ok(Self::PortGroup),
            "SecurityZone" => Ok(Self::SecurityZone),
            "VlanTag" => Ok(Self::VlanTag),
            "Device" => Ok(Self::Device),
            _ => Err(Error::ConfigError(format!("Unknown object kind: {s}"))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_label())
    }
}

/// Host address objects.
#[must_use]
pub fn hosts() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "Host",
        "/api/policy/v1/domain/{domainId}/object/hosts",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "value", "description", "overridable"])
    .with_required_fields(Operation::Post, ["name", "value"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// CIDR network objects.
#[must_use]
pub fn networks() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "Network",
        "/api/policy/v1/domain/{domainId}/object/networks",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "value", "description", "overridable"])
    .with_required_fields(Operation::Post, ["name", "value"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Address-range objects.
#[must_use]
pub fn ranges() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "Range",
        "/api/policy/v1/domain/{domainId}/object/ranges",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "value", "description", "overridable"])
    .with_required_fields(Operation::Post, ["name", "value"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Dynamic FQDN objects. Newer endpoint than the address objects.
#[must_use]
pub fn fqdns() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "FQDN",
        "/api/policy/v1/domain/{domainId}/object/fqdns",
        min("6.3.0"),
    )
    .with_allowed_fields(["name", "value", "dnsResolution", "description"])
    .with_required_fields(Operation::Post, ["name", "value"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Groups of network-like objects. Membership lives in the `members`
/// reference collection; group literals accept hosts and networks only (see
/// [`crate::group::NetworkGroup`]).
#[must_use]
pub fn network_groups() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "NetworkGroup",
        "/api/policy/v1/domain/{domainId}/object/networkgroups",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "members", "description"])
    .with_required_fields(Operation::Post, ["name"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Protocol/port objects.
#[must_use]
pub fn ports() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "ProtocolPortObject",
        "/api/policy/v1/domain/{domainId}/object/protocolportobjects",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "port", "protocol", "description", "overridable"])
    .with_required_fields(Operation::Post, ["name", "port", "protocol"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Groups of port objects. Object references only; no literals.
#[must_use]
pub fn port_groups() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "PortObjectGroup",
        "/api/policy/v1/domain/{domainId}/object/portobjectgroups",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "objects", "description"])
    .with_required_fields(Operation::Post, ["name", "objects"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Security zones.
#[must_use]
pub fn security_zones() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "SecurityZone",
        "/api/policy/v1/domain/{domainId}/object/securityzones",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "interfaceMode", "description"])
    .with_required_fields(Operation::Post, ["name", "interfaceMode"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// VLAN tag objects.
#[must_use]
pub fn vlan_tags() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "VlanTag",
        "/api/policy/v1/domain/{domainId}/object/vlantags",
        min("6.1.0"),
    )
    .with_allowed_fields(["name", "data", "description"])
    .with_required_fields(Operation::Post, ["name", "data"])
    .with_required_fields(Operation::Put, ["name"])
    .with_name_filter()
}

/// Managed device records, addressed by `targetId` rather than `id`.
#[must_use]
pub fn devices() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "Device",
        "/api/policy/v1/domain/{domainId}/devices/devicerecords",
        min("6.1.0"),
    )
    .with_allowed_fields([
        "name",
        "hostName",
        "regKey",
        "targetId",
        "accessPolicy",
        "license_caps",
        "description",
    ])
    .with_required_fields(Operation::Post, ["name", "hostName", "regKey"])
    .with_key_field(KeyField::TargetId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_descriptor_is_consistent() {
        for kind in [
            ObjectKind::Host,
            ObjectKind::Network,
            ObjectKind::Range,
            ObjectKind::Fqdn,
            ObjectKind::NetworkGroup,
            ObjectKind::Port,
            ObjectKind::PortGroup,
            ObjectKind::SecurityZone,
            ObjectKind::VlanTag,
            ObjectKind::Device,
        ] {
            kind.descriptor()
                .validate()
                .unwrap_or_else(|err| panic!("{kind}: {err}"));
        }
    }

    #[test]
    fn type_labels_round_trip() {
        for kind in ObjectKind::network_candidates() {
            let parsed: ObjectKind = kind.type_label().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
        assert!(matches!(
            "NoSuchKind".parse::<ObjectKind>().unwrap_err(),
            Error::ConfigError(_)
        ));
    }

    #[test]
    fn network_candidates_keep_declaration_order() {
        let candidates = ObjectKind::network_candidates();
        assert_eq!(candidates[0], ObjectKind::Host);
        assert_eq!(candidates[4], ObjectKind::NetworkGroup);
    }

    #[test]
    fn devices_are_keyed_by_target_id() {
        assert_eq!(devices().key_field(), KeyField::TargetId);
        assert!(!devices().supports_name_filter());
    }

    #[test]
    fn fqdn_requires_newer_manager() {
        let v610 = ServerVersion::parse("6.1.0").unwrap();
        assert!(!v610.satisfies(fqdns().min_version()));
        assert!(v610.satisfies(hosts().min_version()));
    }
}
