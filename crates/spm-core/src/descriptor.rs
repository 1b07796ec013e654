//! Static per-endpoint metadata consumed by the lifecycle engine.
//!
//! One [`ResourceDescriptor`] replaces what would otherwise be a subclass per
//! endpoint: the URL template, the caller-facing field allowlist, the
//! required-field sets per operation, and the minimum manager version.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::version::ServerVersion;

/// Lifecycle operations a descriptor can declare requirements for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Fetch one resource or a listing
    Get,
    /// Create a resource
    Post,
    /// Update a resource
    Put,
    /// Delete a resource
    Delete,
    /// Create many resources in one call. Bulk bodies must satisfy the
    /// [`Operation::Post`] table plus anything declared under this one.
    BulkPost,
    /// Delete many resources in one call. Bulk deletes address resources by
    /// id, so this table is normally left empty.
    BulkDelete,
}

impl Operation {
    /// Returns the operation name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::BulkPost => "BULK_POST",
            Self::BulkDelete => "BULK_DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which instance field identifies an existing resource server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyField {
    /// Standard `id` field
    #[default]
    Id,
    /// Resources addressed through a `targetId` field instead
    TargetId,
}

impl KeyField {
    /// Returns the wire name of the key field.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::TargetId => "targetId",
        }
    }
}

/// Static metadata for one REST endpoint type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    type_name: String,
    url_template: String,
    allowed_fields: BTreeSet<String>,
    required_fields: BTreeMap<Operation, BTreeSet<String>>,
    min_version: ServerVersion,
    key_field: KeyField,
    supports_name_filter: bool,
}

impl ResourceDescriptor {
    /// Creates a descriptor with the given type name, URL template, and
    /// minimum manager version. Field tables start empty.
    #[must_use]
    pub fn new(
        type_name: impl Into<String>,
        url_template: impl Into<String>,
        min_version: ServerVersion,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            url_template: url_template.into(),
            allowed_fields: BTreeSet::new(),
            required_fields: BTreeMap::new(),
            min_version,
            key_field: KeyField::Id,
            supports_name_filter: false,
        }
    }

    /// Declares the caller-facing field allowlist.
    #[must_use]
    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declares the required field set for an operation.
    #[must_use]
    pub fn with_required_fields<I, S>(mut self, operation: Operation, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields
            .entry(operation)
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declares which field identifies an existing resource.
    #[must_use]
    pub const fn with_key_field(mut self, key_field: KeyField) -> Self {
        self.key_field = key_field;
        self
    }

    /// Declares that the endpoint supports server-side exact-name filtering.
    #[must_use]
    pub const fn with_name_filter(mut self) -> Self {
        self.supports_name_filter = true;
        self
    }

    /// Checks descriptor consistency: every required field must also be
    /// allowed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (operation, required) in &self.required_fields {
            for field in required {
                if !self.allowed_fields.contains(field) {
                    return Err(Error::ConfigError(format!(
                        "descriptor `{}`: required field `{field}` for {operation} is not in the allowlist",
                        self.type_name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the resource type name (used for logging and `type` labels).
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the URL template with `{placeholder}` parent-id slots.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Returns the caller-facing field allowlist.
    #[must_use]
    pub const fn allowed_fields(&self) -> &BTreeSet<String> {
        &self.allowed_fields
    }

    /// Returns the required field set for an operation (empty when none
    /// declared).
    #[must_use]
    pub fn required_fields(&self, operation: Operation) -> &BTreeSet<String> {
        static EMPTY: std::sync::OnceLock<BTreeSet<String>> = std::sync::OnceLock::new();
        self.required_fields
            .get(&operation)
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeSet::new))
    }

    /// Returns the minimum manager version for this endpoint.
    #[must_use]
    pub const fn min_version(&self) -> &ServerVersion {
        &self.min_version
    }

    /// Returns which field identifies an existing resource.
    #[must_use]
    pub const fn key_field(&self) -> KeyField {
        self.key_field
    }

    /// Returns true if the endpoint supports server-side name filtering.
    #[must_use]
    pub const fn supports_name_filter(&self) -> bool {
        self.supports_name_filter
    }
}
