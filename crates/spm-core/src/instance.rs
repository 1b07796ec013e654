//! Mutable in-memory state for one server-side resource.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::descriptor::{KeyField, ResourceDescriptor};

/// In-memory representation of one server-side entity.
///
/// Created empty, populated from caller input or a prior GET response, and
/// carrying an `id` once the entity is known to exist server-side. After a
/// successful delete the instance keeps its last state but no longer refers to
/// anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceInstance {
    fields: Map<String, Value>,
    id: Option<String>,
    parent_ids: BTreeMap<String, String>,
    bulk_post_data: Option<Vec<Value>>,
    bulk_delete_data: Option<Vec<String>>,
}

impl ResourceInstance {
    /// Creates an empty instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a parent id used to resolve a `{placeholder}` in the URL
    /// template (e.g. the domain or container id).
    #[must_use]
    pub fn with_parent_id(mut self, placeholder: impl Into<String>, id: impl Into<String>) -> Self {
        self.parent_ids.insert(placeholder.into(), id.into());
        self
    }

    /// Returns the bound parent ids.
    #[must_use]
    pub const fn parent_ids(&self) -> &BTreeMap<String, String> {
        &self.parent_ids
    }

    /// Merges caller-supplied fields, dropping anything outside the
    /// descriptor's allowlist.
    ///
    /// Unknown keys are logged and discarded rather than rejected, so a caller
    /// working against a newer manager can pass extra fields without breaking
    /// older descriptors.
    pub fn set_fields(&mut self, descriptor: &ResourceDescriptor, fields: Map<String, Value>) {
        for (key, value) in fields {
            if descriptor.allowed_fields().contains(&key) {
                self.fields.insert(key, value);
            } else {
                warn!(
                    resource = descriptor.type_name(),
                    field = %key,
                    "Dropping field not in the descriptor allowlist"
                );
            }
        }
    }

    /// Returns a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns true if the field is present, regardless of its value.
    ///
    /// Presence, not emptiness, decides whether a field is serialized.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns all current fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Inserts a field value directly, bypassing the allowlist.
    ///
    /// Used by the reconciler and by response merging; callers should prefer
    /// [`Self::set_fields`].
    pub fn insert_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Removes a field entirely, returning its previous value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns the server-side identifier, if known.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the value of the descriptor's key field, if present.
    #[must_use]
    pub fn key_value(&self, key_field: KeyField) -> Option<&str> {
        match key_field {
            KeyField::Id => self.id(),
            KeyField::TargetId => self.fields.get("targetId").and_then(Value::as_str),
        }
    }

    /// Merges a manager response into the instance, acquiring the `id` when
    /// the response carries one.
    pub fn merge_response(&mut self, response: &Value) {
        if let Some(object) = response.as_object() {
            for (key, value) in object {
                if key == "id" {
                    if let Some(id) = value.as_str() {
                        self.id = Some(id.to_string());
                    }
                } else {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Builds a request body from the current fields, restricted to the
    /// descriptor allowlist.
    #[must_use]
    pub fn body(&self, descriptor: &ResourceDescriptor) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.fields {
            if descriptor.allowed_fields().contains(key) {
                body.insert(key.clone(), value.clone());
            }
        }
        Value::Object(body)
    }

    /// Returns true if every named field is present.
    #[must_use]
    pub fn has_all<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        names.into_iter().all(|name| self.fields.contains_key(name))
    }

    /// Stages bodies for a bulk create.
    pub fn set_bulk_post_data(&mut self, bodies: Vec<Value>) {
        self.bulk_post_data = Some(bodies);
    }

    /// Returns the staged bulk-create bodies.
    #[must_use]
    pub fn bulk_post_data(&self) -> Option<&[Value]> {
        self.bulk_post_data.as_deref()
    }

    /// Removes and returns the staged bulk-create bodies.
    pub fn take_bulk_post_data(&mut self) -> Option<Vec<Value>> {
        self.bulk_post_data.take()
    }

    /// Stages target ids for a bulk delete.
    pub fn set_bulk_delete_data(&mut self, ids: Vec<String>) {
        self.bulk_delete_data = Some(ids);
    }

    /// Returns the staged bulk-delete ids.
    #[must_use]
    pub fn bulk_delete_data(&self) -> Option<&[String]> {
        self.bulk_delete_data.as_deref()
    }

    /// Removes and returns the staged bulk-delete ids.
    pub fn take_bulk_delete_data(&mut self) -> Option<Vec<String>> {
        self.bulk_delete_data.take()
    }
}
