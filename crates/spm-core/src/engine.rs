//! Generic resource lifecycle engine.
//!
//! One engine drives the full request/validate/transport/response-merge cycle
//! for every endpoint type, steered entirely by a [`ResourceDescriptor`].
//! Operations take an explicit [`EngineConfig`] per call; there are no
//! mutable mode flags on the engine itself.

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::descriptor::{Operation, ResourceDescriptor};
use crate::error::Result;
use crate::filter::{bulk_delete_query, FilterParams};
use crate::instance::ResourceInstance;
use crate::outcome::{Outcome, Skip};
use crate::transport::{Transport, Verb};
use crate::version::ServerVersion;

/// Default listing page size.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Per-invocation engine configuration.
///
/// Carried explicitly into every lifecycle call so that dry-run and the
/// version gate are plain data rather than engine state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    base_url: String,
    server_version: ServerVersion,
    dry_run: bool,
    page_limit: u32,
}

impl EngineConfig {
    /// Creates a configuration for the given manager base URL and reported
    /// server version.
    #[must_use]
    pub fn new(base_url: impl Into<String>, server_version: ServerVersion) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            server_version,
            dry_run: false,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Enables dry-run interception: requests are logged, never sent.
    #[must_use]
    pub const fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Overrides the listing page size. A limit of zero can never produce a
    /// short page and is clamped to one.
    #[must_use]
    pub const fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = if limit == 0 { 1 } else { limit };
        self
    }

    /// Returns the manager base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the manager's reported version.
    #[must_use]
    pub const fn server_version(&self) -> &ServerVersion {
        &self.server_version
    }

    /// Returns true when dry-run interception is active.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the listing page size.
    #[must_use]
    pub const fn page_limit(&self) -> u32 {
        self.page_limit
    }
}

/// How a GET addresses the endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector<'a> {
    /// Fetch one resource by server-side id.
    Id(&'a str),
    /// Resolve one resource by name through the listing; first occurrence in
    /// listing order wins.
    Name(&'a str),
    /// Server-side filtered listing.
    Filters(FilterParams),
    /// Full listing, paged through transparently.
    All,
}

enum Dispatch {
    DryRun,
    Response(Option<Value>),
    Failed(String),
}

/// Generic lifecycle engine bound to one descriptor and one instance.
pub struct RestEngine {
    descriptor: ResourceDescriptor,
    instance: ResourceInstance,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestEngine")
            .field("descriptor", &self.descriptor)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl RestEngine {
    /// Creates an engine for the descriptor, checking descriptor consistency.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the descriptor's required-field
    /// tables name fields outside its allowlist.
    pub fn new(descriptor: ResourceDescriptor, transport: Arc<dyn Transport>) -> Result<Self> {
        descriptor.validate()?;
        Ok(Self {
            descriptor,
            instance: ResourceInstance::new(),
            transport,
        })
    }

    /// Creates an engine with a pre-populated instance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the descriptor is inconsistent.
    pub fn with_instance(
        descriptor: ResourceDescriptor,
        instance: ResourceInstance,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        descriptor.validate()?;
        Ok(Self {
            descriptor,
            instance,
            transport,
        })
    }

    /// Returns the descriptor this engine drives.
    #[must_use]
    pub const fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Returns the bound instance.
    #[must_use]
    pub const fn instance(&self) -> &ResourceInstance {
        &self.instance
    }

    /// Returns the bound instance mutably.
    pub fn instance_mut(&mut self) -> &mut ResourceInstance {
        &mut self.instance
    }

    /// Merges caller-supplied fields through the descriptor allowlist.
    pub fn set_fields(&mut self, fields: serde_json::Map<String, Value>) {
        self.instance.set_fields(&self.descriptor, fields);
    }

    /// Resolves the endpoint URL from the template and the instance's parent
    /// ids.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first placeholder with no
    /// bound parent id.
    pub fn resolve_url(&self, config: &EngineConfig) -> Result<String> {
        let template = self.descriptor.url_template();
        let mut resolved = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            resolved.push_str(&rest[..open]);
            let tail = &rest[open + 1..];
            let close = tail.find('}').ok_or_else(|| {
                crate::error::Error::ConfigError(format!(
                    "descriptor `{}`: unterminated placeholder in `{template}`",
                    self.descriptor.type_name()
                ))
            })?;
            let placeholder = &tail[..close];
            let value = self.instance.parent_ids().get(placeholder).ok_or_else(|| {
                crate::error::Error::UnresolvedPlaceholder {
                    placeholder: placeholder.to_string(),
                    template: template.to_string(),
                }
            })?;
            resolved.push_str(value);
            rest = &tail[close + 1..];
        }
        resolved.push_str(rest);

        Ok(format!("{}{resolved}", config.base_url))
    }

    /// Fetches the resource or listing addressed by `selector`.
    ///
    /// The returned payload is the merged entry for id/name lookups (null
    /// when a name matched nothing) and a normalized `{items, paging}`
    /// document for listings. Callers should check the instance's `id`
    /// presence rather than rely on the payload alone.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`; runtime conditions are
    /// reported through [`Outcome::NotPerformed`].
    pub async fn get(&mut self, selector: Selector<'_>, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.version_gate(config) {
            return Ok(Outcome::NotPerformed(skip));
        }

        match selector {
            Selector::Id(id) => self.get_by_id(id, config).await,
            Selector::Name(name) => self.get_by_name(name, config).await,
            Selector::Filters(filters) => self.get_filtered(&filters, config).await,
            Selector::All => self.get_all(config).await,
        }
    }

    async fn get_by_id(&mut self, id: &str, config: &EngineConfig) -> Result<Outcome> {
        let url = format!("{}/{id}", self.resolve_url(config)?);
        match self.dispatch(Verb::Get, &url, None, config).await? {
            Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            Dispatch::Response(Some(response)) => {
                self.instance.merge_response(&response);
                Ok(Outcome::Performed(response))
            }
            Dispatch::Response(None) => {
                warn!(
                    resource = self.descriptor.type_name(),
                    id, "GET returned no body; instance left unchanged"
                );
                Ok(Outcome::NotPerformed(Skip::Transport(
                    "empty response body".to_string(),
                )))
            }
        }
    }

    async fn get_by_name(&mut self, name: &str, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.require_fields(Operation::Get) {
            return Ok(Outcome::NotPerformed(skip));
        }

        let filter = if self.descriptor.supports_name_filter() {
            let mut params = FilterParams::new();
            params.push("name", name);
            Some(params.encode())
        } else {
            None
        };

        match self.fetch_pages(filter.as_deref(), config).await? {
            PageFetch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            PageFetch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            PageFetch::Items(items) => {
                // First occurrence in listing order wins; duplicate names
                // upstream are not detected here.
                let matched = items
                    .into_iter()
                    .find(|item| item.get("name").and_then(Value::as_str) == Some(name));

                match matched {
                    Some(entry) => {
                        self.instance.merge_response(&entry);
                        Ok(Outcome::Performed(entry))
                    }
                    None => {
                        debug!(
                            resource = self.descriptor.type_name(),
                            name, "No listing entry matched; instance remains without an id"
                        );
                        Ok(Outcome::Performed(Value::Null))
                    }
                }
            }
        }
    }

    async fn get_filtered(
        &mut self,
        filters: &FilterParams,
        config: &EngineConfig,
    ) -> Result<Outcome> {
        if let Some(key) = filters.first_empty_value() {
            warn!(
                resource = self.descriptor.type_name(),
                filter = key,
                "Empty filter value; aborting GET before transport"
            );
            return Ok(Outcome::NotPerformed(Skip::Validation(format!(
                "empty value for filter `{key}`"
            ))));
        }
        if let Some(skip) = self.require_fields(Operation::Get) {
            return Ok(Outcome::NotPerformed(skip));
        }

        let encoded = filters.encode();
        match self.fetch_pages(Some(&encoded), config).await? {
            PageFetch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            PageFetch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            PageFetch::Items(items) => Ok(Outcome::Performed(listing_document(items))),
        }
    }

    async fn get_all(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.require_fields(Operation::Get) {
            return Ok(Outcome::NotPerformed(skip));
        }

        match self.fetch_pages(None, config).await? {
            PageFetch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            PageFetch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            PageFetch::Items(items) => Ok(Outcome::Performed(listing_document(items))),
        }
    }

    /// Creates the resource, or silently updates it when it already has an
    /// id. When bulk bodies are staged, every element is validated before any
    /// transport call and the whole batch is posted as one request.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn post(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.version_gate(config) {
            return Ok(Outcome::NotPerformed(skip));
        }

        if let Some(bodies) = self.instance.bulk_post_data() {
            if let Some(skip) = self.validate_bulk_bodies(bodies) {
                return Ok(Outcome::NotPerformed(skip));
            }

            let url = format!("{}?bulk=true", self.resolve_url(config)?);
            let payload = Value::Array(bodies.to_vec());
            return match self.dispatch(Verb::Post, &url, Some(&payload), config).await? {
                Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
                Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
                Dispatch::Response(Some(response)) => Ok(Outcome::Performed(response)),
                Dispatch::Response(None) => Ok(Outcome::NotPerformed(Skip::Transport(
                    "empty response body".to_string(),
                ))),
            };
        }

        if self.instance.key_value(self.descriptor.key_field()).is_some() {
            debug!(
                resource = self.descriptor.type_name(),
                "Instance already has an id; redirecting POST to PUT"
            );
            return self.put(config).await;
        }

        if let Some(skip) = self.require_fields(Operation::Post) {
            return Ok(Outcome::NotPerformed(skip));
        }

        let url = self.resolve_url(config)?;
        let body = self.instance.body(&self.descriptor);
        match self.dispatch(Verb::Post, &url, Some(&body), config).await? {
            Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            Dispatch::Response(Some(response)) => {
                self.instance.merge_response(&response);
                Ok(Outcome::Performed(response))
            }
            Dispatch::Response(None) => Ok(Outcome::NotPerformed(Skip::Transport(
                "empty response body".to_string(),
            ))),
        }
    }

    /// Updates the resource. Requires the descriptor's key field to be
    /// present on the instance.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn put(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.version_gate(config) {
            return Ok(Outcome::NotPerformed(skip));
        }

        let Some(key) = self
            .instance
            .key_value(self.descriptor.key_field())
            .map(ToString::to_string)
        else {
            warn!(
                resource = self.descriptor.type_name(),
                key_field = self.descriptor.key_field().wire_name(),
                "PUT requires a known id"
            );
            return Ok(Outcome::NotPerformed(Skip::Validation(format!(
                "PUT requires `{}` to be set",
                self.descriptor.key_field().wire_name()
            ))));
        };

        if let Some(skip) = self.require_fields(Operation::Put) {
            return Ok(Outcome::NotPerformed(skip));
        }

        let url = format!("{}/{key}", self.resolve_url(config)?);
        let body = self.instance.body(&self.descriptor);
        match self.dispatch(Verb::Put, &url, Some(&body), config).await? {
            Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            Dispatch::Response(Some(response)) => {
                self.instance.merge_response(&response);
                Ok(Outcome::Performed(response))
            }
            Dispatch::Response(None) => Ok(Outcome::NotPerformed(Skip::Transport(
                "empty response body".to_string(),
            ))),
        }
    }

    /// Deletes the resource by key field, or the staged bulk-delete ids in a
    /// single request. An empty response body is still a successful delete.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn delete(&mut self, config: &EngineConfig) -> Result<Outcome> {
        if let Some(skip) = self.version_gate(config) {
            return Ok(Outcome::NotPerformed(skip));
        }

        if let Some(ids) = self.instance.bulk_delete_data() {
            if let Some(bad) = ids.iter().find(|id| Uuid::parse_str(id).is_err()) {
                warn!(
                    resource = self.descriptor.type_name(),
                    id = %bad,
                    "Bulk delete id is not UUID-shaped; invalidating the whole batch"
                );
                return Ok(Outcome::NotPerformed(Skip::Validation(format!(
                    "bulk delete id `{bad}` is not a valid UUID"
                ))));
            }

            let url = format!("{}?{}", self.resolve_url(config)?, bulk_delete_query(ids));
            return match self.dispatch(Verb::Delete, &url, None, config).await? {
                Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
                Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
                Dispatch::Response(response) => {
                    Ok(Outcome::Performed(response.unwrap_or(Value::Null)))
                }
            };
        }

        let Some(key) = self
            .instance
            .key_value(self.descriptor.key_field())
            .map(ToString::to_string)
        else {
            warn!(
                resource = self.descriptor.type_name(),
                key_field = self.descriptor.key_field().wire_name(),
                "DELETE requires a known id"
            );
            return Ok(Outcome::NotPerformed(Skip::Validation(format!(
                "DELETE requires `{}` to be set",
                self.descriptor.key_field().wire_name()
            ))));
        };

        let url = format!("{}/{key}", self.resolve_url(config)?);
        match self.dispatch(Verb::Delete, &url, None, config).await? {
            Dispatch::DryRun => Ok(Outcome::NotPerformed(Skip::DryRun)),
            Dispatch::Failed(reason) => Ok(Outcome::NotPerformed(Skip::Transport(reason))),
            Dispatch::Response(Some(response)) => {
                self.instance.merge_response(&response);
                Ok(Outcome::Performed(response))
            }
            Dispatch::Response(None) => Ok(Outcome::Performed(Value::Null)),
        }
    }

    /// Validates bulk-create bodies element-wise against the POST
    /// requirements plus any bulk-specific additions the descriptor declares
    /// under [`Operation::BulkPost`]. One invalid element invalidates the
    /// whole batch.
    #[must_use]
    pub fn validate_bulk_bodies(&self, bodies: &[Value]) -> Option<Skip> {
        let required = self.descriptor.required_fields(Operation::Post);
        let bulk_required = self.descriptor.required_fields(Operation::BulkPost);
        for (index, body) in bodies.iter().enumerate() {
            let present = |field: &String| {
                body.as_object()
                    .is_some_and(|object| object.contains_key(field))
            };
            if let Some(missing) = required
                .iter()
                .chain(bulk_required)
                .find(|field| !present(field))
            {
                warn!(
                    resource = self.descriptor.type_name(),
                    index,
                    field = %missing,
                    "Bulk POST element missing required field; aborting the whole batch"
                );
                return Some(Skip::Validation(format!(
                    "bulk element {index} missing required field `{missing}`"
                )));
            }
        }
        None
    }

    fn version_gate(&self, config: &EngineConfig) -> Option<Skip> {
        let required = self.descriptor.min_version();
        if config.server_version().satisfies(required) {
            None
        } else {
            warn!(
                resource = self.descriptor.type_name(),
                required = %required,
                actual = %config.server_version(),
                "Operation refused: manager version below descriptor minimum"
            );
            Some(Skip::VersionGated {
                required: required.clone(),
                actual: config.server_version().clone(),
            })
        }
    }

    fn require_fields(&self, operation: Operation) -> Option<Skip> {
        let required = self.descriptor.required_fields(operation);
        let missing: Vec<&String> = required
            .iter()
            .filter(|field| !self.instance.has_field(field))
            .collect();
        if missing.is_empty() {
            return None;
        }
        let names = missing
            .iter()
            .map(|field| format!("`{field}`"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            resource = self.descriptor.type_name(),
            operation = %operation,
            missing = %names,
            "Missing required fields"
        );
        Some(Skip::Validation(format!(
            "{operation} missing required fields: {names}"
        )))
    }

    async fn dispatch(
        &self,
        verb: Verb,
        url: &str,
        body: Option<&Value>,
        config: &EngineConfig,
    ) -> Result<Dispatch> {
        if config.dry_run() {
            info!(
                resource = self.descriptor.type_name(),
                verb = %verb,
                url = %url,
                body = %body.map_or_else(|| "none".to_string(), |b| b.to_string()),
                "Dry run: request computed but not sent"
            );
            return Ok(Dispatch::DryRun);
        }

        match self
            .transport
            .send(verb, url.to_string(), body.cloned())
            .await
        {
            Ok(response) => Ok(Dispatch::Response(response)),
            Err(err) if err.is_config_error() => Err(err),
            Err(err) => {
                warn!(
                    resource = self.descriptor.type_name(),
                    verb = %verb,
                    url = %url,
                    error = %err,
                    "Transport call failed"
                );
                Ok(Dispatch::Failed(err.to_string()))
            }
        }
    }

    async fn fetch_pages(
        &self,
        filter: Option<&str>,
        config: &EngineConfig,
    ) -> Result<PageFetch> {
        let base = self.resolve_url(config)?;
        let limit = config.page_limit();
        let mut offset: u32 = 0;
        let mut collected: Vec<Value> = Vec::new();

        loop {
            let url = match filter {
                Some(encoded) => {
                    format!("{base}?filter={encoded}&limit={limit}&offset={offset}")
                }
                None => format!("{base}?limit={limit}&offset={offset}"),
            };

            match self.dispatch(Verb::Get, &url, None, config).await? {
                Dispatch::DryRun => return Ok(PageFetch::DryRun),
                Dispatch::Failed(reason) => return Ok(PageFetch::Failed(reason)),
                Dispatch::Response(response) => {
                    // Absence of `items` is normalized to an empty page.
                    let page: Vec<Value> = response
                        .as_ref()
                        .and_then(|value| value.get("items"))
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    let page_len = page.len();
                    collected.extend(page);

                    if page_len < limit as usize {
                        return Ok(PageFetch::Items(collected));
                    }
                    offset += limit;
                }
            }
        }
    }
}

enum PageFetch {
    DryRun,
    Failed(String),
    Items(Vec<Value>),
}

fn listing_document(items: Vec<Value>) -> Value {
    let count = items.len();
    json!({ "items": items, "paging": { "count": count } })
}
