//! Bulk operation chunking and sequencing.
//!
//! Splits large create/delete batches into provider-size-limited chunks and
//! drives them through the engine's bulk POST/DELETE primitives, one chunk
//! per round-trip, never in parallel.

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::{EngineConfig, RestEngine};
use crate::error::Result;
use crate::outcome::{Outcome, Skip};

/// Default maximum items per chunk.
pub const DEFAULT_MAX_ITEMS_PER_CHUNK: usize = 1000;

/// Default advisory maximum serialized bytes per chunk.
pub const DEFAULT_MAX_BYTES_PER_CHUNK: usize = 2_000_000;

/// Size limits for bulk chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkConfig {
    max_items_per_chunk: usize,
    max_bytes_per_chunk: usize,
}

impl BulkConfig {
    /// Creates a configuration with the documented provider defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_items_per_chunk: DEFAULT_MAX_ITEMS_PER_CHUNK,
            max_bytes_per_chunk: DEFAULT_MAX_BYTES_PER_CHUNK,
        }
    }

    /// Overrides the item limit per chunk.
    ///
    /// # Panics
    ///
    /// Panics if `max` is zero.
    #[must_use]
    pub fn with_max_items(mut self, max: usize) -> Self {
        assert!(max > 0, "chunk item limit must be positive");
        self.max_items_per_chunk = max;
        self
    }

    /// Overrides the advisory byte limit per chunk.
    #[must_use]
    pub const fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes_per_chunk = max;
        self
    }

    /// Returns the item limit per chunk.
    #[must_use]
    pub const fn max_items_per_chunk(&self) -> usize {
        self.max_items_per_chunk
    }

    /// Returns the advisory byte limit per chunk.
    #[must_use]
    pub const fn max_bytes_per_chunk(&self) -> usize {
        self.max_bytes_per_chunk
    }

    /// Returns the number of chunks `n` items will produce.
    #[must_use]
    pub const fn chunk_count(&self, n: usize) -> usize {
        n.div_ceil(self.max_items_per_chunk)
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a chunked bulk run.
///
/// One failed chunk does not roll back or halt the rest of the batch, so a
/// report can be partially successful; check [`BulkReport::is_complete`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    created_ids: Vec<String>,
    chunks_planned: usize,
    failed_chunks: Vec<usize>,
}

impl BulkReport {
    /// Builds the report for a batch rejected before any chunk was sent:
    /// every planned chunk is marked failed.
    #[must_use]
    pub fn rejected(chunks_planned: usize) -> Self {
        Self {
            created_ids: Vec::new(),
            chunks_planned,
            failed_chunks: (0..chunks_planned).collect(),
        }
    }

    /// Ids of created resources, accumulated in chunk order.
    #[must_use]
    pub fn created_ids(&self) -> &[String] {
        &self.created_ids
    }

    /// Number of chunks the input was partitioned into.
    #[must_use]
    pub const fn chunks_planned(&self) -> usize {
        self.chunks_planned
    }

    /// Indexes of chunks that did not perform.
    #[must_use]
    pub fn failed_chunks(&self) -> &[usize] {
        &self.failed_chunks
    }

    /// Returns true when every chunk performed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}

/// Drives size-bounded bulk operations through a [`RestEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkCoordinator {
    config: BulkConfig,
}

impl BulkCoordinator {
    /// Creates a coordinator with the given size limits.
    #[must_use]
    pub const fn new(config: BulkConfig) -> Self {
        Self { config }
    }

    /// Returns the configured size limits.
    #[must_use]
    pub const fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Creates many resources, one engine POST per chunk, preserving input
    /// order. The whole batch is validated element-wise before the first
    /// round-trip; after that, a failed chunk is logged and the remaining
    /// chunks still run.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn post(
        &self,
        engine: &mut RestEngine,
        bodies: Vec<Value>,
        engine_config: &EngineConfig,
    ) -> Result<BulkReport> {
        let mut report = BulkReport {
            chunks_planned: self.config.chunk_count(bodies.len()),
            ..BulkReport::default()
        };

        // Element validation covers the entire batch up front so that an
        // invalid element never follows an already-submitted chunk.
        if let Some(skip) = engine.validate_bulk_bodies(&bodies) {
            debug!(reason = %skip, "Bulk POST aborted before any chunk was sent");
            return Ok(BulkReport::rejected(report.chunks_planned));
        }

        for (index, chunk) in bodies.chunks(self.config.max_items_per_chunk).enumerate() {
            self.check_chunk_size(index, chunk);
            engine.instance_mut().set_bulk_post_data(chunk.to_vec());
            let outcome = engine.post(engine_config).await?;
            engine.instance_mut().take_bulk_post_data();

            match outcome {
                Outcome::Performed(response) => {
                    collect_created_ids(&response, &mut report.created_ids);
                }
                Outcome::NotPerformed(skip) => {
                    record_chunk_failure(index, &skip, &mut report);
                }
            }
        }

        Ok(report)
    }

    /// Deletes many resources by id, one engine DELETE per chunk.
    ///
    /// # Errors
    ///
    /// Only configuration mistakes produce `Err`.
    pub async fn delete(
        &self,
        engine: &mut RestEngine,
        ids: Vec<String>,
        engine_config: &EngineConfig,
    ) -> Result<BulkReport> {
        let mut report = BulkReport {
            chunks_planned: self.config.chunk_count(ids.len()),
            ..BulkReport::default()
        };

        // The whole batch is checked up front so that a malformed id in a
        // later chunk never follows an already-deleted chunk.
        if let Some(bad) = ids.iter().find(|id| Uuid::parse_str(id).is_err()) {
            warn!(
                id = %bad,
                "Bulk delete id is not UUID-shaped; rejecting the batch before any chunk"
            );
            return Ok(BulkReport::rejected(report.chunks_planned));
        }

        for (index, chunk) in ids.chunks(self.config.max_items_per_chunk).enumerate() {
            engine.instance_mut().set_bulk_delete_data(chunk.to_vec());
            let outcome = engine.delete(engine_config).await?;
            engine.instance_mut().take_bulk_delete_data();

            match outcome {
                Outcome::Performed(_) => {}
                Outcome::NotPerformed(skip) => {
                    record_chunk_failure(index, &skip, &mut report);
                }
            }
        }

        Ok(report)
    }

    fn check_chunk_size(&self, index: usize, chunk: &[Value]) {
        // Advisory only: an oversized chunk is still submitted.
        let estimated = serde_json::to_vec(chunk).map(|bytes| bytes.len()).unwrap_or(0);
        if estimated > self.config.max_bytes_per_chunk {
            warn!(
                chunk = index,
                estimated_bytes = estimated,
                limit = self.config.max_bytes_per_chunk,
                "Chunk exceeds the byte limit; submitting anyway"
            );
        }
    }
}

fn collect_created_ids(response: &Value, into: &mut Vec<String>) {
    if let Some(items) = response.get("items").and_then(Value::as_array) {
        for item in items {
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                into.push(id.to_string());
            }
        }
    }
}

fn record_chunk_failure(index: usize, skip: &Skip, report: &mut BulkReport) {
    warn!(
        chunk = index,
        reason = %skip,
        "Bulk chunk did not perform; continuing with the remaining chunks"
    );
    report.failed_chunks.push(index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Operation, ResourceDescriptor};
    use crate::instance::ResourceInstance;
    use crate::transport::{MockTransport, Verb};
    use crate::version::ServerVersion;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "Host",
            "/api/policy/v1/domain/{domainId}/object/hosts",
            ServerVersion::parse("6.1.0").unwrap(),
        )
        .with_allowed_fields(["name", "value"])
        .with_required_fields(Operation::Post, ["name", "value"])
    }

    fn engine(transport: MockTransport) -> RestEngine {
        let instance = ResourceInstance::new().with_parent_id("domainId", "global");
        RestEngine::with_instance(descriptor(), instance, Arc::new(transport)).unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig::new(
            "https://mgr.example.com",
            ServerVersion::parse("7.2.0").unwrap(),
        )
    }

    fn bodies(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"name": format!("h-{i}"), "value": format!("10.0.0.{i}")}))
            .collect()
    }

    #[test]
    fn chunk_count_law() {
        let config = BulkConfig::new().with_max_items(100);
        assert_eq!(config.chunk_count(0), 0);
        assert_eq!(config.chunk_count(1), 1);
        assert_eq!(config.chunk_count(100), 1);
        assert_eq!(config.chunk_count(101), 2);
        assert_eq!(config.chunk_count(250), 3);
    }

    #[tokio::test]
    async fn post_partitions_in_order() {
        let mut transport = MockTransport::new();
        let mut call = 0_usize;
        transport
            .expect_send()
            .times(3)
            .returning(move |verb, url, body| {
                assert_eq!(verb, Verb::Post);
                assert!(url.ends_with("?bulk=true"));
                let chunk = body.unwrap();
                let first = chunk[0]["name"].as_str().unwrap().to_string();
                // Chunks must arrive in original order.
                assert_eq!(first, format!("h-{}", call * 2));
                call += 1;
                let ids: Vec<Value> = chunk
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|item| json!({"id": format!("id-{}", item["name"].as_str().unwrap())}))
                    .collect();
                Ok(Some(json!({"items": ids})))
            });

        let coordinator = BulkCoordinator::new(BulkConfig::new().with_max_items(2));
        let mut engine = engine(transport);
        let report = coordinator
            .post(&mut engine, bodies(5), &config())
            .await
            .unwrap();

        assert_eq!(report.chunks_planned(), 3);
        assert!(report.is_complete());
        assert_eq!(report.created_ids().len(), 5);
        assert_eq!(report.created_ids()[0], "id-h-0");
        assert_eq!(report.created_ids()[4], "id-h-4");
    }

    #[tokio::test]
    async fn post_invalid_element_aborts_before_any_transport() {
        let mut input = bodies(3);
        input.push(json!({"name": "incomplete"}));

        let coordinator = BulkCoordinator::new(BulkConfig::new().with_max_items(2));
        // No expectations: any transport call panics.
        let mut engine = engine(MockTransport::new());
        let report = coordinator
            .post(&mut engine, input, &config())
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed_chunks(), &[0, 1]);
        assert!(report.created_ids().is_empty());
    }

    #[tokio::test]
    async fn post_failed_chunk_does_not_halt_batch() {
        let mut transport = MockTransport::new();
        let mut call = 0_usize;
        transport
            .expect_send()
            .times(3)
            .returning(move |_, _, body| {
                call += 1;
                if call == 2 {
                    return Err(crate::error::Error::ServiceUnavailable(
                        "mid-batch outage".to_string(),
                    ));
                }
                let ids: Vec<Value> = body
                    .unwrap()
                    .as_array()
                    .unwrap()
                    .iter()
                    .enumerate()
                    .map(|(i, _)| json!({"id": format!("c{call}-{i}")}))
                    .collect();
                Ok(Some(json!({"items": ids})))
            });

        let coordinator = BulkCoordinator::new(BulkConfig::new().with_max_items(2));
        let mut engine = engine(transport);
        let report = coordinator
            .post(&mut engine, bodies(6), &config())
            .await
            .unwrap();

        assert_eq!(report.chunks_planned(), 3);
        assert_eq!(report.failed_chunks(), &[1]);
        // Chunks 0 and 2 still produced ids.
        assert_eq!(report.created_ids().len(), 4);
    }

    #[tokio::test]
    async fn delete_renders_ids_filter_per_chunk() {
        let ids: Vec<String> = (0..3).map(|_| Uuid::new_v4().to_string()).collect();
        let first = ids[0].clone();
        let last = ids[2].clone();

        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(move |verb, url, _| {
                *verb == Verb::Delete
                    && url.contains(&format!("filter=ids:{first}"))
                    && url.ends_with("&bulk=true")
            })
            .returning(|_, _, _| Ok(None));
        transport
            .expect_send()
            .withf(move |verb, url, _| {
                *verb == Verb::Delete && url.contains(&format!("filter=ids:{last}"))
            })
            .returning(|_, _, _| Ok(None));

        let coordinator = BulkCoordinator::new(BulkConfig::new().with_max_items(2));
        let mut engine = engine(transport);
        let report = coordinator.delete(&mut engine, ids, &config()).await.unwrap();

        assert_eq!(report.chunks_planned(), 2);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn delete_malformed_id_rejects_batch_before_any_transport() {
        let ids = vec![Uuid::new_v4().to_string(), "not-a-uuid".to_string()];

        let coordinator = BulkCoordinator::new(BulkConfig::new().with_max_items(1));
        // No expectations: any transport call panics. The valid first chunk
        // must not be deleted when a later id is malformed.
        let mut engine = engine(MockTransport::new());
        let report = coordinator.delete(&mut engine, ids, &config()).await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed_chunks(), &[0, 1]);
    }

    #[tokio::test]
    async fn oversized_chunk_is_still_submitted() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _| Ok(Some(json!({"items": [{"id": "a"}]}))));

        let coordinator =
            BulkCoordinator::new(BulkConfig::new().with_max_items(10).with_max_bytes(8));
        let mut engine = engine(transport);
        let report = coordinator
            .post(&mut engine, bodies(1), &config())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.created_ids(), &["a".to_string()]);
    }
}
