//! Transport abstraction between the lifecycle engine and the wire.
//!
//! The engine never inspects HTTP status codes; it hands a verb, a fully
//! resolved URL, and an optional JSON body to a [`Transport`] and receives
//! either a structured response, `None` for an empty-but-successful response,
//! or an error the engine surfaces as a non-fatal transport skip.

use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// HTTP verb subset used by the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Fetch a resource or listing
    Get,
    /// Create a resource
    Post,
    /// Update a resource
    Put,
    /// Delete a resource
    Delete,
}

impl Verb {
    /// Returns the verb as an HTTP method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Wire collaborator contract.
///
/// Implementations own session handling and credentials. `Ok(None)` means the
/// manager answered without a usable body (e.g. an empty delete response);
/// errors are never retried by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the parsed JSON response, if any.
    async fn send(&self, verb: Verb, url: String, body: Option<Value>) -> Result<Option<Value>>;
}
