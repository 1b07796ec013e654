//! Lifecycle operation outcomes.
//!
//! Lifecycle calls distinguish hard errors from operations that ran but were
//! not performed. Callers must treat every lifecycle call as potentially
//! non-fatally skipped and inspect the returned [`Outcome`] (or the instance's
//! `id`) rather than relying on `Err` alone.

use serde_json::Value;
use std::fmt;

use crate::version::ServerVersion;

/// Result of a lifecycle operation that reached the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation was sent and the manager responded.
    Performed(Value),
    /// The operation was intercepted before any transport call, or the
    /// transport returned nothing usable.
    NotPerformed(Skip),
}

/// Reason an operation was not carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum Skip {
    /// Dry-run mode intercepted the request.
    DryRun,
    /// Client-side validation failed (missing required fields, empty filter
    /// value, malformed bulk id, invalid enum value).
    Validation(String),
    /// The managed server is older than the descriptor requires.
    VersionGated {
        /// Minimum version the descriptor declares
        required: ServerVersion,
        /// Version the manager reported
        actual: ServerVersion,
    },
    /// The transport returned an empty or failed response.
    Transport(String),
}

impl Outcome {
    /// Returns true if the operation reached the manager and got a response.
    #[must_use]
    pub const fn is_performed(&self) -> bool {
        matches!(self, Self::Performed(_))
    }

    /// Returns the response payload when the operation was performed.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Performed(value) => Some(value),
            Self::NotPerformed(_) => None,
        }
    }

    /// Consumes the outcome, returning the response payload if performed.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Performed(value) => Some(value),
            Self::NotPerformed(_) => None,
        }
    }

    /// Returns the skip reason when the operation was not performed.
    #[must_use]
    pub const fn skip(&self) -> Option<&Skip> {
        match self {
            Self::Performed(_) => None,
            Self::NotPerformed(skip) => Some(skip),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry run"),
            Self::Validation(reason) => write!(f, "validation failed: {reason}"),
            Self::VersionGated { required, actual } => {
                write!(f, "requires manager {required}, found {actual}")
            }
            Self::Transport(reason) => write!(f, "transport failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn performed_accessors() {
        let outcome = Outcome::Performed(json!({"id": "abc"}));
        assert!(outcome.is_performed());
        assert_eq!(outcome.value(), Some(&json!({"id": "abc"})));
        assert!(outcome.skip().is_none());
        assert_eq!(outcome.into_value(), Some(json!({"id": "abc"})));
    }

    #[test]
    fn not_performed_accessors() {
        let outcome = Outcome::NotPerformed(Skip::DryRun);
        assert!(!outcome.is_performed());
        assert!(outcome.value().is_none());
        assert_eq!(outcome.skip(), Some(&Skip::DryRun));
        assert!(outcome.into_value().is_none());
    }

    #[test]
    fn skip_display() {
        assert_eq!(Skip::DryRun.to_string(), "dry run");
        assert_eq!(
            Skip::Validation("missing `name`".to_string()).to_string(),
            "validation failed: missing `name`"
        );
        let gated = Skip::VersionGated {
            required: ServerVersion::parse("7.0").unwrap(),
            actual: ServerVersion::parse("6.1").unwrap(),
        };
        assert_eq!(gated.to_string(), "requires manager 7.0, found 6.1");
    }
}
