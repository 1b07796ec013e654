//! Filter query construction for listing and bulk-delete requests.
//!
//! The manager's filter grammar is `key:value` pairs with the colon
//! percent-encoded and a trailing semicolon per pair, concatenated into a
//! single `filter=` query parameter.

use std::fmt::Display;

/// Ordered builder for filter key/value pairs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterParams {
    pairs: Vec<(String, String)>,
}

impl FilterParams {
    /// Creates a new, empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Appends a key/value pair.
    pub fn push<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Display,
    {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Appends a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: impl Into<String>, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Returns true if no pairs have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the key of the first pair with an empty value, if any.
    ///
    /// An empty filter value must abort the call client-side before any
    /// transport work.
    #[must_use]
    pub fn first_empty_value(&self) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(_, value)| value.is_empty())
            .map(|(key, _)| key.as_str())
    }

    /// Encodes the pairs as `key%3Avalue;` concatenated.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut encoded = String::new();
        for (key, value) in &self.pairs {
            encoded.push_str(key);
            encoded.push_str("%3A");
            encoded.push_str(value);
            encoded.push(';');
        }
        encoded
    }

    /// Returns the collected pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl<K, V> FromIterator<(K, V)> for FilterParams
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

/// Renders the query string for a bulk delete: the target ids comma-joined
/// into an `ids:` filter with the bulk marker appended.
#[must_use]
pub fn bulk_delete_query(ids: &[String]) -> String {
    format!("filter=ids:{}&bulk=true", ids.join(","))
}
