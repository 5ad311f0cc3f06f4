//! Key/value model for SQL comments.

use std::collections::btree_map::{self, BTreeMap};

/// Name of a single comment entry, before escaping.
pub type CommentKey = String;

/// Value of a single comment entry, before escaping.
pub type CommentValue = String;

/// Well-known comment keys.
///
/// These follow the names used by other sqlcommenter implementations so that
/// database-side tooling can pick them up without extra configuration.
pub mod keys {
    /// Name of the application issuing the query.
    pub const APPLICATION: &str = "application";
    /// Web or RPC framework serving the request.
    pub const FRAMEWORK: &str = "framework";
    /// Route or operation name of the originating request.
    pub const ROUTE: &str = "route";
    /// Controller handling the request.
    pub const CONTROLLER: &str = "controller";
    /// Action within the controller.
    pub const ACTION: &str = "action";
    /// Name and version of the database driver layer.
    pub const DB_DRIVER: &str = "db_driver";
    /// W3C trace context parent header.
    pub const TRACEPARENT: &str = "traceparent";
    /// W3C trace context vendor state header.
    pub const TRACESTATE: &str = "tracestate";
}

/// A set of comment key/value pairs.
///
/// Keys are unique: inserting an existing key replaces its value. Iteration is
/// always in byte-wise key order, so the insertion order of a provider never
/// leaks into the encoded comment.
///
/// ```rust
/// use sea_orm_sqlcommenter::SqlComments;
///
/// let comments = SqlComments::from([("b", "2"), ("a", "1")]);
/// let keys: Vec<_> = comments.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, ["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlComments {
    entries: BTreeMap<CommentKey, CommentValue>,
}

impl SqlComments {
    /// Create an empty set of comments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key/value pair, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<CommentKey>,
        value: impl Into<CommentValue>,
    ) -> Option<CommentValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style variant of [`SqlComments::insert`].
    pub fn with(mut self, key: impl Into<CommentKey>, value: impl Into<CommentValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<CommentValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every entry of `other` into `self`.
    ///
    /// Entries of `other` win on key collision.
    pub fn merge(&mut self, other: SqlComments) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }
}

impl<K, V> FromIterator<(K, V)> for SqlComments
where
    K: Into<CommentKey>,
    V: Into<CommentValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut comments = SqlComments::new();
        comments.extend(iter);
        comments
    }
}

impl<K, V> Extend<(K, V)> for SqlComments
where
    K: Into<CommentKey>,
    V: Into<CommentValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for SqlComments
where
    K: Into<CommentKey>,
    V: Into<CommentValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for SqlComments {
    type Item = (CommentKey, CommentValue);
    type IntoIter = btree_map::IntoIter<CommentKey, CommentValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_insert_wins() {
        let mut comments = SqlComments::new();
        comments.insert("route", "/a");
        let previous = comments.insert("route", "/b");

        assert_eq!(previous.as_deref(), Some("/a"));
        assert_eq!(comments.get("route"), Some("/b"));
        assert_eq!(comments.len(), 1);
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let comments: SqlComments = vec![("zeta", "1"), ("alpha", "2"), ("Mid", "3")]
            .into_iter()
            .collect();

        let keys: Vec<_> = comments.iter().map(|(k, _)| k).collect();
        // byte-wise: upper case sorts before lower case
        assert_eq!(keys, ["Mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = SqlComments::from([(keys::APPLICATION, "api"), (keys::ROUTE, "/old")]);
        base.merge(SqlComments::from([(keys::ROUTE, "/new")]));

        assert_eq!(base.get(keys::APPLICATION), Some("api"));
        assert_eq!(base.get(keys::ROUTE), Some("/new"));
    }

    #[test]
    fn test_builder_and_remove() {
        let mut comments = SqlComments::new()
            .with(keys::FRAMEWORK, "axum")
            .with(keys::ACTION, "list");

        assert!(comments.contains_key(keys::ACTION));
        assert_eq!(comments.remove(keys::ACTION).as_deref(), Some("list"));
        assert!(!comments.contains_key(keys::ACTION));
        assert!(!comments.is_empty());
    }
}
