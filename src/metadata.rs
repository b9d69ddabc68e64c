//! Layered metadata.
//!
//! A [`Metadata`] is a chain of scopes. Each scope is an immutable-once-shared
//! map of overrides with a pointer to its parent:
//!
//! ```text
//! clone overrides   { title: "Page 2" }
//!       │
//! front matter      { title: "Posts", layout: "list" }
//!       │
//! global settings   { site: "Example", title: "Home" }
//! ```
//!
//! Lookup walks from the innermost scope outward and stops at the first hit,
//! so a child shadows a parent without touching it. Scopes are shared through
//! `Arc`, and writes go through `Arc::make_mut`: setting a key on one
//! `Metadata` copies its innermost scope if anyone else still holds it, which
//! keeps every other chain that shares the scope unchanged.
//!
//! Documents lock their metadata. A locked instance rejects writes with
//! [`MetadataError::Locked`] while reads keep working.

use crate::value::{ConversionError, FromValue, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("metadata key not found: {0}")]
    NotFound(String),
    #[error("metadata key '{key}': {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },
    #[error("metadata is locked, cannot set '{0}'")]
    Locked(String),
}

#[derive(Debug, Clone, Default)]
struct Scope {
    values: BTreeMap<String, Value>,
    parent: Option<Arc<Scope>>,
}

/// A chain of metadata scopes with shadowing lookup.
#[derive(Clone, Default)]
pub struct Metadata {
    scope: Arc<Scope>,
    locked: bool,
}

impl Metadata {
    /// An empty, unlocked chain with a single scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-scope chain holding `pairs`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            scope: Arc::new(Scope {
                values: collect_pairs(pairs),
                parent: None,
            }),
            locked: false,
        }
    }

    /// Layer `overrides` on top of this chain.
    ///
    /// The returned instance is unlocked and shares every existing scope with
    /// `self`; nothing in `self` is copied or modified.
    pub fn child<I, K, V>(&self, overrides: I) -> Metadata
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Metadata {
            scope: Arc::new(Scope {
                values: collect_pairs(overrides),
                parent: Some(Arc::clone(&self.scope)),
            }),
            locked: false,
        }
    }

    /// Look up `key`, innermost scope first.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scopes().find_map(|scope| scope.values.get(key))
    }

    /// Like [`get`](Self::get), but a miss is a [`MetadataError::NotFound`].
    pub fn try_get(&self, key: &str) -> Result<&Value, MetadataError> {
        self.get(key)
            .ok_or_else(|| MetadataError::NotFound(key.to_string()))
    }

    /// Look up `key` and convert it to `T`.
    ///
    /// A missing key and a failed conversion are reported as different
    /// errors so callers can pick a fallback for one and fail on the other.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T, MetadataError> {
        let value = self.try_get(key)?;
        T::from_value(value).map_err(|source| MetadataError::Conversion {
            key: key.to_string(),
            source,
        })
    }

    /// Typed lookup that falls back to `default` on a miss or a failed conversion.
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Shorthand for a string-typed lookup.
    pub fn string(&self, key: &str) -> Option<String> {
        self.get_as(key).ok()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` in the innermost scope.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), MetadataError> {
        let key = key.into();
        if self.locked {
            return Err(MetadataError::Locked(key));
        }
        Arc::make_mut(&mut self.scope)
            .values
            .insert(key, value.into());
        Ok(())
    }

    /// Mark this instance read-only. Other instances sharing its scopes are unaffected.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Consuming form of [`lock`](Self::lock).
    pub fn locked(mut self) -> Self {
        self.lock();
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Every visible (non-shadowed) pair, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let mut visible: BTreeMap<&str, &Value> = BTreeMap::new();
        for scope in self.scopes() {
            for (key, value) in &scope.values {
                visible.entry(key.as_str()).or_insert(value);
            }
        }
        visible.into_iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn values(&self) -> Vec<&Value> {
        self.iter().map(|(_, v)| v).collect()
    }

    /// Number of visible keys.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes().all(|scope| scope.values.is_empty())
    }

    /// Number of scopes in the chain.
    pub fn depth(&self) -> usize {
        self.scopes().count()
    }

    /// Whether both instances start from the very same innermost scope.
    pub fn shares_chain(&self, other: &Metadata) -> bool {
        Arc::ptr_eq(&self.scope, &other.scope)
    }

    fn scopes(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self.scope.as_ref()), |scope| scope.parent.as_deref())
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> Metadata {
        Metadata::from_pairs([("site", "Example"), ("title", "Home")])
    }

    // =========================================================================
    // Chain lookup and shadowing
    // =========================================================================

    #[test]
    fn child_sees_ancestor_keys() {
        let child = global().child([("layout", "post")]);
        assert_eq!(child.get("site"), Some(&Value::from("Example")));
        assert_eq!(child.get("layout"), Some(&Value::from("post")));
    }

    #[test]
    fn child_shadows_without_mutating_parent() {
        let parent = global();
        let child = parent.child([("title", "About")]);

        assert_eq!(child.string("title").as_deref(), Some("About"));
        assert_eq!(parent.string("title").as_deref(), Some("Home"));
    }

    #[test]
    fn set_on_child_leaves_parent_untouched() {
        let parent = global();
        let mut child = parent.child(Vec::<(String, Value)>::new());
        child.set("site", "Other").unwrap();

        assert_eq!(child.string("site").as_deref(), Some("Other"));
        assert_eq!(parent.string("site").as_deref(), Some("Example"));
    }

    #[test]
    fn set_on_shared_scope_copies_on_write() {
        let original = global();
        let mut copy = original.clone();
        copy.set("title", "Changed").unwrap();

        assert_eq!(original.string("title").as_deref(), Some("Home"));
        assert_eq!(copy.string("title").as_deref(), Some("Changed"));
    }

    #[test]
    fn iteration_lists_visible_pairs_once() {
        let child = global().child([("title", "About"), ("extra", "x")]);
        let pairs: Vec<(&str, String)> = child.iter().map(|(k, v)| (k, v.to_string())).collect();
        assert_eq!(
            pairs,
            vec![
                ("extra", "x".to_string()),
                ("site", "Example".to_string()),
                ("title", "About".to_string()),
            ]
        );
        assert_eq!(child.len(), 3);
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn child_keys_are_superset_of_parent_keys() {
        let parent = global();
        let child = parent.child([("extra", 1)]);
        for key in parent.keys() {
            assert!(child.contains_key(key));
        }
        assert!(child.contains_key("extra"));
        assert!(!parent.contains_key("extra"));
    }

    // =========================================================================
    // Locking
    // =========================================================================

    #[test]
    fn locked_metadata_rejects_writes() {
        let mut meta = global().locked();
        let err = meta.set("title", "Nope").unwrap_err();
        assert_eq!(err, MetadataError::Locked("title".to_string()));
        assert_eq!(meta.string("title").as_deref(), Some("Home"));
    }

    #[test]
    fn child_of_locked_metadata_is_writable() {
        let locked = global().locked();
        let mut child = locked.child([("a", 1)]);
        assert!(child.set("b", 2).is_ok());
        assert!(locked.is_locked());
        assert!(!child.is_locked());
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    #[test]
    fn missing_key_and_bad_conversion_are_distinct() {
        let meta = Metadata::from_pairs([("count", "many")]);

        assert!(matches!(
            meta.get_as::<i64>("absent"),
            Err(MetadataError::NotFound(_))
        ));
        assert!(matches!(
            meta.get_as::<i64>("count"),
            Err(MetadataError::Conversion { .. })
        ));
    }

    #[test]
    fn get_as_converts_strings() {
        let meta = Metadata::from_pairs([("count", "12")]);
        assert_eq!(meta.get_as::<u32>("count"), Ok(12));
        assert_eq!(meta.get_or("absent", 5u32), 5);
    }

    #[test]
    fn missing_key_is_not_found_rather_than_a_panic() {
        let meta = global();
        assert_eq!(meta.get("missing"), None);
        assert_eq!(
            meta.try_get("missing"),
            Err(MetadataError::NotFound("missing".into()))
        );
    }
}
