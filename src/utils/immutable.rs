use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A read-only ordered map that is cheap to clone.
///
/// There is no mutating API. [`ImmutableMap::union`] builds a new map and
/// leaves the receiver untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct ImmutableMap<K: Ord, V> {
    inner: Arc<BTreeMap<K, V>>,
}

impl<K: Ord, V> ImmutableMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BTreeMap::new()),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, K, V> {
        self.inner.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }
}

impl<K: Ord + Clone, V: Clone> ImmutableMap<K, V> {
    /// Returns a map holding the entries of both maps. Entries of `other`
    /// win on key conflicts.
    pub fn union<I>(&self, other: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut merged = (*self.inner).clone();
        merged.extend(other);
        Self {
            inner: Arc::new(merged),
        }
    }
}

impl<K: Ord, V> Default for ImmutableMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for ImmutableMap<K, V> {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for ImmutableMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a ImmutableMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for ImmutableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImmutableMap(")?;
        f.debug_map().entries(self.inner.iter()).finish()?;
        write!(f, ")")
    }
}
