use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

/// Key/value store abstraction for disposable read models.
pub trait KeyStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn upsert(&self, key: K, value: V);
    fn list(&self) -> Vec<V>;
    /// Clear all records (rebuild support).
    fn clear(&self);
}

impl<K, V, S> KeyStore<K, V> for Arc<S>
where
    S: KeyStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn upsert(&self, key: K, value: V) {
        (**self).upsert(key, value)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory store behind a `RwLock`.
///
/// The write lock doubles as the serialization point for read-modify-write
/// sequences: `update` runs its closure while holding the lock, so two
/// callers can never interleave on the same record.
#[derive(Debug)]
pub struct InMemoryStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    pub fn upsert(&self, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key, value);
        }
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(key);
        }
    }

    pub fn list(&self) -> Vec<V> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    /// Fetch the record for `key`, inserting a fresh one first if absent.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        match self.inner.write() {
            Ok(mut map) => map.entry(key).or_insert_with(make).clone(),
            Err(_) => make(),
        }
    }

    /// Run `f` against the stored record under the write lock.
    ///
    /// Returns `None` when the key is absent. The closure's result is
    /// passed through, so fallible domain operations keep their error.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut map = self.inner.write().ok()?;
        map.get_mut(key).map(f)
    }
}

impl<K, V> KeyStore<K, V> for InMemoryStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        InMemoryStore::get(self, key)
    }

    fn upsert(&self, key: K, value: V) {
        InMemoryStore::upsert(self, key, value)
    }

    fn list(&self) -> Vec<V> {
        InMemoryStore::list(self)
    }

    fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}
