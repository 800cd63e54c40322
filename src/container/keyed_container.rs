use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::ops::Deref;
use std::ops::DerefMut;

use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;

/// A string-keyed map guarded by a single reader/writer lock.
///
/// Point operations take the lock for the duration of one call. Multi-key
/// work goes through an extended guard, which keeps the lock held until the
/// guard is dropped or released:
///
/// - [`acquire_extended`](Self::acquire_extended) holds the lock in shared
///   mode and only hands out `&HashMap`, so concurrent holders can coexist
///   but cannot mutate.
/// - [`acquire_extended_mut`](Self::acquire_extended_mut) holds it
///   exclusively and hands out `&mut HashMap` for batch mutation.
///
/// Guards borrow the container, so the backing map cannot escape past
/// release.
pub struct KeyedContainer<V> {
    map: RwLock<HashMap<String, V>>,
}

/// Shared extended access. Releases the lock on drop.
pub struct ExtendedGuard<'a, V> {
    inner: RwLockReadGuard<'a, HashMap<String, V>>,
}

/// Exclusive extended access. Releases the lock on drop.
pub struct ExtendedGuardMut<'a, V> {
    inner: RwLockWriteGuard<'a, HashMap<String, V>>,
}

impl<V> KeyedContainer<V> {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Pre-seed the container. The given map is moved in, not shared.
    pub fn from_map(initial: HashMap<String, V>) -> Self {
        Self {
            map: RwLock::new(initial),
        }
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.map.read().contains_key(key)
    }

    /// Store `value` under `key`, returning whatever was stored before.
    pub fn put(
        &self,
        key: impl Into<String>,
        value: V,
    ) -> Option<V> {
        self.map.write().insert(key.into(), value)
    }

    /// Remove `key`, returning the removed value. Missing keys are a no-op.
    pub fn delete(
        &self,
        key: &str,
    ) -> Option<V> {
        self.map.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Snapshot of the current keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let guard = self.acquire_extended();
        guard.keys().cloned().collect()
    }

    /// Swap in a fresh empty map.
    pub fn clear(&self) {
        *self.map.write() = HashMap::new();
    }

    pub fn acquire_extended(&self) -> ExtendedGuard<'_, V> {
        ExtendedGuard {
            inner: self.map.read(),
        }
    }

    pub fn acquire_extended_mut(&self) -> ExtendedGuardMut<'_, V> {
        ExtendedGuardMut {
            inner: self.map.write(),
        }
    }

    /// Run `f` against the backing map while holding the shared lock.
    pub fn with_extended<R>(
        &self,
        f: impl FnOnce(&HashMap<String, V>) -> R,
    ) -> R {
        let guard = self.acquire_extended();
        f(&guard)
    }

    /// Run `f` against the backing map while holding the exclusive lock.
    ///
    /// The lock is released when `f` returns or unwinds.
    pub fn with_extended_mut<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, V>) -> R,
    ) -> R {
        let mut guard = self.acquire_extended_mut();
        f(&mut guard)
    }
}

impl<V: Clone> KeyedContainer<V> {
    /// Clone of the value under `key`, `None` if absent.
    pub fn get(
        &self,
        key: &str,
    ) -> Option<V> {
        self.map.read().get(key).cloned()
    }

    /// Independent copy of the whole map.
    pub fn copy(&self) -> HashMap<String, V> {
        self.map.read().clone()
    }
}

impl<V: fmt::Debug> KeyedContainer<V> {
    /// Human readable listing, one `(key: k, value: v)` line per entry.
    pub fn dump(&self) -> String {
        let map = self.map.read();
        let mut out = String::new();
        for (k, v) in map.iter() {
            // Writing into a String cannot fail
            let _ = writeln!(out, "(key: {}, value: {:?})", k, v);
        }
        out
    }
}

impl<V> Default for KeyedContainer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for KeyedContainer<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<V: fmt::Debug> fmt::Debug for KeyedContainer<V> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("KeyedContainer")
            .field("map", &*self.map.read())
            .finish()
    }
}

impl<V> ExtendedGuard<'_, V> {
    /// Explicit release; equivalent to dropping the guard.
    pub fn release(self) {}
}

impl<V> Deref for ExtendedGuard<'_, V> {
    type Target = HashMap<String, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<V> ExtendedGuardMut<'_, V> {
    /// Explicit release; equivalent to dropping the guard.
    pub fn release(self) {}
}

impl<V> Deref for ExtendedGuardMut<'_, V> {
    type Target = HashMap<String, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<V> DerefMut for ExtendedGuardMut<'_, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
