//! Index-based table of live connections.
//!
//! [`ConnectionTable`] maps stable integer [`ConnectionId`]s to whatever
//! per-connection state the application keeps, typically an outbound frame
//! sender used for broadcast. Identifiers are allocated from a counter and
//! never reused for the lifetime of the table, so a stale id can never
//! address a newer connection.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Identifier assigned to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Concurrent map from [`ConnectionId`] to per-connection state.
///
/// # Examples
///
/// ```
/// use wsframe::session::ConnectionTable;
///
/// let table = ConnectionTable::new();
/// let a = table.insert("alice");
/// let b = table.insert("bob");
/// assert_ne!(a, b);
///
/// assert_eq!(table.remove(&a), Some("alice"));
/// assert_eq!(table.ids(), vec![b]);
/// ```
#[derive(Debug)]
pub struct ConnectionTable<T> {
    entries: DashMap<ConnectionId, T>,
    next_id: AtomicU64,
}

impl<T> Default for ConnectionTable<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T> ConnectionTable<T> {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Reserve a fresh identifier without storing anything under it.
    pub fn allocate(&self) -> ConnectionId { ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed)) }

    /// Store `value` under a fresh identifier.
    pub fn insert(&self, value: T) -> ConnectionId {
        let id = self.allocate();
        self.entries.insert(id, value);
        id
    }

    /// Store `value` under an identifier obtained from [`allocate`].
    ///
    /// Returns the previous value, if any.
    ///
    /// [`allocate`]: Self::allocate
    pub fn insert_at(&self, id: ConnectionId, value: T) -> Option<T> { self.entries.insert(id, value) }

    /// Remove an entry, typically on connection teardown.
    pub fn remove(&self, id: &ConnectionId) -> Option<T> { self.entries.remove(id).map(|(_, value)| value) }

    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool { self.entries.contains_key(id) }

    /// Run `f` against the entry for `id`, if present.
    pub fn with<R>(&self, id: &ConnectionId, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.entries.get(id).map(|entry| f(entry.value()))
    }

    /// Visit every entry.
    ///
    /// Holds per-bucket read locks while iterating; `f` must not insert into
    /// or remove from this table.
    pub fn for_each(&self, mut f: impl FnMut(ConnectionId, &T)) {
        for entry in &self.entries {
            f(*entry.key(), entry.value());
        }
    }

    /// Keep only the entries for which `keep` returns `true`.
    pub fn retain(&self, mut keep: impl FnMut(ConnectionId, &T) -> bool) {
        self.entries.retain(|id, value| keep(*id, value));
    }

    /// Identifiers of every stored connection, in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.entries.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
