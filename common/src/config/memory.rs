//! RAM-backed [`KeyValueStore`].
//!
//! Used by the host tests and as the fallback store when the flash image
//! cannot be mounted. Writes are staged per session and only land in the
//! committed table at `end()`.

use heapless::{String, Vec};

use super::store::{KeyValueStore, MAX_KEY_LEN, StoreError, StoredValue};

/// Default entry capacity. The dashboard schema uses 14 keys.
pub const DEFAULT_CAPACITY: usize = 24;

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    namespace: String<MAX_KEY_LEN>,
    key: String<MAX_KEY_LEN>,
    value: StoredValue,
}

#[derive(Clone, Debug)]
struct Session {
    namespace: String<MAX_KEY_LEN>,
    read_only: bool,
}

/// In-memory store holding up to `N` entries across all namespaces.
#[derive(Clone, Debug)]
pub struct MemoryStore<const N: usize = DEFAULT_CAPACITY> {
    committed: Vec<Entry, N>,
    staged: Vec<Entry, N>,
    session: Option<Session>,
    commits: u32,
    puts_remaining: usize,
}

impl<const N: usize> MemoryStore<N> {
    pub const fn new() -> Self {
        Self {
            committed: Vec::new(),
            staged: Vec::new(),
            session: None,
            commits: 0,
            puts_remaining: usize::MAX,
        }
    }

    /// Number of write sessions committed.
    pub const fn commit_count(&self) -> u32 { self.commits }

    /// Committed entries in `namespace`, for persisting to another medium.
    pub fn entries<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a StoredValue)> + 'a {
        self.committed
            .iter()
            .filter(move |e| e.namespace == namespace)
            .map(|e| (e.key.as_str(), &e.value))
    }

    /// Every committed entry as `(namespace, key, value)`.
    pub fn all_entries(&self) -> impl Iterator<Item = (&str, &str, &StoredValue)> {
        self.committed.iter().map(|e| (e.namespace.as_str(), e.key.as_str(), &e.value))
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize { self.committed.len() }

    pub fn is_empty(&self) -> bool { self.committed.is_empty() }

    /// Insert an entry directly into the committed table, bypassing
    /// sessions. Used when mounting a persisted image.
    pub fn restore(
        &mut self,
        namespace: &str,
        key: &str,
        value: StoredValue,
    ) -> Result<(), StoreError> {
        let entry = make_entry(namespace, key, value)?;
        upsert(&mut self.committed, entry)
    }

    /// Make every put after the next `remaining` fail with
    /// [`StoreError::Io`]. `usize::MAX` disables the fault.
    pub fn fail_after_puts(
        &mut self,
        remaining: usize,
    ) {
        self.puts_remaining = remaining;
    }

    fn open_namespace(&self) -> Option<&str> { self.session.as_ref().map(|s| s.namespace.as_str()) }

    fn lookup(
        &self,
        key: &str,
    ) -> Option<&Entry> {
        let namespace = self.open_namespace()?;
        let matches = |e: &&Entry| e.namespace == namespace && e.key == key;
        self.staged.iter().find(matches).or_else(|| self.committed.iter().find(matches))
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self { Self::new() }
}

fn make_entry(
    namespace: &str,
    key: &str,
    value: StoredValue,
) -> Result<Entry, StoreError> {
    Ok(Entry {
        namespace: String::try_from(namespace).map_err(|_| StoreError::Full)?,
        key: String::try_from(key).map_err(|_| StoreError::Full)?,
        value,
    })
}

fn upsert<const N: usize>(
    table: &mut Vec<Entry, N>,
    entry: Entry,
) -> Result<(), StoreError> {
    if let Some(slot) = table.iter_mut().find(|e| e.namespace == entry.namespace && e.key == entry.key) {
        slot.value = entry.value;
        return Ok(());
    }
    table.push(entry).map_err(|_| StoreError::Full)
}

impl<const N: usize> KeyValueStore for MemoryStore<N> {
    fn begin(
        &mut self,
        namespace: &str,
        read_only: bool,
    ) -> Result<(), StoreError> {
        if self.session.is_some() {
            return Err(StoreError::Busy);
        }
        let namespace = String::try_from(namespace).map_err(|_| StoreError::Full)?;
        self.staged.clear();
        self.session = Some(Session { namespace, read_only });
        Ok(())
    }

    fn end(&mut self) -> Result<(), StoreError> {
        let session = self.session.take().ok_or(StoreError::NotOpen)?;
        if session.read_only {
            return Ok(());
        }

        // Check capacity before touching the committed table so a failed
        // commit changes nothing.
        let new_keys = self
            .staged
            .iter()
            .filter(|s| !self.committed.iter().any(|c| c.namespace == s.namespace && c.key == s.key))
            .count();
        if self.committed.len() + new_keys > N {
            self.staged.clear();
            return Err(StoreError::Full);
        }

        for entry in self.staged.iter().cloned() {
            upsert(&mut self.committed, entry)?;
        }
        self.staged.clear();
        self.commits = self.commits.wrapping_add(1);
        Ok(())
    }

    fn abort(&mut self) {
        self.staged.clear();
        self.session = None;
    }

    fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.lookup(key).is_some()
    }

    fn get(
        &self,
        key: &str,
    ) -> Option<StoredValue> {
        self.lookup(key).map(|e| e.value.clone())
    }

    fn put(
        &mut self,
        key: &str,
        value: StoredValue,
    ) -> Result<(), StoreError> {
        let session = self.session.as_ref().ok_or(StoreError::NotOpen)?;
        if session.read_only {
            return Err(StoreError::ReadOnly);
        }
        if self.puts_remaining == 0 {
            return Err(StoreError::Io);
        }
        let entry = make_entry(&session.namespace, key, value)?;
        upsert(&mut self.staged, entry)?;
        if self.puts_remaining != usize::MAX {
            self.puts_remaining -= 1;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_writes_invisible_until_end() {
        let mut store: MemoryStore = MemoryStore::new();
        store.begin("ns", false).unwrap();
        store.put_u32("a", 1).unwrap();
        assert_eq!(store.get_u32("a"), Some(1));
        store.abort();

        store.begin("ns", true).unwrap();
        assert!(!store.contains_key("a"));
        store.end().unwrap();
        assert_eq!(store.commit_count(), 0);

        store.begin("ns", false).unwrap();
        store.put_u32("a", 2).unwrap();
        store.end().unwrap();
        store.begin("ns", true).unwrap();
        assert_eq!(store.get_u32("a"), Some(2));
        store.end().unwrap();
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_session_rules() {
        let mut store: MemoryStore = MemoryStore::new();
        assert_eq!(store.put_u32("a", 1), Err(StoreError::NotOpen));
        assert_eq!(store.end(), Err(StoreError::NotOpen));
        store.begin("ns", true).unwrap();
        assert_eq!(store.begin("ns", true), Err(StoreError::Busy));
        assert_eq!(store.put_bool("a", true), Err(StoreError::ReadOnly));
        store.end().unwrap();
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let mut store: MemoryStore = MemoryStore::new();
        store.begin("one", false).unwrap();
        store.put_u32("k", 1).unwrap();
        store.end().unwrap();
        store.begin("two", true).unwrap();
        assert_eq!(store.get("k"), None);
        store.end().unwrap();
        assert_eq!(store.entries("one").count(), 1);
        assert_eq!(store.entries("two").count(), 0);
    }

    #[test]
    fn test_commit_over_capacity_changes_nothing() {
        let mut store: MemoryStore<2> = MemoryStore::new();
        store.begin("ns", false).unwrap();
        store.put_u32("a", 1).unwrap();
        store.end().unwrap();

        store.begin("ns", false).unwrap();
        store.put_u32("a", 9).unwrap();
        store.put_u32("b", 2).unwrap();
        assert_eq!(store.put_u32("c", 3), Err(StoreError::Full));
        store.end().unwrap();

        // The staged table is bounded too, but a full committed table must
        // also reject new keys at commit time.
        store.begin("other", false).unwrap();
        store.put_u32("z", 0).unwrap();
        assert_eq!(store.end(), Err(StoreError::Full));
        assert_eq!(store.entries("ns").count(), 2);
        assert_eq!(store.entries("other").count(), 0);
    }

    #[test]
    fn test_text_values_and_long_keys() {
        let mut store: MemoryStore = MemoryStore::new();
        store.begin("ns", false).unwrap();
        store.put("name", StoredValue::text("Generic Dash").unwrap()).unwrap();
        assert_eq!(store.put_u32("a_key_that_is_far_too_long", 1), Err(StoreError::Full));
        store.end().unwrap();
        assert!(StoredValue::text(&"x".repeat(64)).is_err());
        store.restore("ns", "f", StoredValue::F32(1.5)).unwrap();
        store.begin("ns", true).unwrap();
        assert_eq!(store.get_f32("f"), Some(1.5));
        assert!(matches!(store.get("name"), Some(StoredValue::Str(s)) if s == "Generic Dash"));
        store.end().unwrap();
    }
}
