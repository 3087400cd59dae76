//! Id-keyed contact collections.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::model::{ContactKind, FriendInfo, MemberInfo};
use crate::error::{BotError, Result};

/// A record that can live in a [`ContactList`].
pub trait ContactRecord: Send + Sync + 'static {
    /// List this record belongs to, used for `NoSuchContact` errors.
    const KIND: ContactKind;

    /// Unique id within the list.
    fn id(&self) -> u64;
}

impl ContactRecord for FriendInfo {
    const KIND: ContactKind = ContactKind::Friend;

    fn id(&self) -> u64 {
        self.id
    }
}

impl ContactRecord for MemberInfo {
    const KIND: ContactKind = ContactKind::Member;

    fn id(&self) -> u64 {
        self.id
    }
}

/// Concurrent map from id to record.
///
/// Readers get `Arc` snapshots and never block each other; writers replace
/// entries wholesale so a reader never sees a half-updated record.
pub struct ContactList<T> {
    entries: RwLock<HashMap<u64, Arc<T>>>,
}

impl<T> Default for ContactList<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ContactRecord> ContactList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, Arc<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, Arc<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a record.
    pub fn get(&self, id: u64) -> Option<Arc<T>> {
        self.read().get(&id).cloned()
    }

    /// Look up a record, failing with `NoSuchContact`.
    pub fn require(&self, id: u64) -> Result<Arc<T>> {
        self.get(id).ok_or_else(|| BotError::no_such(T::KIND, id))
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: u64) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All ids, ascending.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of all records, ascending by id.
    pub fn to_vec(&self) -> Vec<Arc<T>> {
        let mut all: Vec<Arc<T>> = self.read().values().cloned().collect();
        all.sort_unstable_by_key(|r| r.id());
        all
    }

    /// Swap in a new set of records under one write lock.
    pub(crate) fn replace_all(&self, records: impl IntoIterator<Item = T>) {
        let fresh: HashMap<u64, Arc<T>> = records
            .into_iter()
            .map(|r| (r.id(), Arc::new(r)))
            .collect();
        *self.write() = fresh;
    }

    /// Insert or replace a record, returning the previous one.
    pub(crate) fn insert(&self, record: T) -> Option<Arc<T>> {
        self.write().insert(record.id(), Arc::new(record))
    }

    /// Remove a record.
    pub(crate) fn remove(&self, id: u64) -> Option<Arc<T>> {
        self.write().remove(&id)
    }
}

impl<T: ContactRecord + Clone> ContactList<T> {
    /// Mutate one record in place, failing with `NoSuchContact`.
    pub(crate) fn update<R>(&self, id: u64, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| BotError::no_such(T::KIND, id))?;
        Ok(f(Arc::make_mut(entry)))
    }
}

impl<T: ContactRecord> std::fmt::Debug for ContactList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactList")
            .field("kind", &T::KIND)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friend(id: u64, nick: &str) -> FriendInfo {
        FriendInfo {
            id,
            nick: nick.to_string(),
            remark: String::new(),
        }
    }

    #[test]
    fn test_require_unknown_is_no_such_contact() {
        let list: ContactList<FriendInfo> = ContactList::new();
        let err = list.require(7).unwrap_err();
        assert!(matches!(
            err,
            BotError::NoSuchContact {
                kind: ContactKind::Friend,
                id: 7
            }
        ));
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let list = ContactList::new();
        list.insert(friend(1, "a"));
        list.insert(friend(2, "b"));

        list.replace_all(vec![friend(3, "c")]);
        assert_eq!(list.ids(), vec![3]);
        assert!(list.get(1).is_none());
    }

    #[test]
    fn test_update_leaves_old_snapshot_intact() {
        let list = ContactList::new();
        list.insert(friend(1, "before"));

        let snapshot = list.require(1).unwrap();
        list.update(1, |f| f.nick = "after".to_string()).unwrap();

        assert_eq!(snapshot.nick, "before");
        assert_eq!(list.require(1).unwrap().nick, "after");
        assert!(list.update(9, |_| ()).is_err());
    }

    #[test]
    fn test_to_vec_sorted() {
        let list = ContactList::new();
        for id in [5, 1, 3] {
            list.insert(friend(id, "x"));
        }
        let ids: Vec<u64> = list.to_vec().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(list.len(), 3);
        assert!(list.remove(3).is_some());
        assert!(!list.contains(3));
    }
}
