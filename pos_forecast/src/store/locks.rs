//! Per-user reader/writer locks

use crate::record::UserId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// One lock per user: writes (upload, train, delete) are exclusive, reads
/// (predict, stats, status) share. Different users never contend.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<RwLock<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock guarding `user`'s dataset and model
    pub fn for_user(&self, user: UserId) -> Arc<RwLock<()>> {
        self.locks
            .lock()
            .entry(user)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Drop `user`'s entry unless someone still holds its lock
    pub fn prune(&self, user: UserId) -> bool {
        let mut locks = self.locks.lock();
        match locks.get(&user) {
            Some(lock) if Arc::strong_count(lock) == 1 => {
                locks.remove(&user);
                true
            }
            _ => false,
        }
    }

    /// Users that currently have an entry
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_user_shares_a_lock() {
        let locks = UserLocks::new();
        let a = locks.for_user(UserId(1));
        let b = locks.for_user(UserId(1));
        let other = locks.for_user(UserId(2));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));

        let _write = a.write();
        assert!(b.try_read().is_none());
        assert!(other.try_write().is_some());
    }

    #[test]
    fn test_prune_only_drops_unshared_entries() {
        let locks = UserLocks::new();
        let held = locks.for_user(UserId(1));
        drop(locks.for_user(UserId(2)));
        assert_eq!(locks.len(), 2);

        assert!(!locks.prune(UserId(1)));
        assert!(locks.prune(UserId(2)));
        assert!(!locks.prune(UserId(3)));
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.prune(UserId(1)));
        assert!(locks.is_empty());
    }
}
