//! Striped per-key locks.

use parking_lot::{Mutex, MutexGuard};

use crate::domain::keys::RoutingKey;

/// Fixed pool of mutexes; a routing key always maps to the same stripe.
///
/// Holders must not take a second stripe.
pub(crate) struct KeyLocks {
    stripes: Box<[Mutex<()>]>,
}

impl KeyLocks {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) fn lock(&self, key: &RoutingKey) -> MutexGuard<'_, ()> {
        self.stripes[key.stripe(self.stripes.len())].lock()
    }
}
