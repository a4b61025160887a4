use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Opaque per-factory token keying a sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceId(Uuid);

impl SequenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequence counters keyed by [`SequenceId`].
///
/// Every read advances the counter: the first `next_value` for an id
/// returns 0, then 1, 2, ... Clones share the same counters.
#[derive(Clone, Debug)]
pub struct SequenceRegistry {
    counters: Arc<Mutex<HashMap<SequenceId, u64>>>,
}

static GLOBAL: OnceLock<SequenceRegistry> = OnceLock::new();

impl SequenceRegistry {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Process-wide registry used by factories that were not given one.
    pub fn global() -> &'static SequenceRegistry {
        GLOBAL.get_or_init(SequenceRegistry::new)
    }

    pub fn next_value(&self, id: SequenceId) -> u64 {
        let mut counters = self.counters.lock();
        match counters.get_mut(&id) {
            Some(counter) => {
                *counter += 1;
                *counter
            }
            None => {
                counters.insert(id, 0);
                0
            }
        }
    }

    /// Forget one counter; the next read for `id` starts again at 0.
    pub fn reset(&self, id: SequenceId) {
        self.counters.lock().remove(&id);
    }

    pub fn reset_all(&self) {
        self.counters.lock().clear();
    }

    /// Number of live counters
    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }
}

impl Default for SequenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reset every counter in the process-wide registry.
pub fn reset_all_sequence() {
    tracing::debug!("Resetting all sequence counters");
    SequenceRegistry::global().reset_all();
}
