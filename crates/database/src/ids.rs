use std::collections::BTreeSet;

pub const DEFAULT_ID_WINDOW: usize = 2000;

/// Ordered set of recently accepted identifiers.
///
/// With `max_tracked` set, the smallest identifiers are evicted first once the
/// set grows past the cap; identifiers are close to monotonic so that drops
/// the oldest ones. Without a cap the set grows for the owner's lifetime,
/// which is bounded by a single batch run.
#[derive(Debug, Clone, Default)]
pub struct RecentIds {
    ids: BTreeSet<i64>,
    max_tracked: Option<usize>,
}

impl RecentIds {
    pub fn new(max_tracked: Option<usize>) -> Self {
        Self {
            ids: BTreeSet::new(),
            max_tracked,
        }
    }

    /// Seed from identifiers read back from a store (any order).
    pub fn seeded(ids: impl IntoIterator<Item = i64>, max_tracked: Option<usize>) -> Self {
        let mut this = Self::new(max_tracked);
        this.extend(ids);
        this
    }

    #[inline]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false if `id` was already present.
    pub fn insert(&mut self, id: i64) -> bool {
        let fresh = self.ids.insert(id);
        self.evict();
        fresh
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.ids.extend(ids);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn newest(&self) -> Option<i64> {
        self.ids.last().copied()
    }

    pub fn oldest(&self) -> Option<i64> {
        self.ids.first().copied()
    }

    fn evict(&mut self) {
        if let Some(cap) = self.max_tracked {
            while self.ids.len() > cap {
                self.ids.pop_first();
            }
        }
    }
}
