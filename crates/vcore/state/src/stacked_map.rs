// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! An ordered revision stack of tentative writes.
//!
//! Each frame shadows the frames below it; the bottom frame doubles as a
//! read-through cache for the loader, so values fetched from storage survive
//! any number of reverts. Every write is also appended to the owning frame's
//! journal, preserving global insertion order for replay.

use std::collections::HashMap;
use std::hash::Hash;

use crate::Result;

/// Source of values for keys not present in any frame.
///
/// Implementations must be pure relative to underlying storage: loading the
/// same key twice must yield the same value unless the storage changed.
pub(crate) trait Loader<K, V> {
    /// Returns the value and whether the key actually exists underneath.
    fn load(&mut self, key: &K) -> Result<(V, bool)>;
}

struct Frame<K, V> {
    kvs: HashMap<K, V>,
    journal: Vec<(K, V)>,
}

impl<K, V> Frame<K, V> {
    fn new() -> Self {
        Frame {
            kvs: HashMap::new(),
            journal: Vec::new(),
        }
    }
}

pub(crate) struct StackedMap<K, V, L> {
    loader: L,
    frames: Vec<Frame<K, V>>,
}

impl<K, V, L> StackedMap<K, V, L>
where
    K: Eq + Hash + Clone,
    V: Clone,
    L: Loader<K, V>,
{
    /// Creates a stack holding only the bottom (cache) frame.
    pub fn new(loader: L) -> Self {
        StackedMap {
            loader,
            frames: vec![Frame::new()],
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Pushes an empty frame and returns the revision to revert to.
    pub fn push(&mut self) -> usize {
        self.frames.push(Frame::new());
        self.frames.len() - 1
    }

    /// Discards every frame pushed at or after `revision`. The bottom frame
    /// holds loader snapshots and is never popped.
    pub fn pop_to(&mut self, revision: usize) {
        self.frames.truncate(revision.max(1));
    }

    /// Writes into the top frame only.
    pub fn put(&mut self, key: K, value: V) {
        let top = self.frames.last_mut().expect("frame stack never empty");
        top.kvs.insert(key.clone(), value.clone());
        top.journal.push((key, value));
    }

    /// Scans frames top-down; on a miss the loader's result is cached (and
    /// journaled) in the bottom frame. Loader errors propagate unchanged.
    pub fn get(&mut self, key: &K) -> Result<(V, bool)> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.kvs.get(key) {
                return Ok((value.clone(), true));
            }
        }
        let (value, exists) = self.loader.load(key)?;
        let bottom = &mut self.frames[0];
        bottom.kvs.insert(key.clone(), value.clone());
        bottom.journal.push((key.clone(), value.clone()));
        Ok((value, exists))
    }

    /// Visits every write across every live frame in insertion order,
    /// stopping early when `visit` returns false.
    pub fn journal<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for frame in &self.frames {
            for (key, value) in &frame.journal {
                if !visit(key, value) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adapts a closure into a [`Loader`] for tests.
    struct FnLoader<F>(F);

    impl<K, V, F> Loader<K, V> for FnLoader<F>
    where
        F: FnMut(&K) -> Result<(V, bool)>,
    {
        fn load(&mut self, key: &K) -> Result<(V, bool)> {
            (self.0)(key)
        }
    }

    #[test]
    fn shadowing_and_revert() {
        let mut sm = StackedMap::new(FnLoader(|_: &&str| Ok((0u64, false))));

        sm.put("k", 1);
        let rev = sm.push();
        sm.put("k", 2);
        assert_eq!(sm.get(&"k").unwrap(), (2, true));

        let rev2 = sm.push();
        sm.put("k", 3);
        assert_eq!(sm.get(&"k").unwrap(), (3, true));

        sm.pop_to(rev2);
        assert_eq!(sm.get(&"k").unwrap(), (2, true));

        sm.pop_to(rev);
        assert_eq!(sm.get(&"k").unwrap(), (1, true));
    }

    #[test]
    fn nested_revert_subsumes() {
        let mut sm = StackedMap::new(FnLoader(|_: &&str| Ok((0u64, false))));
        let r1 = sm.push();
        sm.put("a", 1);
        let _r2 = sm.push();
        sm.put("a", 2);
        // reverting to the outer checkpoint discards both frames
        sm.pop_to(r1);
        assert_eq!(sm.get(&"a").unwrap(), (0, false));
    }

    #[test]
    fn loader_results_cached_in_bottom_frame() {
        let mut loads = Vec::new();
        {
            let mut sm = StackedMap::new(FnLoader(|key: &&'static str| {
                loads.push(*key);
                Ok((100u64, true))
            }));

            let rev = sm.push();
            assert_eq!(sm.get(&"k").unwrap(), (100, true));
            assert_eq!(sm.get(&"k").unwrap(), (100, true));

            // the cached load lives in the bottom frame, so a revert must
            // neither lose it nor trigger a refetch
            sm.pop_to(rev);
            assert_eq!(sm.get(&"k").unwrap(), (100, true));
        }
        assert_eq!(loads, vec!["k"]);
    }

    #[test]
    fn journal_preserves_insertion_order() {
        let mut sm = StackedMap::new(FnLoader(|_: &&str| Ok((0u64, false))));
        sm.put("a", 1);
        sm.push();
        sm.put("b", 2);
        sm.put("a", 3);

        let mut seen = Vec::new();
        sm.journal(|k, v| {
            seen.push((*k, *v));
            true
        });
        assert_eq!(seen, vec![("a", 1), ("b", 2), ("a", 3)]);

        let mut first_two = Vec::new();
        sm.journal(|k, v| {
            first_two.push((*k, *v));
            first_two.len() < 2
        });
        assert_eq!(first_two, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn popped_writes_leave_the_journal() {
        let mut sm = StackedMap::new(FnLoader(|_: &&str| Ok((0u64, false))));
        sm.put("keep", 1);
        let rev = sm.push();
        sm.put("drop", 2);
        sm.pop_to(rev);

        let mut seen = Vec::new();
        sm.journal(|k, v| {
            seen.push((*k, *v));
            true
        });
        assert_eq!(seen, vec![("keep", 1)]);
    }
}
