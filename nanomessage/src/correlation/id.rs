//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Correlation id allocation.

use std::collections::HashSet;

/// Hands out correlation ids and takes them back.
///
/// Ids start at 1; released ids are reused most-recent-first before the
/// counter advances. Id 0 is reserved for ephemeral messages and is never
/// returned.
///
/// The allocator is not synchronized. The engine keeps it behind the same
/// mutex as the [`RequestRegistry`](super::RequestRegistry).
///
/// # Example
///
/// ```rust
/// use nanomessage::correlation::IdAllocator;
///
/// let mut ids = IdAllocator::new();
/// assert_eq!(ids.get(), 1);
/// assert_eq!(ids.get(), 2);
///
/// ids.release(1);
/// assert_eq!(ids.get(), 1);
/// assert_eq!(ids.get(), 3);
/// ```
#[derive(Debug)]
pub struct IdAllocator {
    next_id: u64,
    free: Vec<u64>,
    free_set: HashSet<u64>,
}

impl IdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            free: Vec::new(),
            free_set: HashSet::new(),
        }
    }

    /// Returns an id not currently held.
    pub fn get(&mut self) -> u64 {
        if let Some(id) = self.free.pop() {
            self.free_set.remove(&id);
            return id;
        }

        let id = self.next_id;
        // Wrapping skips the reserved id.
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    /// Returns `id` to the pool.
    ///
    /// Releasing id 0, an id never handed out, or an id already free is a
    /// no-op.
    pub fn release(&mut self, id: u64) {
        if id == 0 || id >= self.next_id || !self.free_set.insert(id) {
            return;
        }
        self.free.push(id);
    }

    /// Number of ids waiting for reuse.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.get(), 1);
        assert_eq!(ids.get(), 2);
        assert_eq!(ids.get(), 3);
    }

    #[test]
    fn test_released_ids_are_reused_lifo() {
        let mut ids = IdAllocator::new();
        let a = ids.get();
        let b = ids.get();
        let _c = ids.get();

        ids.release(a);
        ids.release(b);
        assert_eq!(ids.free_count(), 2);

        assert_eq!(ids.get(), b);
        assert_eq!(ids.get(), a);
        assert_eq!(ids.get(), 4);
    }

    #[test]
    fn test_double_release_is_ignored() {
        let mut ids = IdAllocator::new();
        let a = ids.get();
        ids.release(a);
        ids.release(a);
        assert_eq!(ids.free_count(), 1);

        assert_eq!(ids.get(), a);
        assert_ne!(ids.get(), a);
    }

    #[test]
    fn test_reserved_and_unknown_ids_are_ignored() {
        let mut ids = IdAllocator::new();
        ids.release(0);
        ids.release(99);
        assert_eq!(ids.free_count(), 0);
        assert_eq!(ids.get(), 1);
    }

    #[test]
    fn test_live_ids_are_unique() {
        let mut ids = IdAllocator::new();
        let mut live = HashSet::new();
        for round in 0..50u64 {
            let id = ids.get();
            assert!(live.insert(id), "id {} handed out twice", id);
            if round % 3 == 0 {
                live.remove(&id);
                ids.release(id);
            }
        }
    }
}
