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

use super::{IdAllocator, Request};
use crate::error::NanomessageError;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// How long an id given up without a response stays out of circulation.
pub const DEFAULT_RETIRE_GRACE: Duration = Duration::from_secs(30);

/// Maps correlation ids to their outstanding [`Request`]s.
///
/// The registry owns the [`IdAllocator`] so that inserting an entry and
/// reserving its id, or removing it and releasing the id, happen together
/// under whatever lock guards the registry.
///
/// A request that timed out or was cancelled may still be answered by the
/// remote side. Its id is [`retire`](Self::retire)d instead of released: it
/// stays out of circulation until that late response arrives and is
/// [`reclaim`](Self::reclaim)ed, or until the retire grace period ends.
///
/// Once [`drain`](Self::drain)ed, the registry is closed and refuses new
/// entries.
///
/// # Example
///
/// ```rust
/// use nanomessage::correlation::{Request, RequestRegistry};
///
/// # async fn example() {
/// let mut registry = RequestRegistry::<String>::new();
///
/// let id = registry.allocate().unwrap();
/// let (request, _completion) = Request::new(id, None, None);
/// registry.insert(request).unwrap();
///
/// assert!(registry.get(id).is_some());
/// registry.remove(id);
/// assert!(registry.is_empty());
/// # }
/// ```
#[derive(Debug)]
pub struct RequestRegistry<T> {
    requests: HashMap<u64, Request<T>>,
    ids: IdAllocator,
    retired: VecDeque<(u64, Instant)>,
    retire_grace: Duration,
    closed: bool,
}

impl<T: Send + 'static> RequestRegistry<T> {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retire_grace(DEFAULT_RETIRE_GRACE)
    }

    /// Creates a registry that keeps retired ids out of circulation for
    /// `grace`.
    #[must_use]
    pub fn with_retire_grace(grace: Duration) -> Self {
        Self {
            requests: HashMap::new(),
            ids: IdAllocator::new(),
            retired: VecDeque::new(),
            retire_grace: grace,
            closed: false,
        }
    }

    /// Reserves a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`NanomessageError::Close`] once the registry was drained.
    pub fn allocate(&mut self) -> Result<u64, NanomessageError> {
        if self.closed {
            return Err(NanomessageError::Close);
        }
        self.expire_retired(Instant::now());
        Ok(self.ids.get())
    }

    /// Adds a request under its id.
    ///
    /// # Errors
    ///
    /// Returns [`NanomessageError::Close`] once the registry was drained, in
    /// which case the id is released.
    pub fn insert(&mut self, request: Request<T>) -> Result<(), NanomessageError> {
        if self.closed {
            self.ids.release(request.id());
            return Err(NanomessageError::Close);
        }
        let id = request.id();
        if let Some(previous) = self.requests.insert(id, request) {
            tracing::warn!(request_id = id, "Replaced a live request with the same id");
            drop(previous);
        }
        Ok(())
    }

    /// Looks up the request for `id`.
    pub fn get(&self, id: u64) -> Option<Request<T>> {
        self.requests.get(&id).cloned()
    }

    /// Removes the entry for `id` and releases the id.
    pub fn remove(&mut self, id: u64) -> Option<Request<T>> {
        let removed = self.requests.remove(&id);
        if removed.is_some() {
            self.ids.release(id);
        }
        removed
    }

    /// Removes the entry for `id` and holds the id back until a late
    /// response for it is [`reclaim`](Self::reclaim)ed or the grace period
    /// ends.
    pub fn retire(&mut self, id: u64) -> Option<Request<T>> {
        let removed = self.requests.remove(&id);
        if removed.is_some() {
            self.retired.push_back((id, Instant::now() + self.retire_grace));
        }
        removed
    }

    /// Releases a retired id whose late response just arrived. Returns
    /// `false` if `id` was not retired.
    pub fn reclaim(&mut self, id: u64) -> bool {
        let Some(index) = self.retired.iter().position(|(retired, _)| *retired == id) else {
            return false;
        };
        self.retired.remove(index);
        self.ids.release(id);
        true
    }

    /// Number of ids held back after a timeout or cancellation.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    fn expire_retired(&mut self, now: Instant) {
        while let Some(&(id, deadline)) = self.retired.front() {
            if deadline > now {
                break;
            }
            self.retired.pop_front();
            self.ids.release(id);
        }
    }

    /// Closes the registry and hands back every outstanding request.
    pub fn drain(&mut self) -> Vec<Request<T>> {
        self.closed = true;
        for (id, _) in std::mem::take(&mut self.retired) {
            self.ids.release(id);
        }
        let drained: Vec<_> = self.requests.drain().map(|(_, request)| request).collect();
        for request in &drained {
            self.ids.release(request.id());
        }
        drained
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns `true` when nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns `true` once drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: Send + 'static> Default for RequestRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(registry: &mut RequestRegistry<u32>) -> Request<u32> {
        let id = registry.allocate().unwrap();
        let (request, _completion) = Request::new(id, None, None);
        registry.insert(request.clone()).unwrap();
        request
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = RequestRegistry::new();
        let a = register(&mut registry);
        let b = register(&mut registry);

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a.id()).map(|r| r.id()), Some(a.id()));
        assert!(registry.get(99).is_none());
    }

    #[test]
    fn test_remove_releases_id() {
        let mut registry = RequestRegistry::new();
        let a = register(&mut registry);
        let _b = register(&mut registry);

        assert!(registry.remove(a.id()).is_some());
        assert!(registry.remove(a.id()).is_none());

        let reused = register(&mut registry);
        assert_eq!(reused.id(), a.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retired_id_waits_for_grace() {
        let mut registry = RequestRegistry::with_retire_grace(Duration::from_secs(5));
        let a = register(&mut registry);

        assert!(registry.retire(a.id()).is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.retired_len(), 1);

        let b = register(&mut registry);
        assert_ne!(b.id(), a.id());
        registry.remove(b.id());

        tokio::time::advance(Duration::from_secs(6)).await;
        let c = register(&mut registry);
        let d = register(&mut registry);
        assert_eq!(registry.retired_len(), 0);
        assert!([c.id(), d.id()].contains(&a.id()));
    }

    #[test]
    fn test_reclaim_releases_retired_id() {
        let mut registry = RequestRegistry::new();
        let a = register(&mut registry);
        registry.retire(a.id());

        assert!(!registry.reclaim(99));
        assert!(registry.reclaim(a.id()));
        assert!(!registry.reclaim(a.id()));

        let reused = register(&mut registry);
        assert_eq!(reused.id(), a.id());
    }

    #[test]
    fn test_drain_closes() {
        let mut registry = RequestRegistry::new();
        register(&mut registry);
        register(&mut registry);

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.is_closed());

        assert_eq!(registry.allocate(), Err(NanomessageError::Close));
        let (late, _completion) = Request::<u32>::new(50, None, None);
        assert_eq!(registry.insert(late), Err(NanomessageError::Close));
    }
}
