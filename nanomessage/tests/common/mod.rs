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

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use nanomessage::codec::MessageInfo;
use nanomessage::{Event, Nanomessage, MemoryTransport};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Installs a test subscriber once, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two unopened engines connected over memory.
pub fn pair<T: nanomessage::Payload>() -> (Nanomessage<T>, Nanomessage<T>) {
    init_tracing();
    let (left, right) = MemoryTransport::pair();
    (Nanomessage::new(left), Nanomessage::new(right))
}

/// Two opened engines connected over memory.
pub async fn open_pair<T: nanomessage::Payload>() -> (Nanomessage<T>, Nanomessage<T>) {
    let (alice, bob) = pair();
    alice.open().await.expect("alice opens");
    bob.open().await.expect("bob opens");
    (alice, bob)
}

/// Records every event an engine emits.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn attach<T: nanomessage::Payload>(engine: &Nanomessage<T>) -> Self {
        let log = Self::default();
        let events = log.events.clone();
        engine.on_event(move |event| events.lock().push(event.clone()));
        log
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    pub fn created_ids(&self) -> Vec<u64> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::RequestCreated { info } => Some(info.id),
                _ => None,
            })
            .collect()
    }

    pub fn created_infos(&self) -> Vec<MessageInfo> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::RequestCreated { info } => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<nanomessage::NanomessageError> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::MessageError { error, .. } | Event::DecodeError(error) => {
                    Some(error.clone())
                }
                _ => None,
            })
            .collect()
    }
}

/// Polls `condition` every millisecond until it holds or a second passed.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..1000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}

/// Fails the test if `future` takes longer than five seconds.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation finished in time")
}
