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

//! Open/close state machine.
//!
//! The engine goes through `Idle -> Opening -> Open -> Closing -> Closed`,
//! or `Opening -> Closed` when opening fails. Opening and closing are
//! serialized, so callers racing on [`Lifecycle::open`] all observe the
//! outcome of the single open that ran, and a close issued while opening
//! waits for the open to finish first.

use crate::error::NanomessageError;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use tokio::sync::watch;

/// State of an engine's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, never opened.
    Idle,
    /// Open in progress.
    Opening,
    /// Usable.
    Open,
    /// Close in progress.
    Closing,
    /// Closed, or failed to open.
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Opening => write!(f, "opening"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Drives the open/close transitions of one engine.
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
    op: tokio::sync::Mutex<()>,
    open_error: Mutex<Option<NanomessageError>>,
}

impl Lifecycle {
    /// Creates a lifecycle in [`LifecycleState::Idle`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            state,
            op: tokio::sync::Mutex::new(()),
            open_error: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Runs `open` unless this lifecycle was already opened.
    ///
    /// Repeated calls after a successful open return `Ok` without running
    /// anything. If the open failed, every caller receives that error and
    /// the lifecycle ends up closed.
    ///
    /// # Errors
    ///
    /// The error returned by `open`, or [`NanomessageError::Close`] when
    /// called after a close.
    pub async fn open<F, Fut>(&self, open: F) -> Result<(), NanomessageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), NanomessageError>>,
    {
        let _op = self.op.lock().await;
        match self.state() {
            LifecycleState::Open => return Ok(()),
            LifecycleState::Idle => {}
            LifecycleState::Opening | LifecycleState::Closing | LifecycleState::Closed => {
                return Err(self.open_error.lock().clone().unwrap_or(NanomessageError::Close));
            }
        }

        self.set(LifecycleState::Opening);
        match open().await {
            Ok(()) => {
                self.set(LifecycleState::Open);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "Open failed");
                *self.open_error.lock() = Some(error.clone());
                self.set(LifecycleState::Closed);
                Err(error)
            }
        }
    }

    /// Runs `close` unless this lifecycle was already closed.
    ///
    /// Waits for an in-flight open first. A lifecycle that was never opened
    /// still runs `close`.
    pub async fn close<F, Fut>(&self, close: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let _op = self.op.lock().await;
        if self.state() == LifecycleState::Closed {
            return;
        }

        self.set(LifecycleState::Closing);
        close().await;
        self.set(LifecycleState::Closed);
    }

    /// Fails unless usable now or once the in-flight open completes.
    ///
    /// # Errors
    ///
    /// - [`NanomessageError::NotOpen`] before the first open
    /// - [`NanomessageError::Close`] while closing or closed
    pub fn check_usable(&self) -> Result<(), NanomessageError> {
        match self.state() {
            LifecycleState::Open | LifecycleState::Opening => Ok(()),
            LifecycleState::Idle => Err(NanomessageError::NotOpen),
            LifecycleState::Closing | LifecycleState::Closed => Err(NanomessageError::Close),
        }
    }

    /// Waits for an in-flight open, then fails unless open.
    ///
    /// # Errors
    ///
    /// Same as [`check_usable`](Self::check_usable), evaluated after any
    /// in-flight open settles.
    pub async fn check_open(&self) -> Result<(), NanomessageError> {
        let mut rx = self.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                LifecycleState::Open => return Ok(()),
                LifecycleState::Idle => return Err(NanomessageError::NotOpen),
                LifecycleState::Closing | LifecycleState::Closed => {
                    return Err(NanomessageError::Close)
                }
                LifecycleState::Opening => {}
            }
            if rx.changed().await.is_err() {
                return Err(NanomessageError::Close);
            }
        }
    }

    /// Returns `true` while closing or closed.
    pub fn is_closing(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Closing | LifecycleState::Closed
        )
    }

    fn set(&self, state: LifecycleState) {
        let previous = self.state.send_replace(state);
        tracing::debug!(from = %previous, to = %state, "Lifecycle transition");
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .finish()
    }
}
