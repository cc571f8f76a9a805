//! Observable conversation transcript.
//!
//! [`TranscriptStore`] owns the [`TranscriptState`] of one conversation.
//! Every mutation happens under a lock and is followed by a snapshot delivered
//! to subscribers, outside the lock. Snapshots from one writer arrive in
//! mutation order; snapshots from concurrent writers may interleave.
//!
//! The assistant message of a send is addressed through a [`TurnHandle`]
//! rather than searched for, so a second send never patches the first one's
//! reply. [`TranscriptStore::reset`] bumps an epoch that invalidates every
//! outstanding handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tripmate_core::{Listener, Listeners, Subscription};

use crate::types::{Message, TranscriptState};

/// Reference to the assistant message of one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnHandle {
    epoch: u64,
    index: usize,
}

impl TurnHandle {
    /// Position of the message in the transcript.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// Callback receiving a snapshot after every mutation.
pub type TranscriptListener = Listener<TranscriptState>;

#[derive(Debug, Default)]
struct Inner {
    state: TranscriptState,
    epoch: u64,
}

/// Shared, observable transcript.
#[derive(Default)]
pub struct TranscriptStore {
    inner: Mutex<Inner>,
    listeners: Listeners<TranscriptState>,
}

impl TranscriptStore {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty transcript behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> TranscriptState {
        self.inner.lock().state.clone()
    }

    /// Register a listener for every future mutation.
    ///
    /// Each mutation delivers exactly one snapshot. Mutations made from a
    /// single task arrive in order. When two tasks mutate concurrently their
    /// snapshots may be delivered out of order, so a listener that needs the
    /// latest state should read [`state`](Self::state) rather than trust the
    /// last snapshot it saw.
    pub fn subscribe(&self, listener: TranscriptListener) -> Subscription {
        self.listeners.add(listener)
    }

    /// Apply `f` under the lock, then publish a snapshot.
    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (result, snapshot) = {
            let mut inner = self.inner.lock();
            let result = f(&mut inner);
            (result, inner.state.clone())
        };
        self.listeners.notify(&snapshot);
        result
    }

    /// Start a send: clear the error, set `loading`, append the user message.
    pub fn begin_send(&self, user_text: &str) {
        self.mutate(|inner| {
            inner.state.error = None;
            inner.state.loading = true;
            inner.state.messages.push(Message::user(user_text));
        });
    }

    /// Append an assistant message and return its handle.
    pub fn push_assistant(&self, content: &str) -> TurnHandle {
        self.mutate(|inner| {
            inner.state.messages.push(Message::assistant(content));
            TurnHandle {
                epoch: inner.epoch,
                index: inner.state.messages.len() - 1,
            }
        })
    }

    /// Replace the content of the message behind `handle`.
    ///
    /// Returns `false` without publishing anything if the handle predates the
    /// last reset or no longer points at a message.
    pub fn patch(&self, handle: TurnHandle, content: &str) -> bool {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.epoch != handle.epoch {
                return false;
            }
            let Some(message) = inner.state.messages.get_mut(handle.index) else {
                return false;
            };
            content.clone_into(&mut message.content);
            inner.state.clone()
        };
        self.listeners.notify(&snapshot);
        true
    }

    /// End a send: clear `loading` and record `error`.
    pub fn finish_send(&self, error: Option<String>) {
        self.mutate(|inner| {
            inner.state.loading = false;
            inner.state.error = error;
        });
    }

    /// Replace every message, keeping `loading` and `error`.
    ///
    /// Outstanding handles are invalidated.
    pub fn replace_messages(&self, messages: Vec<Message>) {
        self.mutate(|inner| {
            inner.epoch += 1;
            inner.state.messages = messages;
        });
    }

    /// Clear messages, error, and loading. Outstanding handles are invalidated.
    pub fn reset(&self) {
        self.mutate(|inner| {
            inner.epoch += 1;
            inner.state = TranscriptState::default();
        });
    }
}

impl std::fmt::Debug for TranscriptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptStore")
            .field("inner", &*self.inner.lock())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
