//! Per-state request stream composition
//!
//! The stream for a state is its pending retry (if any) followed by the
//! state's initial-request iterator, resumed from where it last stopped.
//! Both structures are runtime caches and are never persisted.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::catalog::RequestIter;
use crate::packet::Packet;

/// Next request to send and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRequest {
    pub packet: Packet,
    /// Drawn from the retry slot rather than the initial-request iterator
    pub is_retry: bool,
}

/// Pending request(s) to resend before fresh requests are drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEntry {
    Single(Packet),
    Sequence(Vec<Packet>),
}

impl From<Packet> for RetryEntry {
    fn from(packet: Packet) -> Self {
        Self::Single(packet)
    }
}

/// Retry slots and the initial-request iterator registry
pub struct RequestComposer<S> {
    retries: HashMap<S, VecDeque<Packet>>,
    iterators: HashMap<S, RequestIter>,
}

impl<S> std::fmt::Debug for RequestComposer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestComposer")
            .field("pending_retries", &self.retries.len())
            .field("iterators", &self.iterators.len())
            .finish()
    }
}

impl<S: Clone + Eq + Hash> Default for RequestComposer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Eq + Hash> RequestComposer<S> {
    pub fn new() -> Self {
        Self {
            retries: HashMap::new(),
            iterators: HashMap::new(),
        }
    }

    /// Draw the next request for `state`
    ///
    /// Retry items always come first. The initial-request iterator is created
    /// with `generator` the first time the state is seen and reused after.
    /// Returns `None` once both are exhausted.
    pub fn next_request<F>(&mut self, state: &S, generator: F) -> Option<NextRequest>
    where
        F: FnOnce() -> RequestIter,
    {
        if let Some(packet) = self.take_retry_item(state) {
            return Some(NextRequest {
                packet,
                is_retry: true,
            });
        }

        let iterator = self
            .iterators
            .entry(state.clone())
            .or_insert_with(generator);
        iterator.next().map(|packet| NextRequest {
            packet,
            is_retry: false,
        })
    }

    /// Install a retry for `state` unless one is already pending
    ///
    /// Returns whether the entry was installed.
    pub fn schedule_retry(&mut self, state: &S, entry: impl Into<RetryEntry>) -> bool {
        if self.has_retry(state) {
            return false;
        }
        let items: VecDeque<Packet> = match entry.into() {
            RetryEntry::Single(packet) => VecDeque::from([packet]),
            RetryEntry::Sequence(packets) => packets.into(),
        };
        if items.is_empty() {
            return false;
        }
        self.retries.insert(state.clone(), items);
        true
    }

    pub fn has_retry(&self, state: &S) -> bool {
        self.retries.get(state).is_some_and(|items| !items.is_empty())
    }

    /// Pending retry items for `state`
    pub fn pending_retry(&self, state: &S) -> Vec<Packet> {
        self.retries
            .get(state)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Put a drawn request back at the front of the pending retries
    ///
    /// Unlike [`schedule_retry`](Self::schedule_retry) this never refuses, so
    /// remaining items of a sequence retry stay queued behind it.
    pub fn requeue_front(&mut self, state: &S, packet: Packet) {
        self.retries
            .entry(state.clone())
            .or_default()
            .push_front(packet);
    }

    /// Whether the initial-request iterator for `state` has been created
    pub fn has_iterator(&self, state: &S) -> bool {
        self.iterators.contains_key(state)
    }

    fn take_retry_item(&mut self, state: &S) -> Option<Packet> {
        let items = self.retries.get_mut(state)?;
        let packet = items.pop_front();
        if items.is_empty() {
            self.retries.remove(state);
        }
        packet
    }
}
