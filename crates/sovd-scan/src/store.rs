//! Result store and derived views
//!
//! The store is append-only. Every view is computed on demand from the
//! underlying sequence and keeps insertion order.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::blacklist::NegativeResponseBlacklist;
use crate::packet::{Packet, PacketInterner};
use crate::policy::NegativeResponsePolicy;

/// One observed exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult<S> {
    /// Device state at send time
    pub state: S,
    /// Interned request
    pub request: Packet,
    /// Interned response, `None` on timeout
    pub response: Option<Packet>,
    /// Send time (seconds since the Unix epoch)
    pub request_timestamp: f64,
    /// Receive time (seconds since the Unix epoch)
    pub response_timestamp: Option<f64>,
}

impl<S> ScanResult<S> {
    /// Response time in seconds, when both timestamps are known
    pub fn latency(&self) -> Option<f64> {
        self.response_timestamp
            .map(|received| received - self.request_timestamp)
    }

    pub fn is_answered(&self) -> bool {
        self.response.is_some() && self.response_timestamp.is_some()
    }
}

/// Append-only store of [`ScanResult`]s with an interned packet table
#[derive(Debug, Clone)]
pub struct ResultStore<S> {
    packets: PacketInterner,
    results: Vec<ScanResult<S>>,
}

impl<S> Default for ResultStore<S> {
    fn default() -> Self {
        Self {
            packets: PacketInterner::new(),
            results: Vec::new(),
        }
    }
}

impl<S: Clone + Eq + Hash> ResultStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted results, re-interning every packet
    pub fn from_results(results: impl IntoIterator<Item = ScanResult<S>>) -> Self {
        let mut store = Self::new();
        for result in results {
            store.record(
                result.state,
                &result.request,
                result.response.as_ref(),
                result.request_timestamp,
                result.response_timestamp,
            );
        }
        store
    }

    /// Append one observation; request and response are interned
    pub fn record(
        &mut self,
        state: S,
        request: &Packet,
        response: Option<&Packet>,
        request_timestamp: f64,
        response_timestamp: Option<f64>,
    ) -> &ScanResult<S> {
        let request = self.packets.intern(request);
        let response = response.map(|r| self.packets.intern(r));
        let response_timestamp = response.as_ref().and(response_timestamp);

        self.results.push(ScanResult {
            state,
            request,
            response,
            request_timestamp,
            response_timestamp,
        });
        &self.results[self.results.len() - 1]
    }

    /// All results in insertion order
    pub fn results(&self) -> &[ScanResult<S>] {
        &self.results
    }

    pub fn last(&self) -> Option<&ScanResult<S>> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Canonical packets in first-seen order
    pub fn packets(&self) -> &[Packet] {
        self.packets.packets()
    }

    /// Results that received a response
    pub fn with_response(&self) -> Vec<&ScanResult<S>> {
        self.results.iter().filter(|r| r.is_answered()).collect()
    }

    /// Results that timed out
    pub fn without_response(&self) -> Vec<&ScanResult<S>> {
        self.results.iter().filter(|r| r.response.is_none()).collect()
    }

    /// Results whose response is negative
    pub fn with_negative_response<P>(&self, policy: &P) -> Vec<&ScanResult<S>>
    where
        P: NegativeResponsePolicy + ?Sized,
    {
        self.results
            .iter()
            .filter(|r| r.response.as_ref().is_some_and(|resp| policy.is_negative(resp)))
            .collect()
    }

    /// Results whose response is positive
    pub fn with_positive_response<P>(&self, policy: &P) -> Vec<&ScanResult<S>>
    where
        P: NegativeResponsePolicy + ?Sized,
    {
        self.results
            .iter()
            .filter(|r| r.response.as_ref().is_some_and(|resp| !policy.is_negative(resp)))
            .collect()
    }

    /// Answered results whose negative-response code (if any) is not
    /// blacklisted
    pub fn filtered<P>(
        &self,
        policy: &P,
        blacklist: &NegativeResponseBlacklist,
    ) -> Vec<&ScanResult<S>>
    where
        P: NegativeResponsePolicy + ?Sized,
    {
        self.with_response()
            .into_iter()
            .filter(|r| match r.response.as_ref().and_then(|resp| policy.negative_code(resp)) {
                Some(code) => !blacklist.contains(code),
                None => true,
            })
            .collect()
    }

    /// Results recorded in `state`
    pub fn for_state<'a>(&'a self, state: &'a S) -> impl Iterator<Item = &'a ScanResult<S>> + 'a {
        self.results.iter().filter(move |r| &r.state == state)
    }

    /// Distinct states observed, in first-seen order
    pub fn scanned_states(&self) -> Vec<&S> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .filter(|r| seen.insert(&r.state))
            .map(|r| &r.state)
            .collect()
    }
}
