//! State-transition edges and the transition executor

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::packet::Packet;
use crate::policy::NegativeResponsePolicy;
use crate::transport::ScanTransport;

/// Default response timeout of a transition attempt
pub const TRANSITION_TIMEOUT: Duration = Duration::from_secs(20);

/// Ordered pair of device states
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge<S> {
    pub from: S,
    pub to: S,
}

impl<S> Edge<S> {
    pub fn new(from: S, to: S) -> Self {
        Self { from, to }
    }
}

impl<S: fmt::Display> fmt::Display for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// An edge together with the request observed to trigger it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEntry<S> {
    pub edge: Edge<S>,
    pub request: Packet,
}

/// Discovered edges and their triggering requests, in discovery order
///
/// Recording an already known edge replaces its triggering request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeRecord<S> {
    entries: Vec<EdgeEntry<S>>,
}

impl<S> Default for EdgeRecord<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: PartialEq> EdgeRecord<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge: Edge<S>, request: Packet) {
        match self.entries.iter_mut().find(|e| e.edge == edge) {
            Some(entry) => entry.request = request,
            None => self.entries.push(EdgeEntry { edge, request }),
        }
    }

    /// Request observed to trigger `edge`
    pub fn request_for(&self, edge: &Edge<S>) -> Option<&Packet> {
        self.entries
            .iter()
            .find(|e| &e.edge == edge)
            .map(|e| &e.request)
    }

    pub fn entries(&self) -> &[EdgeEntry<S>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Minimal state-change attempt: resend the triggering request
///
/// Success means a response arrived and it was not negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub request: Packet,
    pub description: String,
    pub timeout: Duration,
}

impl Transition {
    pub fn new(request: Packet) -> Self {
        Self {
            description: request.to_string(),
            request,
            timeout: TRANSITION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send the request and report whether the transition succeeded
    ///
    /// Transport failures are logged and count as an unsuccessful transition.
    pub async fn execute<P>(&self, transport: &dyn ScanTransport, policy: &P) -> bool
    where
        P: NegativeResponsePolicy + ?Sized,
    {
        match transport
            .send_and_await(self.request.as_bytes(), self.timeout)
            .await
        {
            Ok(Some(response)) => {
                let response = Packet::from(response);
                let success = !policy.is_negative(&response);
                debug!(
                    request = %self.request,
                    response = %response,
                    success,
                    "Transition attempt answered"
                );
                success
            }
            Ok(None) => {
                debug!(request = %self.request, "Transition attempt got no answer");
                false
            }
            Err(e) => {
                error!(request = %self.request, error = %e, "Exception in transition function");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportError};
    use crate::uds::UdsNegativeResponsePolicy;

    #[tokio::test]
    async fn test_transition_success() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x03], &[0x50, 0x03, 0x00, 0x32, 0x01, 0xF4]);

        let transition = Transition::new(Packet::from([0x10, 0x03]));
        assert!(transition.execute(&transport, &UdsNegativeResponsePolicy).await);
        assert_eq!(transition.description, "10 03");
    }

    #[tokio::test]
    async fn test_transition_negative_or_silent_fails() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x02], &[0x7F, 0x10, 0x22]);

        let rejected = Transition::new(Packet::from([0x10, 0x02]));
        assert!(!rejected.execute(&transport, &UdsNegativeResponsePolicy).await);

        let silent = Transition::new(Packet::from([0x10, 0x60])).with_timeout(Duration::from_millis(10));
        assert!(!silent.execute(&transport, &UdsNegativeResponsePolicy).await);
    }

    #[tokio::test]
    async fn test_transition_transport_error_is_failure() {
        let transport = MockTransport::new();
        transport.fail_next(TransportError::SendFailed("bus off".into()));

        let transition = Transition::new(Packet::from([0x10, 0x03]));
        assert!(!transition.execute(&transport, &UdsNegativeResponsePolicy).await);
    }

    #[test]
    fn test_edge_record_replaces_request() {
        let mut record = EdgeRecord::new();
        record.insert(Edge::new(1, 3), Packet::from([0x10, 0x03]));
        record.insert(Edge::new(1, 2), Packet::from([0x10, 0x02]));
        record.insert(Edge::new(1, 3), Packet::from([0x10, 0x83]));

        assert_eq!(record.len(), 2);
        assert_eq!(
            record.request_for(&Edge::new(1, 3)),
            Some(&Packet::from([0x10, 0x83]))
        );
        assert_eq!(record.request_for(&Edge::new(3, 1)), None);
        assert_eq!(record.entries()[0].edge, Edge::new(1, 3));
    }

    #[test]
    fn test_edge_display() {
        assert_eq!(Edge::new(1, 3).to_string(), "1 -> 3");
    }
}
