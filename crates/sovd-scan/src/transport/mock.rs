//! Scripted mock transport for testing

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ScanTransport, TransportError};
use crate::config::MockConfig;
use crate::packet::Packet;

/// Scripted answer to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Response(Vec<u8>),
    NoResponse,
}

/// Mock transport with per-request reply queues
///
/// Each request maps to a queue of replies consumed in order; the last reply
/// repeats once the queue is down to one entry. Requests without a script
/// time out.
pub struct MockTransport {
    latency: Duration,
    closed: AtomicBool,
    close_after_next: AtomicBool,
    replies: Mutex<HashMap<Vec<u8>, VecDeque<MockReply>>>,
    failures: Mutex<VecDeque<TransportError>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            closed: AtomicBool::new(false),
            close_after_next: AtomicBool::new(false),
            replies: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Build a mock from configuration (hex request/response pairs)
    pub fn from_config(config: &MockConfig) -> Result<Self, TransportError> {
        let transport = Self::new().with_latency(Duration::from_millis(config.latency_ms));
        for entry in &config.responses {
            let request = Packet::from_hex(&entry.request).map_err(|e| {
                TransportError::InvalidConfig(format!("Invalid request '{}': {}", entry.request, e))
            })?;
            let response = Packet::from_hex(&entry.response).map_err(|e| {
                TransportError::InvalidConfig(format!(
                    "Invalid response '{}': {}",
                    entry.response, e
                ))
            })?;
            transport.add_response(request.as_bytes(), response.as_bytes());
        }
        Ok(transport)
    }

    /// Simulated latency for every exchange
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a response for a given request
    pub fn add_response(&self, request: &[u8], response: &[u8]) {
        self.push_reply(request, MockReply::Response(response.to_vec()));
    }

    /// Queue a timeout for a given request
    pub fn add_no_response(&self, request: &[u8]) {
        self.push_reply(request, MockReply::NoResponse);
    }

    /// Fail the next exchange with the given error
    pub fn fail_next(&self, error: TransportError) {
        self.failures.lock().push_back(error);
    }

    /// Close the transport right after the next exchange completes
    pub fn close_after_next_exchange(&self) {
        self.close_after_next.store(true, Ordering::SeqCst);
    }

    /// Set connection state
    pub fn set_closed(&self, closed: bool) {
        self.closed.store(closed, Ordering::SeqCst);
    }

    /// Every request sent so far, in order
    pub fn sent_requests(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    fn push_reply(&self, request: &[u8], reply: MockReply) {
        self.replies
            .lock()
            .entry(request.to_vec())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, request: &[u8]) -> MockReply {
        let mut replies = self.replies.lock();
        match replies.get_mut(request) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockReply::NoResponse),
            Some(queue) => queue.front().cloned().unwrap_or(MockReply::NoResponse),
            None => MockReply::NoResponse,
        }
    }
}

#[async_trait]
impl ScanTransport for MockTransport {
    async fn send_and_await(
        &self,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }

        self.sent.lock().push(request.to_vec());

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        // Simulate latency
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency.min(timeout)).await;
        }

        let reply = if self.latency > timeout {
            MockReply::NoResponse
        } else {
            self.next_reply(request)
        };

        if self.close_after_next.swap(false, Ordering::SeqCst) {
            self.closed.store(true, Ordering::SeqCst);
        }

        tracing::debug!(?request, ?reply, "Mock transport: exchange");
        match reply {
            MockReply::Response(data) => Ok(Some(data)),
            MockReply::NoResponse => Ok(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
