//! Transport trait used by the enumeration engine

use std::time::Duration;

use async_trait::async_trait;

use super::TransportError;

/// Send-one-receive-one interface to a device under test
///
/// This trait abstracts the underlying transport mechanism (SocketCAN,
/// scripted mock, ...). The engine performs exactly one exchange at a time;
/// mutual exclusion over a transport shared by several enumerators is the
/// implementation's concern.
#[async_trait]
pub trait ScanTransport: Send + Sync {
    /// Send a request and wait for at most one response
    ///
    /// # Arguments
    /// * `request` - The raw request bytes
    /// * `timeout` - Maximum time to wait for a response
    ///
    /// # Returns
    /// `Ok(Some(bytes))` for a response, `Ok(None)` if nothing arrived within
    /// `timeout`, or a classified transport failure
    async fn send_and_await(
        &self,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Whether the transport has been closed; polled after each exchange
    fn is_closed(&self) -> bool;
}
