//! SocketCAN transport using ISO-TP

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use socketcan::ExtendedId;
use socketcan_isotp::IsoTpSocket;

use crate::config::SocketCanConfig;
use crate::transport::{ScanTransport, TransportError};

/// Negative response service identifier
const NEGATIVE_RESPONSE: u8 = 0x7F;
/// requestCorrectlyReceived-ResponsePending; the final answer is still coming
const RESPONSE_PENDING: u8 = 0x78;
/// Upper bound on waiting after response-pending answers
const RESPONSE_PENDING_TIMEOUT: Duration = Duration::from_secs(30);

/// SocketCAN transport using ISO-TP for request/response exchanges
///
/// The transport reports itself closed once the CAN interface goes down.
pub struct SocketCanTransport {
    socket: Arc<Mutex<IsoTpSocket>>,
    closed: Arc<AtomicBool>,
}

/// How a received frame relates to the pending request
#[derive(Debug, PartialEq, Eq)]
enum Answer {
    /// Positive or negative answer to the request
    Final,
    /// Response pending; the final answer is still coming
    Pending,
    /// Negative response without a code
    Malformed,
    /// Frame belonging to some other exchange
    Unrelated,
}

impl SocketCanTransport {
    pub fn new(config: &SocketCanConfig) -> Result<Self, TransportError> {
        let tx_id = parse_can_id(&config.tx_id)?;
        let rx_id = parse_can_id(&config.rx_id)?;

        let mut socket = Self::create_socket(config, tx_id, rx_id)?;

        // Drain any stale data from the socket (from previous sessions/processes)
        Self::drain_socket(&mut socket);

        tracing::info!(
            interface = %config.interface,
            tx_id = format!("0x{:X}", tx_id),
            rx_id = format!("0x{:X}", rx_id),
            "Opened ISO-TP transport"
        );

        Ok(Self {
            socket: Arc::new(Mutex::new(socket)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Drain any pending data from the socket to clear stale messages
    fn drain_socket(socket: &mut IsoTpSocket) {
        while let Ok(data) = socket.read() {
            if data.is_empty() {
                break;
            }
            tracing::debug!(data = ?data, "Drained stale message from socket");
        }
    }

    fn create_socket(
        config: &SocketCanConfig,
        tx_id: u32,
        rx_id: u32,
    ) -> Result<IsoTpSocket, TransportError> {
        // Convert u32 to ExtendedId for 29-bit CAN IDs
        let ext_rx_id = ExtendedId::new(rx_id).ok_or_else(|| {
            TransportError::InvalidConfig(format!("Invalid extended CAN ID: 0x{:X}", rx_id))
        })?;
        let ext_tx_id = ExtendedId::new(tx_id).ok_or_else(|| {
            TransportError::InvalidConfig(format!("Invalid extended CAN ID: 0x{:X}", tx_id))
        })?;

        let socket = IsoTpSocket::open(&config.interface, ext_rx_id, ext_tx_id).map_err(|e| {
            TransportError::ConnectionFailed(format!("Failed to open ISO-TP socket: {}", e))
        })?;

        // Non-blocking so the exchange loop can enforce its own deadline
        socket.set_nonblocking(true).map_err(|e| {
            TransportError::InvalidConfig(format!("Failed to set non-blocking: {}", e))
        })?;

        Ok(socket)
    }
}

fn classify_answer(request_sid: u8, data: &[u8]) -> Answer {
    match data {
        [sid, ..] if *sid == request_sid.wrapping_add(0x40) => Answer::Final,
        [NEGATIVE_RESPONSE] | [NEGATIVE_RESPONSE, _] => Answer::Malformed,
        [NEGATIVE_RESPONSE, sid, RESPONSE_PENDING, ..] if *sid == request_sid => Answer::Pending,
        [NEGATIVE_RESPONSE, sid, ..] if *sid == request_sid => Answer::Final,
        _ => Answer::Unrelated,
    }
}

/// Mark the transport closed when the interface is gone
fn link_error(closed: &AtomicBool, e: &std::io::Error) {
    if e.kind() == std::io::ErrorKind::NetworkDown {
        tracing::error!(error = %e, "CAN interface down, closing transport");
        closed.store(true, Ordering::SeqCst);
    }
}

/// Blocking exchange: write the request and poll for the matching answer
fn exchange_blocking(
    socket: &Mutex<IsoTpSocket>,
    closed: &AtomicBool,
    request: &[u8],
    timeout: Duration,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut socket = socket.lock();

    socket.write(request).map_err(|e| {
        link_error(closed, &e);
        TransportError::SendFailed(e.to_string())
    })?;

    let request_sid = request.first().copied().unwrap_or(0);

    let started = Instant::now();
    let mut deadline = started + timeout;

    loop {
        if Instant::now() >= deadline {
            return Ok(None);
        }

        match socket.read() {
            Ok(data) if !data.is_empty() => {
                let data = data.to_vec();
                match classify_answer(request_sid, &data) {
                    Answer::Final => return Ok(Some(data)),
                    Answer::Pending => {
                        // ECU asked for more time; keep waiting for the final answer
                        let extended = Instant::now() + timeout;
                        deadline = extended.min(started + RESPONSE_PENDING_TIMEOUT);
                    }
                    Answer::Malformed => {
                        return Err(TransportError::MalformedResponse(format!(
                            "Negative response too short: {}",
                            hex::encode(&data)
                        )));
                    }
                    Answer::Unrelated => {
                        tracing::debug!(data = ?data, request_sid, "Ignoring non-matching response");
                    }
                }
            }
            Ok(_) => std::thread::sleep(Duration::from_millis(1)),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => {
                link_error(closed, &e);
                return Err(TransportError::ReceiveFailed(e.to_string()));
            }
        }
    }
}

#[async_trait]
impl ScanTransport for SocketCanTransport {
    async fn send_and_await(
        &self,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }

        let socket = self.socket.clone();
        let closed = self.closed.clone();
        let request = request.to_vec();

        tokio::task::spawn_blocking(move || exchange_blocking(&socket, &closed, &request, timeout))
            .await
            .map_err(|e| TransportError::ProtocolError(format!("Task join error: {}", e)))?
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Parse a CAN ID from string (supports hex with 0x prefix)
fn parse_can_id(s: &str) -> Result<u32, TransportError> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    u32::from_str_radix(digits, radix)
        .map_err(|e| TransportError::InvalidConfig(format!("Invalid CAN ID '{}': {}", s, e)))
}
