//! Transport layer for enumeration exchanges
//!
//! This module provides transports for talking to a device under test:
//! - SocketCAN adapter for CAN/ISO-TP (Linux only)
//! - Scripted mock transport for testing and dry runs
//!
//! # Example
//!
//! ```ignore
//! use sovd_scan::transport::{create_transport, ScanTransport};
//! use sovd_scan::config::TransportConfig;
//!
//! let config = TransportConfig::Mock(Default::default());
//! let transport = create_transport(&config).await?;
//! let response = transport.send_and_await(&[0x22, 0xF1, 0x90], Duration::from_secs(1)).await?;
//! ```

mod adapter;
pub mod error;
pub mod mock;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use adapter::ScanTransport;
pub use error::TransportError;
pub use mock::MockTransport;

use std::sync::Arc;

use crate::config::TransportConfig;

/// Create a transport based on configuration
pub async fn create_transport(
    config: &TransportConfig,
) -> Result<Arc<dyn ScanTransport>, TransportError> {
    match config {
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        TransportConfig::SocketCan(cfg) => {
            let adapter = socketcan::SocketCanTransport::new(cfg)?;
            Ok(Arc::new(adapter))
        }
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        TransportConfig::SocketCan(_) => Err(TransportError::Unsupported(
            "SocketCAN requires Linux and the 'socketcan' feature".to_string(),
        )),
        TransportConfig::Mock(cfg) => {
            let adapter = MockTransport::from_config(cfg)?;
            Ok(Arc::new(adapter))
        }
    }
}
