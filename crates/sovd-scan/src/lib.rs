//! sovd-scan - Diagnostic service enumeration engine
//!
//! This crate drives request/response exchanges against a stateful
//! diagnostic endpoint (for example a UDS ECU), records which requests are
//! answered in which device state, filters noisy negative responses and learns
//! state transitions as a side effect.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ServiceEnumerator<C, M>                     │
//! │  Implements Enumerator + StateGenerator                     │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │RequestComp. │  │ ResultStore │  │ NegativeResponse    │ │
//! │  │(retry+iter) │  │ (interned)  │  │ Blacklist           │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │         │                │                                  │
//! │  ┌──────┴──────┐  ┌──────┴──────┐  ┌─────────────────────┐ │
//! │  │ServiceCatal.│  │ Statistics  │  │ EdgeRecord /        │ │
//! │  │ StateModel  │  │ Report      │  │ Transition          │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │                          │                                  │
//! │                 ┌────────┴────────┐                         │
//! │                 │ ScanTransport   │                         │
//! │                 │(SocketCAN/mock) │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod blacklist;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod edge;
pub mod enumerator;
pub mod error;
pub mod packet;
pub mod policy;
pub mod report;
pub mod snapshot;
pub mod state;
pub mod stats;
pub mod store;
pub mod transport;
pub mod uds;

pub use blacklist::NegativeResponseBlacklist;
pub use catalog::{RequestIter, ServiceCatalog};
pub use composer::{RequestComposer, RetryEntry};
pub use config::{ExecuteOptions, RequestOptions, ScanRange, TransportConfig};
pub use edge::{Edge, EdgeRecord, Transition};
pub use enumerator::{Enumerator, ExecutionOutcome, ServiceEnumerator, StateGenerator};
pub use error::{ConfigError, ScanError};
pub use packet::Packet;
pub use policy::{NegativeResponsePolicy, NrcClass};
pub use report::{EnumeratorReport, PositiveLabel};
pub use snapshot::EnumeratorSnapshot;
pub use state::StateModel;
pub use stats::{compute_statistics, StatisticsEntry};
pub use store::{ResultStore, ScanResult};
pub use transport::{create_transport, MockTransport, ScanTransport, TransportError};
pub use uds::{EcuState, UdsCatalog, UdsStateModel};
