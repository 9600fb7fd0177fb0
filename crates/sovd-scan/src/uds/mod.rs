//! UDS (Unified Diagnostic Services) binding of the enumeration engine
//!
//! Provides the negative-response policy, request catalogs and the
//! session/security state model for ISO 14229 devices.

mod catalog;
mod nrc;
mod policy;
mod state;

pub use catalog::UdsCatalog;
pub use nrc::NegativeResponseCode;
pub use policy::UdsNegativeResponsePolicy;
pub use state::{EcuState, SessionState, UdsStateModel};

/// Standard UDS service ID constants
pub mod service_id {
    pub const DIAGNOSTIC_SESSION_CONTROL: u8 = 0x10;
    pub const ECU_RESET: u8 = 0x11;
    pub const READ_DATA_BY_ID: u8 = 0x22;
    pub const SECURITY_ACCESS: u8 = 0x27;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;

    /// Bit set in every positive response SID
    pub const POSITIVE_RESPONSE_BIT: u8 = 0x40;
}

/// Identification DID block (ISO 14229-1 Annex C)
pub mod standard_did {
    /// First and last DID of the identification block
    pub const IDENTIFICATION_FIRST: u16 = 0xF100;
    pub const IDENTIFICATION_LAST: u16 = 0xF1FF;
}
