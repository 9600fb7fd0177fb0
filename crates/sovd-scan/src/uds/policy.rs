//! UDS negative-response policy

use super::{service_id, NegativeResponseCode};
use crate::packet::Packet;
use crate::policy::{NegativeResponsePolicy, NrcClass};

/// Negative responses start with 0x7F, followed by the rejected service id
/// and the NRC
#[derive(Debug, Clone, Copy, Default)]
pub struct UdsNegativeResponsePolicy;

impl NegativeResponsePolicy for UdsNegativeResponsePolicy {
    fn is_negative(&self, response: &Packet) -> bool {
        response.service() == Some(service_id::NEGATIVE_RESPONSE)
    }

    fn code_of(&self, response: &Packet) -> u8 {
        // Truncated negative responses are reported as generalReject
        response.as_bytes().get(2).copied().unwrap_or(0x10)
    }

    fn description_of(&self, code: u8) -> String {
        NegativeResponseCode::from(code).to_string()
    }

    fn label_of(&self, response: &Packet) -> String {
        let code = self.code_of(response);
        format!("NR: {} (0x{:02X})", self.description_of(code), code)
    }

    fn classify(&self, code: u8) -> NrcClass {
        NegativeResponseCode::from(code).class()
    }
}
