//! Negative-response classification
//!
//! Each protocol decides what a negative response looks like, how to extract
//! its reason code and what the code means to the enumeration engine.

use crate::packet::Packet;

/// Meaning of a negative-response code for the response evaluation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NrcClass {
    /// The request's service is not supported (at all, or in this state)
    ServiceNotSupported,
    /// The device is busy and asks for the request to be repeated
    Busy,
    /// Any other rejection reason
    Other,
}

/// Protocol-specific negative-response policy
pub trait NegativeResponsePolicy: Send + Sync {
    /// Whether the response is a negative response
    fn is_negative(&self, response: &Packet) -> bool;

    /// Reason code carried by a negative response
    fn code_of(&self, response: &Packet) -> u8;

    /// Human-readable description of a reason code
    fn description_of(&self, code: u8) -> String;

    /// Short label for a negative response, used in result tables
    fn label_of(&self, response: &Packet) -> String {
        let code = self.code_of(response);
        format!("NR: {}", self.description_of(code))
    }

    /// Classify a reason code
    fn classify(&self, code: u8) -> NrcClass;

    /// Reason code of `response` if it is negative
    fn negative_code(&self, response: &Packet) -> Option<u8> {
        self.is_negative(response).then(|| self.code_of(response))
    }
}
