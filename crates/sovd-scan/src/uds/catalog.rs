//! Built-in UDS request catalogs

use serde::{Deserialize, Serialize};

use super::{service_id, standard_did, UdsNegativeResponsePolicy};
use crate::catalog::{RequestIter, ServiceCatalog};
use crate::config::{RequestOptions, ScanRange};
use crate::packet::Packet;
use crate::policy::{NegativeResponsePolicy, NrcClass};

/// What a UDS enumerator scans for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UdsCatalog {
    /// Single-byte requests for every request SID
    ServiceScan,
    /// DiagnosticSessionControl (0x10) with every session id
    SessionScan,
    /// ReadDataByIdentifier (0x22) over a DID range
    ReadDataById,
    /// ECUReset (0x11) with every reset type
    EcuReset,
}

impl UdsCatalog {
    /// Range enumerated when the options do not name one
    pub fn default_range(&self) -> ScanRange {
        match self {
            Self::ServiceScan => ScanRange::new(0x00, 0xFF),
            Self::SessionScan | Self::EcuReset => ScanRange::new(0x01, 0x7F),
            Self::ReadDataById => ScanRange::new(
                standard_did::IDENTIFICATION_FIRST as u32,
                standard_did::IDENTIFICATION_LAST as u32,
            ),
        }
    }

    /// Largest identifier the request encoding can carry
    fn max_id(&self) -> u32 {
        match self {
            Self::ReadDataById => u16::MAX as u32,
            _ => u8::MAX as u32,
        }
    }
}

impl NegativeResponsePolicy for UdsCatalog {
    fn is_negative(&self, response: &Packet) -> bool {
        UdsNegativeResponsePolicy.is_negative(response)
    }

    fn code_of(&self, response: &Packet) -> u8 {
        UdsNegativeResponsePolicy.code_of(response)
    }

    fn description_of(&self, code: u8) -> String {
        UdsNegativeResponsePolicy.description_of(code)
    }

    fn label_of(&self, response: &Packet) -> String {
        UdsNegativeResponsePolicy.label_of(response)
    }

    fn classify(&self, code: u8) -> NrcClass {
        UdsNegativeResponsePolicy.classify(code)
    }
}

impl ServiceCatalog for UdsCatalog {
    fn name(&self) -> &str {
        match self {
            Self::ServiceScan => "UDS Service Enumerator",
            Self::SessionScan => "UDS Session Enumerator",
            Self::ReadDataById => "UDS ReadDataByIdentifier Enumerator",
            Self::EcuReset => "UDS ECUReset Enumerator",
        }
    }

    fn initial_requests(&self, options: &RequestOptions) -> RequestIter {
        let range = options.scan_range.unwrap_or_else(|| self.default_range());
        let start = range.start.min(self.max_id());
        let end = range.end.min(self.max_id());
        let ids = start..=end;

        match *self {
            Self::ServiceScan => Box::new(
                ids.map(|sid| sid as u8)
                    .filter(|sid| sid & service_id::POSITIVE_RESPONSE_BIT == 0)
                    .map(|sid| Packet::from([sid])),
            ),
            Self::SessionScan => Box::new(
                ids.map(|id| Packet::from([service_id::DIAGNOSTIC_SESSION_CONTROL, id as u8])),
            ),
            Self::EcuReset => {
                Box::new(ids.map(|id| Packet::from([service_id::ECU_RESET, id as u8])))
            }
            Self::ReadDataById => Box::new(ids.map(|did| {
                let [hi, lo] = (did as u16).to_be_bytes();
                Packet::from([service_id::READ_DATA_BY_ID, hi, lo])
            })),
        }
    }
}
