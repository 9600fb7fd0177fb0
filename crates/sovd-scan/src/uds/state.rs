//! UDS device state: active diagnostic session and security level

use std::fmt;

use serde::{Deserialize, Serialize};

use super::service_id;
use crate::packet::Packet;
use crate::state::StateModel;

/// UDS session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Default session (0x01)
    #[default]
    Default,
    /// Programming session (0x02)
    Programming,
    /// Extended diagnostic session (0x03)
    Extended,
    /// Engineering/development session (0x60)
    Engineering,
    /// Any other (OEM-specific) session id
    Other(u8),
}

impl SessionState {
    pub fn from_id(id: u8) -> Self {
        match id {
            0x01 => Self::Default,
            0x02 => Self::Programming,
            0x03 => Self::Extended,
            0x60 => Self::Engineering,
            other => Self::Other(other),
        }
    }

    /// UDS session id
    pub fn id(&self) -> u8 {
        match self {
            Self::Default => 0x01,
            Self::Programming => 0x02,
            Self::Extended => 0x03,
            Self::Engineering => 0x60,
            Self::Other(id) => *id,
        }
    }
}

/// State of an ECU as seen by the enumerator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EcuState {
    pub session: SessionState,
    /// Unlocked security access level, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_level: Option<u8>,
}

impl EcuState {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            security_level: None,
        }
    }

    pub fn with_security_level(mut self, level: u8) -> Self {
        self.security_level = Some(level);
        self
    }
}

impl fmt::Display for EcuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session=0x{:02X}", self.session.id())?;
        if let Some(level) = self.security_level {
            write!(f, " security=0x{:02X}", level)?;
        }
        Ok(())
    }
}

/// Session control, security access and ECU reset move the ECU between states
#[derive(Debug, Clone, Copy, Default)]
pub struct UdsStateModel;

impl UdsStateModel {
    const SESSION_CONTROL_RESPONSE: u8 = service_id::DIAGNOSTIC_SESSION_CONTROL + 0x40;
    const ECU_RESET_RESPONSE: u8 = service_id::ECU_RESET + 0x40;
    const SECURITY_ACCESS_RESPONSE: u8 = service_id::SECURITY_ACCESS + 0x40;
}

impl StateModel for UdsStateModel {
    type State = EcuState;

    fn is_state_modifying(&self, response: &Packet) -> bool {
        match response.as_bytes() {
            [Self::SESSION_CONTROL_RESPONSE, _, ..] => true,
            [Self::ECU_RESET_RESPONSE, ..] => true,
            // Only the send-key answer (even sub-function) unlocks a level
            [Self::SECURITY_ACCESS_RESPONSE, sub_function, ..] => {
                *sub_function != 0 && sub_function % 2 == 0
            }
            _ => false,
        }
    }

    fn apply(&self, response: &Packet, _request: &Packet, prior: &EcuState) -> EcuState {
        match response.as_bytes() {
            [Self::SESSION_CONTROL_RESPONSE, session, ..] => {
                // A session change re-locks security access
                EcuState::new(SessionState::from_id(*session))
            }
            [Self::ECU_RESET_RESPONSE, ..] => EcuState::default(),
            [Self::SECURITY_ACCESS_RESPONSE, sub_function, ..]
                if *sub_function != 0 && sub_function % 2 == 0 =>
            {
                prior.clone().with_security_level(sub_function - 1)
            }
            _ => prior.clone(),
        }
    }
}
