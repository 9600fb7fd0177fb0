//! Device-state model consumed by the engine

use std::fmt;
use std::hash::Hash;

use crate::packet::Packet;

/// Rules for recognizing and applying state-modifying responses
pub trait StateModel: Send + Sync {
    /// Device state; comparable, hashable and printable
    type State: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync;

    /// Whether the response may move the device into another state
    fn is_state_modifying(&self, response: &Packet) -> bool;

    /// State the device is in after `response` answered `request` in `prior`
    fn apply(&self, response: &Packet, request: &Packet, prior: &Self::State) -> Self::State;
}
