//! Service catalogs: protocol capability plus initial-request generation

use crate::config::RequestOptions;
use crate::packet::Packet;
use crate::policy::NegativeResponsePolicy;

/// Lazy, resumable sequence of encoded requests
pub type RequestIter = Box<dyn Iterator<Item = Packet> + Send>;

/// What a protocol-specific enumerator must provide
///
/// The iterator returned by [`initial_requests`](Self::initial_requests) is
/// created once per device state and drained across several `execute`
/// calls, so it must be pull-based.
pub trait ServiceCatalog: NegativeResponsePolicy {
    /// Name shown in reports
    fn name(&self) -> &str;

    /// Requests to send in a state that has not been enumerated before
    fn initial_requests(&self, options: &RequestOptions) -> RequestIter;
}
