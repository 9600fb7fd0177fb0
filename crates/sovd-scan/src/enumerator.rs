//! Service enumerator: execution loop and state-transition learning
//!
//! A [`ServiceEnumerator`] drains the request stream of one device state at a
//! time, records every exchange in its [`ResultStore`] and decides after each
//! exchange whether to keep going. Between `execute` calls the orchestrator
//! can ask for a discovered edge and for the transition that reproduces it.
//!
//! # Response evaluation
//!
//! After every exchange the first matching rule decides:
//!
//! 1. no answer: stop if `exit_if_no_answer_received`
//! 2. negative and `exit_scan_on_first_negative_response`: terminate the
//!    enumerator
//! 3. "service not supported" and `exit_if_service_not_supported`: mark the
//!    state completed and stop
//! 4. busy and `retry_if_busy_returncode`: schedule the request as retry and
//!    stop; a busy answer to the retry itself is accepted and the scan moves on
//! 5. state-modifying response that leads to a different state: stop
//! 6. otherwise continue

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::blacklist::NegativeResponseBlacklist;
use crate::catalog::ServiceCatalog;
use crate::composer::{NextRequest, RequestComposer, RetryEntry};
use crate::config::ExecuteOptions;
use crate::edge::{Edge, EdgeRecord, Transition};
use crate::error::ScanError;
use crate::packet::Packet;
use crate::policy::NrcClass;
use crate::report::PositiveLabel;
use crate::state::StateModel;
use crate::stats::{compute_statistics, StatisticsEntry};
use crate::store::{ResultStore, ScanResult};
use crate::transport::ScanTransport;

/// Why an `execute` call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The request stream of the state is exhausted
    Completed,
    /// Response evaluation asked to stop
    Stopped,
    /// The transport reported itself closed
    TransportClosed,
    /// The wall-clock budget ran out
    BudgetExhausted,
    /// The enumerator was terminated earlier; nothing was sent
    Terminated,
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::TransportClosed => "transport closed",
            Self::BudgetExhausted => "budget exhausted",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Occurrences of one negative-response code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegativeResponseDetail {
    pub code: u8,
    pub description: String,
    pub count: usize,
}

/// A distinct positive response and the states it was seen in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportedResponse<S> {
    pub response: Packet,
    pub states: Vec<S>,
}

// =============================================================================
// Traits
// =============================================================================

/// Per-state enumeration driven by an orchestrator
#[async_trait]
pub trait Enumerator: Send {
    type State;

    /// Name shown in reports
    fn name(&self) -> &str;

    /// Enumerate `state` until the stream ends, evaluation stops the run, the
    /// transport closes or the time budget runs out
    ///
    /// Transport failures are returned to the caller. A transient failure
    /// schedules the failed request as retry for the next call.
    async fn execute(
        &mut self,
        transport: &dyn ScanTransport,
        state: &Self::State,
        options: &ExecuteOptions,
    ) -> Result<ExecutionOutcome, ScanError>;

    /// Whether every state seen in the results has been completed
    fn completed(&self) -> bool;

    /// Whether `state` has been completed
    fn has_completed(&self, state: &Self::State) -> bool;

    /// All results in insertion order
    fn results(&self) -> &[ScanResult<Self::State>];
}

/// State-transition learning as a side effect of enumeration
pub trait StateGenerator {
    type State;

    /// Inspect the most recent result for a state change
    fn discover_edge(&mut self) -> Option<Edge<Self::State>>;

    /// Transition that moves the device along a discovered edge
    fn get_transition(&self, edge: &Edge<Self::State>) -> Result<Transition, ScanError>;
}

// =============================================================================
// ServiceEnumerator
// =============================================================================

/// Enumerator for one service catalog and one device-state model
pub struct ServiceEnumerator<C, M: StateModel> {
    catalog: C,
    model: M,
    store: ResultStore<M::State>,
    composer: RequestComposer<M::State>,
    /// Executed states in first-execution order and whether they completed
    state_completed: Vec<(M::State, bool)>,
    blacklist: NegativeResponseBlacklist,
    edges: EdgeRecord<M::State>,
    terminated: bool,
}

impl<C: ServiceCatalog, M: StateModel> std::fmt::Debug for ServiceEnumerator<C, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEnumerator")
            .field("name", &self.catalog.name())
            .field("results", &self.store.len())
            .field("states", &self.state_completed)
            .field("edges", &self.edges.len())
            .field("terminated", &self.terminated)
            .finish()
    }
}

impl<C: ServiceCatalog, M: StateModel> ServiceEnumerator<C, M> {
    pub fn new(catalog: C, model: M) -> Self {
        Self {
            catalog,
            model,
            store: ResultStore::new(),
            composer: RequestComposer::new(),
            state_completed: Vec::new(),
            blacklist: NegativeResponseBlacklist::default(),
            edges: EdgeRecord::new(),
            terminated: false,
        }
    }

    /// Replace the default blacklist seed
    pub fn with_blacklist_seed(mut self, seed: impl IntoIterator<Item = u8>) -> Self {
        self.blacklist = NegativeResponseBlacklist::with_seed(seed);
        self
    }

    /// Rebuild an enumerator from persisted parts; runtime caches start empty
    pub(crate) fn from_parts(
        catalog: C,
        model: M,
        store: ResultStore<M::State>,
        state_completed: Vec<(M::State, bool)>,
        blacklist: NegativeResponseBlacklist,
        edges: EdgeRecord<M::State>,
        terminated: bool,
    ) -> Self {
        Self {
            catalog,
            model,
            store,
            composer: RequestComposer::new(),
            state_completed,
            blacklist,
            edges,
            terminated,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn store(&self) -> &ResultStore<M::State> {
        &self.store
    }

    pub fn blacklist(&self) -> &NegativeResponseBlacklist {
        &self.blacklist
    }

    pub fn edges(&self) -> &EdgeRecord<M::State> {
        &self.edges
    }

    /// Terminated by `exit_scan_on_first_negative_response`
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// States `execute` was called with, in first-execution order, and
    /// whether they completed
    pub fn executed_states(&self) -> &[(M::State, bool)] {
        &self.state_completed
    }

    /// Install a retry for `state` unless one is already pending
    pub fn schedule_retry(&mut self, state: &M::State, entry: impl Into<RetryEntry>) -> bool {
        self.composer.schedule_retry(state, entry)
    }

    pub fn has_pending_retry(&self, state: &M::State) -> bool {
        self.composer.has_retry(state)
    }

    /// Results with a response whose negative code is not blacklisted
    pub fn filtered_results(&self) -> Vec<&ScanResult<M::State>> {
        self.store.filtered(&self.catalog, &self.blacklist)
    }

    /// Recompute the blacklist from all negative responses seen so far
    pub fn prepare_blacklist(&mut self) {
        let codes: Vec<u8> = self
            .store
            .with_negative_response(&self.catalog)
            .iter()
            .filter_map(|r| r.response.as_ref())
            .map(|resp| self.catalog.code_of(resp))
            .collect();
        self.blacklist.update(codes);
    }

    /// Statistics for all results and for every executed state
    pub fn statistics(&self) -> Vec<StatisticsEntry> {
        let states: Vec<M::State> = self
            .state_completed
            .iter()
            .map(|(state, _)| state.clone())
            .collect();
        compute_statistics(self.store.results(), &states, &self.catalog)
    }

    /// Negative-response codes with their occurrence counts, first seen first
    pub fn negative_response_details(&self) -> Vec<NegativeResponseDetail> {
        let mut details: Vec<NegativeResponseDetail> = Vec::new();
        for result in self.store.with_negative_response(&self.catalog) {
            let Some(response) = result.response.as_ref() else {
                continue;
            };
            let code = self.catalog.code_of(response);
            match details.iter_mut().find(|d| d.code == code) {
                Some(detail) => detail.count += 1,
                None => details.push(NegativeResponseDetail {
                    code,
                    description: self.catalog.description_of(code),
                    count: 1,
                }),
            }
        }
        details
    }

    /// Distinct positive responses with the states they were seen in
    pub fn supported_responses(&self) -> Vec<SupportedResponse<M::State>> {
        let mut supported: Vec<SupportedResponse<M::State>> = Vec::new();
        for result in self.store.with_positive_response(&self.catalog) {
            let Some(response) = result.response.as_ref() else {
                continue;
            };
            match supported.iter_mut().find(|s| &s.response == response) {
                Some(entry) => {
                    if !entry.states.contains(&result.state) {
                        entry.states.push(result.state.clone());
                    }
                }
                None => supported.push(SupportedResponse {
                    response: response.clone(),
                    states: vec![result.state.clone()],
                }),
            }
        }
        supported
    }

    /// Table label of a response
    pub fn label(&self, response: Option<&Packet>, positive: &PositiveLabel) -> String {
        match response {
            None => "Timeout".to_string(),
            Some(resp) if self.catalog.is_negative(resp) => self.catalog.label_of(resp),
            Some(resp) => positive.render(resp),
        }
    }

    fn mark_started(&mut self, state: &M::State) {
        if !self.state_completed.iter().any(|(s, _)| s == state) {
            self.state_completed.push((state.clone(), false));
        }
    }

    fn mark_completed(&mut self, state: &M::State) {
        match self.state_completed.iter_mut().find(|(s, _)| s == state) {
            Some((_, completed)) => *completed = true,
            None => self.state_completed.push((state.clone(), true)),
        }
    }

    /// Apply the response evaluation rules; `true` means stop
    fn evaluate_response(
        &mut self,
        state: &M::State,
        sent: &NextRequest,
        response: Option<&Packet>,
        options: &ExecuteOptions,
    ) -> bool {
        let Some(response) = response else {
            if options.exit_if_no_answer_received {
                debug!(state = %state, request = %sent.packet, "No answer received, stopping");
                return true;
            }
            return false;
        };

        let class = self
            .catalog
            .negative_code(response)
            .map(|code| (code, self.catalog.classify(code)));

        if let Some((code, class)) = class {
            if options.exit_scan_on_first_negative_response {
                debug!(
                    state = %state,
                    nrc = format!("0x{:02X}", code),
                    "Negative response, terminating enumerator"
                );
                self.terminated = true;
                return true;
            }

            if options.exit_if_service_not_supported && class == NrcClass::ServiceNotSupported {
                debug!(
                    state = %state,
                    nrc = format!("0x{:02X}", code),
                    "Service not supported, state completed"
                );
                self.mark_completed(state);
                return true;
            }

            if options.retry_if_busy_returncode && class == NrcClass::Busy {
                if sent.is_retry {
                    warn!(
                        state = %state,
                        request = %sent.packet,
                        "Retry of busy request answered busy again, continuing"
                    );
                    return false;
                }
                if self.composer.schedule_retry(state, sent.packet.clone()) {
                    debug!(state = %state, request = %sent.packet, "Device busy, retry scheduled");
                    return true;
                }
                return false;
            }
        }

        if self.model.is_state_modifying(response) {
            let new_state = self.model.apply(response, &sent.packet, state);
            if &new_state != state {
                debug!(
                    state = %state,
                    new_state = %new_state,
                    request = %sent.packet,
                    "State-modifying response, stopping"
                );
                return true;
            }
        }

        false
    }
}

#[async_trait]
impl<C, M> Enumerator for ServiceEnumerator<C, M>
where
    C: ServiceCatalog,
    M: StateModel,
{
    type State = M::State;

    fn name(&self) -> &str {
        self.catalog.name()
    }

    async fn execute(
        &mut self,
        transport: &dyn ScanTransport,
        state: &M::State,
        options: &ExecuteOptions,
    ) -> Result<ExecutionOutcome, ScanError> {
        if self.terminated {
            debug!(state = %state, "Enumerator terminated, nothing to execute");
            return Ok(ExecutionOutcome::Terminated);
        }

        self.mark_started(state);
        let started = Instant::now();

        loop {
            if transport.is_closed() {
                error!(state = %state, "Transport closed");
                return Ok(ExecutionOutcome::TransportClosed);
            }

            let catalog = &self.catalog;
            let Some(sent) = self
                .composer
                .next_request(state, || catalog.initial_requests(&options.request))
            else {
                break;
            };

            let request_timestamp = unix_time();
            let response = match transport
                .send_and_await(sent.packet.as_bytes(), options.timeout)
                .await
            {
                Ok(response) => response.map(Packet::from),
                Err(e) => {
                    if e.is_transient() {
                        if sent.is_retry {
                            error!(
                                state = %state,
                                request = %sent.packet,
                                error = %e,
                                "Transport failure during retry, request dropped"
                            );
                        } else if self.composer.schedule_retry(state, sent.packet.clone()) {
                            debug!(
                                state = %state,
                                request = %sent.packet,
                                error = %e,
                                "Transport failure, retry scheduled"
                            );
                        }
                    }
                    return Err(e.into());
                }
            };
            let response_timestamp = response.as_ref().map(|_| unix_time());

            if transport.is_closed() {
                error!(state = %state, request = %sent.packet, "Transport closed during exchange");
                self.composer.requeue_front(state, sent.packet);
                return Ok(ExecutionOutcome::TransportClosed);
            }

            self.store.record(
                state.clone(),
                &sent.packet,
                response.as_ref(),
                request_timestamp,
                response_timestamp,
            );

            if self.evaluate_response(state, &sent, response.as_ref(), options) {
                return Ok(ExecutionOutcome::Stopped);
            }

            if started.elapsed() > options.execution_time {
                debug!(
                    state = %state,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Execution time exceeded"
                );
                return Ok(ExecutionOutcome::BudgetExhausted);
            }
        }

        info!(state = %state, name = self.catalog.name(), "Finished iterator execution");
        self.mark_completed(state);
        Ok(ExecutionOutcome::Completed)
    }

    fn completed(&self) -> bool {
        if self.terminated {
            return true;
        }
        let states = self.store.scanned_states();
        if states.is_empty() {
            // Nothing answered or timed out yet: every executed state must be done
            return !self.state_completed.is_empty()
                && self.state_completed.iter().all(|(_, completed)| *completed);
        }
        states.into_iter().all(|state| self.has_completed(state))
    }

    fn has_completed(&self, state: &M::State) -> bool {
        self.state_completed
            .iter()
            .any(|(s, completed)| s == state && *completed)
    }

    fn results(&self) -> &[ScanResult<M::State>] {
        self.store.results()
    }
}

impl<C, M> StateGenerator for ServiceEnumerator<C, M>
where
    C: ServiceCatalog,
    M: StateModel,
{
    type State = M::State;

    fn discover_edge(&mut self) -> Option<Edge<M::State>> {
        let last = self.store.last()?;
        let response = last.response.as_ref()?;
        if !self.model.is_state_modifying(response) {
            return None;
        }

        let new_state = self.model.apply(response, &last.request, &last.state);
        if new_state == last.state {
            return None;
        }

        let edge = Edge::new(last.state.clone(), new_state);
        let request = last.request.clone();
        info!(edge = %edge, request = %request, "Discovered state transition");
        self.edges.insert(edge.clone(), request);
        Some(edge)
    }

    fn get_transition(&self, edge: &Edge<M::State>) -> Result<Transition, ScanError> {
        self.edges
            .request_for(edge)
            .map(|request| Transition::new(request.clone()))
            .ok_or_else(|| ScanError::UnknownEdge(edge.to_string()))
    }
}

/// Seconds since the Unix epoch with microsecond resolution
fn unix_time() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::RequestIter;
    use crate::config::RequestOptions;
    use crate::policy::NegativeResponsePolicy;
    use crate::transport::{MockTransport, TransportError};
    use crate::uds::{EcuState, SessionState, UdsNegativeResponsePolicy, UdsStateModel};

    /// Catalog with a fixed request list
    struct FixedCatalog(Vec<Packet>);

    impl NegativeResponsePolicy for FixedCatalog {
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

    impl ServiceCatalog for FixedCatalog {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn initial_requests(&self, _options: &RequestOptions) -> RequestIter {
            Box::new(self.0.clone().into_iter())
        }
    }

    const A: [u8; 3] = [0x22, 0xF1, 0x90];
    const B: [u8; 3] = [0x22, 0xF1, 0x91];
    const C: [u8; 3] = [0x22, 0xF1, 0x92];

    fn enumerator(requests: &[&[u8]]) -> ServiceEnumerator<FixedCatalog, UdsStateModel> {
        let packets = requests.iter().map(|r| Packet::from(*r)).collect();
        ServiceEnumerator::new(FixedCatalog(packets), UdsStateModel)
    }

    fn options() -> ExecuteOptions {
        ExecuteOptions::default().with_timeout(Duration::from_millis(20))
    }

    fn default_state() -> EcuState {
        EcuState::default()
    }

    fn sent(results: &[ScanResult<EcuState>]) -> Vec<Vec<u8>> {
        results.iter().map(|r| r.request.as_bytes().to_vec()).collect()
    }

    #[tokio::test]
    async fn test_busy_retry_does_not_loop() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x21]);
        transport.add_response(&B, &[0x62, 0xF1, 0x91, 0x01]);
        let mut e = enumerator(&[&A, &B]);
        let state = default_state();

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert!(e.has_pending_retry(&state));
        assert!(!e.has_completed(&state));

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(sent(e.results()), vec![A.to_vec(), A.to_vec(), B.to_vec()]);
        assert!(!e.has_pending_retry(&state));
        assert!(e.completed());
    }

    #[tokio::test]
    async fn test_busy_retry_disabled_continues() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x21]);
        let mut e = enumerator(&[&A, &B]);
        let mut opts = options();
        opts.retry_if_busy_returncode = false;

        let outcome = e.execute(&transport, &default_state(), &opts).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(e.results().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failure_schedules_one_retry() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x62, 0xF1, 0x90, 0x00]);
        let mut e = enumerator(&[&A, &B]);
        let state = default_state();

        transport.fail_next(TransportError::ReceiveFailed("bus off".into()));
        let err = e.execute(&transport, &state, &options()).await.unwrap_err();
        assert!(matches!(err, ScanError::Transport(TransportError::ReceiveFailed(_))));
        assert!(e.has_pending_retry(&state));
        assert!(e.results().is_empty());

        // The retry fails again: propagated and not rescheduled
        transport.fail_next(TransportError::SendFailed("bus off".into()));
        assert!(e.execute(&transport, &state, &options()).await.is_err());
        assert!(!e.has_pending_retry(&state));

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(sent(e.results()), vec![B.to_vec()]);
    }

    #[tokio::test]
    async fn test_non_transient_failure_schedules_nothing() {
        let transport = MockTransport::new();
        let mut e = enumerator(&[&A]);
        let state = default_state();

        transport.fail_next(TransportError::ConnectionFailed("refused".into()));
        assert!(e.execute(&transport, &state, &options()).await.is_err());
        assert!(!e.has_pending_retry(&state));
    }

    #[tokio::test]
    async fn test_transport_closed_mid_scan() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x62, 0xF1, 0x90, 0x00]);
        let mut e = enumerator(&[&A, &B, &C]);
        let state = default_state();

        transport.close_after_next_exchange();
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::TransportClosed);
        assert!(e.results().is_empty());
        assert!(!e.has_completed(&state));
        assert_eq!(e.composer.pending_retry(&state), vec![Packet::from(A)]);

        transport.set_closed(false);
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(sent(e.results()), vec![A.to_vec(), B.to_vec(), C.to_vec()]);
    }

    #[tokio::test]
    async fn test_transport_closed_during_sequence_retry_keeps_request() {
        let transport = MockTransport::new();
        let first = [0x22, 0x01];
        let second = [0x22, 0x02];
        let fresh = [0x22, 0x03];
        let mut e = enumerator(&[&fresh]);
        let state = default_state();
        let sequence = RetryEntry::Sequence(vec![Packet::from(first), Packet::from(second)]);
        assert!(e.schedule_retry(&state, sequence));

        transport.close_after_next_exchange();
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::TransportClosed);
        assert_eq!(
            e.composer.pending_retry(&state),
            vec![Packet::from(first), Packet::from(second)]
        );

        transport.set_closed(false);
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(
            sent(e.results()),
            vec![first.to_vec(), second.to_vec(), fresh.to_vec()]
        );
    }

    #[tokio::test]
    async fn test_busy_after_successful_retry_gets_own_retry() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x21]);
        transport.add_response(&A, &[0x62, 0xF1, 0x90, 0x00]);
        transport.add_response(&B, &[0x7F, 0x22, 0x21]);
        let mut e = enumerator(&[&A, &B, &C]);
        let state = default_state();

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert_eq!(e.composer.pending_retry(&state), vec![Packet::from(A)]);

        // A is answered on retry, then B is busy on its first attempt
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert_eq!(sent(e.results()), vec![A.to_vec(), A.to_vec(), B.to_vec()]);
        assert_eq!(e.composer.pending_retry(&state), vec![Packet::from(B)]);
        assert!(!e.has_completed(&state));

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(
            sent(e.results()),
            vec![A.to_vec(), A.to_vec(), B.to_vec(), B.to_vec(), C.to_vec()]
        );
    }

    #[tokio::test]
    async fn test_budget_exhausted_resumes_later() {
        let transport = MockTransport::new().with_latency(Duration::from_millis(2));
        let mut e = enumerator(&[&A, &B]);
        let state = default_state();
        let opts = options().with_execution_time(Duration::ZERO);

        let outcome = e.execute(&transport, &state, &opts).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::BudgetExhausted);
        assert_eq!(e.results().len(), 1);
        assert!(!e.completed());

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert_eq!(sent(e.results()), vec![A.to_vec(), B.to_vec()]);
    }

    #[tokio::test]
    async fn test_exit_if_no_answer_received() {
        let transport = MockTransport::new();
        let mut e = enumerator(&[&A, &B]);
        let mut opts = options();
        opts.exit_if_no_answer_received = true;

        let outcome = e.execute(&transport, &default_state(), &opts).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert_eq!(e.results().len(), 1);
        assert_eq!(e.results()[0].response, None);
    }

    #[tokio::test]
    async fn test_service_not_supported_completes_state() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x7F]);
        let mut e = enumerator(&[&A, &B]);
        let state = default_state();
        let mut opts = options();
        opts.exit_if_service_not_supported = true;

        let outcome = e.execute(&transport, &state, &opts).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert!(e.has_completed(&state));
        assert!(e.completed());
        assert_eq!(e.results().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_on_first_negative_terminates() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x31]);
        let mut e = enumerator(&[&A, &B]);
        let state = default_state();
        let mut opts = options();
        opts.exit_scan_on_first_negative_response = true;

        assert_eq!(
            e.execute(&transport, &state, &opts).await.unwrap(),
            ExecutionOutcome::Stopped
        );
        assert!(e.is_terminated());
        assert!(e.completed());

        let other = EcuState::new(SessionState::Extended);
        assert_eq!(
            e.execute(&transport, &other, &opts).await.unwrap(),
            ExecutionOutcome::Terminated
        );
        assert_eq!(transport.sent_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_state_change_stops_and_edge_is_discovered() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x01], &[0x50, 0x01, 0x00, 0x32, 0x01, 0xF4]);
        transport.add_response(&[0x10, 0x03], &[0x50, 0x03, 0x00, 0x32, 0x01, 0xF4]);
        let mut e = enumerator(&[&[0x10, 0x01], &[0x10, 0x03], &[0x10, 0x02]]);
        let state = default_state();

        // Switching to the session the ECU is already in is not a new state
        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Stopped);
        assert_eq!(e.results().len(), 2);

        let edge = e.discover_edge().unwrap();
        let extended = EcuState::new(SessionState::Extended);
        assert_eq!(edge, Edge::new(state.clone(), extended.clone()));

        let transition = e.get_transition(&edge).unwrap();
        assert_eq!(transition.request, Packet::from([0x10, 0x03]));
        assert_eq!(transition.description, "10 03");

        let unknown = Edge::new(extended, state);
        assert!(matches!(e.get_transition(&unknown), Err(ScanError::UnknownEdge(_))));
    }

    #[tokio::test]
    async fn test_no_edge_without_state_change() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x01], &[0x50, 0x01]);
        let mut e = enumerator(&[&[0x10, 0x01]]);
        assert_eq!(e.discover_edge(), None);

        e.execute(&transport, &default_state(), &options()).await.unwrap();
        assert_eq!(e.discover_edge(), None);
        assert!(e.edges().is_empty());
    }

    #[tokio::test]
    async fn test_empty_generator_completes_without_exchanges() {
        let transport = MockTransport::new();
        let mut e = enumerator(&[]);
        let state = default_state();
        assert!(!e.completed());

        let outcome = e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert!(transport.sent_requests().is_empty());
        assert!(e.has_completed(&state));
        assert!(e.completed());
    }

    #[tokio::test]
    async fn test_not_completed_while_an_executed_state_is_open() {
        let transport = MockTransport::new();
        let mut e = enumerator(&[]);
        let first = default_state();
        let second = EcuState::new(SessionState::Extended);

        let outcome = e.execute(&transport, &first, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed);
        assert!(e.completed());

        transport.set_closed(true);
        let outcome = e.execute(&transport, &second, &options()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::TransportClosed);
        assert!(e.results().is_empty());
        assert!(!e.has_completed(&second));
        assert!(!e.completed());
    }

    #[tokio::test]
    async fn test_sequence_retry_drawn_before_fresh_requests() {
        let transport = MockTransport::new();
        let mut e = enumerator(&[&C]);
        let state = default_state();
        let sequence = RetryEntry::Sequence(vec![Packet::from(A), Packet::from(B)]);
        assert!(e.schedule_retry(&state, sequence));

        e.execute(&transport, &state, &options()).await.unwrap();
        assert_eq!(sent(e.results()), vec![A.to_vec(), B.to_vec(), C.to_vec()]);
    }

    #[tokio::test]
    async fn test_details_supported_responses_and_labels() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x7F, 0x22, 0x31]);
        transport.add_response(&B, &[0x62, 0xF1, 0x91, 0x01]);
        transport.add_response(&C, &[0x7F, 0x22, 0x31]);
        let mut e = enumerator(&[&A, &B, &C]);
        let state = default_state();
        e.execute(&transport, &state, &options()).await.unwrap();

        assert_eq!(
            e.negative_response_details(),
            vec![NegativeResponseDetail {
                code: 0x31,
                description: "RequestOutOfRange".to_string(),
                count: 2,
            }]
        );

        let supported = e.supported_responses();
        assert_eq!(supported.len(), 1);
        assert_eq!(supported[0].response, Packet::from([0x62, 0xF1, 0x91, 0x01]));
        assert_eq!(supported[0].states, vec![state]);

        let positive = PositiveLabel::default();
        let results = e.results();
        assert_eq!(
            e.label(results[0].response.as_ref(), &positive),
            "NR: RequestOutOfRange (0x31)"
        );
        assert_eq!(e.label(results[1].response.as_ref(), &positive), "PR: PositiveResponse");
        assert_eq!(e.label(None, &positive), "Timeout");
    }

    #[tokio::test]
    async fn test_statistics_cover_executed_states() {
        let transport = MockTransport::new();
        transport.add_response(&A, &[0x62, 0xF1, 0x90, 0x00]);
        let mut e = enumerator(&[&A, &B]);
        e.execute(&transport, &default_state(), &options()).await.unwrap();

        let stats = e.statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].label, "all");
        assert_eq!(stats[1].label, "session=0x01");
        assert_eq!(stats[1].num_answered, 1);
        assert_eq!(stats[1].num_unanswered, 1);
    }
}
