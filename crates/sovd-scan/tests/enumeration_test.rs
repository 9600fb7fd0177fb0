//! End-to-end enumeration against a scripted ECU
//!
//! Run with: cargo test -p sovd-scan --test enumeration_test

use std::time::Duration;

use pretty_assertions::assert_eq;
use sovd_scan::uds::SessionState;
use sovd_scan::{
    EcuState, Edge, Enumerator, EnumeratorReport, EnumeratorSnapshot, ExecuteOptions,
    ExecutionOutcome, MockTransport, NegativeResponseBlacklist, Packet, PositiveLabel,
    ServiceEnumerator, StateGenerator, UdsCatalog, UdsStateModel,
};

const A: [u8; 3] = [0x22, 0xF1, 0x90];
const B: [u8; 3] = [0x22, 0xF1, 0x91];
const C: [u8; 3] = [0x22, 0xF1, 0x92];

fn did_scan() -> ServiceEnumerator<UdsCatalog, UdsStateModel> {
    ServiceEnumerator::new(UdsCatalog::ReadDataById, UdsStateModel)
}

fn options() -> ExecuteOptions {
    ExecuteOptions::default()
        .with_timeout(Duration::from_millis(20))
        .with_scan_range(0xF190, 0xF192)
}

type Exchange = (Vec<u8>, Option<Vec<u8>>);

fn exchanges(enumerator: &ServiceEnumerator<UdsCatalog, UdsStateModel>) -> Vec<Exchange> {
    enumerator
        .results()
        .iter()
        .map(|r| {
            (
                r.request.as_bytes().to_vec(),
                r.response.as_ref().map(|p| p.as_bytes().to_vec()),
            )
        })
        .collect()
}

// =============================================================================
// Busy retry scenario
// =============================================================================

#[tokio::test]
async fn test_busy_positive_timeout_scenario() {
    let transport = MockTransport::new();
    transport.add_response(&A, &[0x7F, 0x22, 0x21]);
    transport.add_response(&B, &[0x62, 0xF1, 0x91, 0x42]);
    // C is never answered

    let s1 = EcuState::default();
    let mut enumerator = did_scan();

    let first = enumerator.execute(&transport, &s1, &options()).await.unwrap();
    assert_eq!(first, ExecutionOutcome::Stopped);
    assert_eq!(enumerator.results().len(), 1);
    assert!(!enumerator.completed());

    let second = enumerator.execute(&transport, &s1, &options()).await.unwrap();
    assert_eq!(second, ExecutionOutcome::Completed);

    let busy = Some(vec![0x7F, 0x22, 0x21]);
    assert_eq!(
        exchanges(&enumerator),
        vec![
            (A.to_vec(), busy.clone()),
            (A.to_vec(), busy),
            (B.to_vec(), Some(vec![0x62, 0xF1, 0x91, 0x42])),
            (C.to_vec(), None),
        ]
    );
    assert!(enumerator.results().iter().all(|r| r.state == s1));
    assert!(enumerator.has_completed(&s1));
    assert!(enumerator.completed());

    // Both busy results share one interned request and one interned response
    let results = enumerator.results();
    assert!(results[0].request.ptr_eq(&results[1].request));
    assert_eq!(enumerator.store().packets().len(), 5);

    enumerator.prepare_blacklist();
    assert_eq!(enumerator.blacklist(), &NegativeResponseBlacklist::default());
}

#[tokio::test]
async fn test_result_store_only_grows() {
    let transport = MockTransport::new();
    transport.add_response(&A, &[0x7F, 0x22, 0x21]);

    let mut enumerator = did_scan();
    let state = EcuState::default();
    let mut previous = 0;
    for _ in 0..4 {
        enumerator.execute(&transport, &state, &options()).await.unwrap();
        assert!(enumerator.results().len() >= previous);
        previous = enumerator.results().len();
    }
    // A busy, A busy again, B and C time out; nothing left afterwards
    assert_eq!(previous, 4);
}

// =============================================================================
// State transitions
// =============================================================================

#[tokio::test]
async fn test_session_scan_learns_transitions() {
    let transport = MockTransport::new();
    transport.add_response(&[0x10, 0x01], &[0x50, 0x01, 0x00, 0x32, 0x01, 0xF4]);
    transport.add_response(&[0x10, 0x02], &[0x7F, 0x10, 0x22]);
    transport.add_response(&[0x10, 0x03], &[0x50, 0x03, 0x00, 0x32, 0x01, 0xF4]);

    let default = EcuState::default();
    let extended = EcuState::new(SessionState::Extended);
    let mut enumerator = ServiceEnumerator::new(UdsCatalog::SessionScan, UdsStateModel);
    let options = ExecuteOptions::default()
        .with_timeout(Duration::from_millis(10))
        .with_scan_range(0x01, 0x05);

    // Stops right after the ECU entered the extended session
    let outcome = enumerator.execute(&transport, &default, &options).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Stopped);
    let edge = enumerator.discover_edge().unwrap();
    assert_eq!(edge, Edge::new(default.clone(), extended.clone()));

    // The orchestrator moves the device along the edge
    let transition = enumerator.get_transition(&edge).unwrap();
    assert_eq!(transition.timeout, Duration::from_secs(20));
    assert!(transition.execute(&transport, enumerator.catalog()).await);

    // Resuming the default state continues after 10 03
    let outcome = enumerator.execute(&transport, &default, &options).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Completed);
    assert_eq!(enumerator.discover_edge(), None);
    assert!(enumerator.completed());

    let requests: Vec<Vec<u8>> = exchanges(&enumerator).into_iter().map(|(req, _)| req).collect();
    assert_eq!(
        requests,
        vec![
            vec![0x10, 0x01],
            vec![0x10, 0x02],
            vec![0x10, 0x03],
            vec![0x10, 0x04],
            vec![0x10, 0x05],
        ]
    );

    // A fresh state gets its own request stream
    let outcome = enumerator.execute(&transport, &extended, &options).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Stopped);
    assert!(!enumerator.completed());
    assert_eq!(
        enumerator.discover_edge(),
        Some(Edge::new(extended.clone(), default.clone()))
    );
}

// =============================================================================
// Reports and snapshots
// =============================================================================

#[tokio::test]
async fn test_report_after_restore() {
    let transport = MockTransport::new();
    transport.add_response(&A, &[0x62, 0xF1, 0x90, 0x57, 0x30]);
    transport.add_response(&B, &[0x7F, 0x22, 0x31]);

    let state = EcuState::default();
    let mut enumerator = did_scan();
    enumerator.execute(&transport, &state, &options()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("did-scan.json");
    enumerator.snapshot().save(&path).unwrap();

    let snapshot = EnumeratorSnapshot::load(&path).unwrap();
    let mut restored = ServiceEnumerator::restore(UdsCatalog::ReadDataById, UdsStateModel, snapshot);
    let report = EnumeratorReport::build(&mut restored, false, &PositiveLabel::from("PR: Supported"));

    assert_eq!(report.name, "UDS ReadDataByIdentifier Enumerator");
    assert!(report.completed);
    assert_eq!(report.num_requests, 3);
    assert_eq!(report.num_answered, 2);
    let labels: Vec<&str> = report.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["PR: Supported", "NR: RequestOutOfRange (0x31)", "Timeout"]);
    assert_eq!(report.negative_responses.len(), 1);
    assert_eq!(report.negative_responses[0].count, 1);
    assert_eq!(report.supported_responses.len(), 1);
    assert_eq!(report.supported_responses[0].response, "62f1905730");

    // Request iterators are not persisted, so the state is enumerated again
    let again = restored.execute(&transport, &state, &options()).await;
    assert!(again.is_ok());
    assert_eq!(restored.results().len(), 6);
    assert_eq!(restored.results()[3].request, Packet::from(A));
}
