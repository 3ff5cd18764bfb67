//! Contract tests for the provider implementations and the save workflow.

use std::sync::Arc;
use std::time::Duration;

use failsift_domain::{
    BugSuggestion, BugSuggestions, ErrorData, FailureLine, LineId, LineVerification, Matcher,
    MatcherId, SuggestionId,
};
use failsift_panel::{
    AutoclassifyPanel, AutoclassifyStatus, ErrorLineProvider, JobContext, JsonFileProvider,
    MemoryProvider, PanelCommand, PanelEvent, ProviderError, SingleFlightFetcher,
};

fn sample_line(id: u64) -> FailureLine {
    FailureLine {
        id: LineId(id),
        bug_suggestions: BugSuggestions {
            search: "TEST-UNEXPECTED-FAIL /a/b/foo.js line 10".to_string(),
            open_recent: vec![BugSuggestion {
                id: SuggestionId(id * 10),
                bug_number: 9000 + id,
                summary: "foo.js line 10 fail".to_string(),
                resolution: None,
            }],
            all_others: vec![],
        },
        classified_failures: vec![],
        matches: vec![],
        best_classification: None,
        best_is_verified: false,
    }
}

fn sample_data() -> ErrorData {
    ErrorData {
        matchers: vec![Matcher {
            id: MatcherId(1),
            name: "PreciseTestMatcher".to_string(),
        }],
        error_lines: vec![sample_line(1), sample_line(2)],
    }
}

#[tokio::test]
async fn memory_provider_fetch_round_trip() {
    let provider = MemoryProvider::new();
    provider.insert_job(7, sample_data());

    let data = provider.fetch(7).await.unwrap();
    assert_eq!(data.error_lines.len(), 2);

    let err = provider.fetch(8).await.unwrap_err();
    assert!(matches!(err, ProviderError::Fetch(_)));
}

#[tokio::test]
async fn memory_provider_verify_marks_lines() {
    let provider = MemoryProvider::new();
    provider.insert_job(7, sample_data());

    // a manual bug number creates a classified failure backed by the
    // manual matcher and verifies the line
    let updated = provider
        .verify(vec![LineVerification {
            line_id: LineId(1),
            best_classification: None,
            bug_number: Some(4242),
        }])
        .await
        .unwrap();

    assert_eq!(updated.len(), 1);
    let line = &updated[0];
    assert!(line.best_is_verified);
    let best = line.best_classified_failure().unwrap().unwrap();
    assert_eq!(best.bug_number, Some(4242));
    assert!(!line.matches.is_empty());

    // an ignore save verifies with no best classification
    let updated = provider
        .verify(vec![LineVerification {
            line_id: LineId(2),
            best_classification: None,
            bug_number: Some(0),
        }])
        .await
        .unwrap();
    assert!(updated[0].best_is_verified);
    assert!(updated[0].best_classification.is_none());
}

#[tokio::test]
async fn single_flight_fetch_aborts_previous() {
    let provider = Arc::new(
        MemoryProvider::new().with_delay(Duration::from_millis(50)),
    );
    provider.insert_job(7, sample_data());

    let mut fetcher = SingleFlightFetcher::new(provider);
    let first = fetcher.start(7);
    let second = fetcher.start(7);

    let (first, second) = tokio::join!(first, second);
    assert!(matches!(first, Err(ProviderError::Aborted)));
    assert!(second.is_ok());
}

#[tokio::test]
async fn json_file_provider_reads_error_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("error-data.json");
    tokio::fs::write(&path, serde_json::to_string(&sample_data()).unwrap())
        .await
        .unwrap();

    let provider = JsonFileProvider::new(&path);
    let data = provider.fetch(0).await.unwrap();
    assert_eq!(data, sample_data());

    // saving through the file provider is rejected
    let err = provider.verify(vec![]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Save(_)));

    // malformed files surface as decode errors
    tokio::fs::write(&path, "{not json").await.unwrap();
    let err = provider.fetch(0).await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)));
}

#[tokio::test]
async fn save_round_trip_reranks_returned_lines() {
    let provider = MemoryProvider::new();
    provider.insert_job(7, sample_data());

    let mut panel = AutoclassifyPanel::new(true);
    panel.set_job(JobContext {
        job_id: 7,
        has_logs: true,
        logs_parsed: true,
        log_parsing_failed: false,
        autoclassify_status: AutoclassifyStatus::Autoclassified,
    });
    assert!(panel.begin_build());

    let data = provider.fetch(7).await.unwrap();
    panel.load(data).unwrap();

    // save the preselected line (its default is the bug suggestion)
    let events = panel.handle(PanelCommand::Save);
    let payload = match &events[0].event {
        PanelEvent::SaveRequested { payload } => payload.clone(),
        other => panic!("unexpected event {other:?}"),
    };

    let saved = provider.verify(payload).await.unwrap();
    panel.apply_saved(saved).unwrap();

    // the saved line is verified and no longer pending
    let verified = panel.line(LineId(2)).unwrap();
    assert!(verified.verified());
    assert_eq!(panel.pending_lines().len(), 1);

    // its re-ranked options now lead with the verified best
    let best = verified.ranked().best().unwrap();
    assert!(best.is_best);
    assert_eq!(&verified.ranked().options[0].id, &best.id);
}
