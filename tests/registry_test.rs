use multibrain::*;

#[test]
fn test_registry_new() {
    let registry = RunRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.list().is_empty());
}

#[test]
fn test_register_and_get() {
    let registry = RunRegistry::new();
    let request = AnalysisRequest::with_correlation_id("disk full on db01", "run-1");

    let run = registry.register(&request);
    assert_eq!(run.correlation_id, "run-1");
    assert_eq!(run.phase(), AnalysisPhase::Pending);

    let summary = registry.get("run-1").unwrap();
    assert_eq!(summary.request_text, "disk full on db01");
    assert_eq!(summary.phase, AnalysisPhase::Pending);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_phase_is_visible_through_registry() {
    let registry = RunRegistry::new();
    let run = registry.register(&AnalysisRequest::with_correlation_id("x", "run-1"));

    run.set_phase(AnalysisPhase::SmeConsultation);

    assert_eq!(registry.get("run-1").unwrap().phase, AnalysisPhase::SmeConsultation);
}

#[test]
fn test_cancel_marks_and_removes() {
    let registry = RunRegistry::new();
    let run = registry.register(&AnalysisRequest::with_correlation_id("x", "run-1"));

    assert!(registry.cancel("run-1"));
    assert!(run.is_cancelled());
    assert!(registry.get("run-1").is_none());
    assert!(!registry.cancel("run-1"));
}

#[test]
fn test_complete_removes_run() {
    let registry = RunRegistry::new();
    let run = registry.register(&AnalysisRequest::with_correlation_id("x", "run-1"));

    registry.complete(&run);

    assert!(registry.is_empty());
    assert!(!run.is_cancelled());
}

#[test]
fn test_complete_after_cancel_is_noop() {
    let registry = RunRegistry::new();
    let run = registry.register(&AnalysisRequest::with_correlation_id("x", "run-1"));

    registry.cancel("run-1");
    registry.complete(&run);

    assert!(registry.is_empty());
}

#[test]
fn test_complete_does_not_remove_newer_run() {
    let registry = RunRegistry::new();
    let first = registry.register(&AnalysisRequest::with_correlation_id("first", "run-1"));
    let _second = registry.register(&AnalysisRequest::with_correlation_id("second", "run-1"));

    registry.complete(&first);

    assert_eq!(registry.get("run-1").unwrap().request_text, "second");
}

#[test]
fn test_list_is_sorted_by_start() {
    let registry = RunRegistry::new();
    registry.register(&AnalysisRequest::with_correlation_id("a", "run-a"));
    std::thread::sleep(std::time::Duration::from_millis(2));
    registry.register(&AnalysisRequest::with_correlation_id("b", "run-b"));

    let runs = registry.list();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].correlation_id, "run-a");
    assert_eq!(runs[1].correlation_id, "run-b");
}

#[test]
fn test_clones_share_state() {
    let registry = RunRegistry::new();
    let clone = registry.clone();
    registry.register(&AnalysisRequest::with_correlation_id("x", "run-1"));

    assert!(clone.cancel("run-1"));
    assert!(registry.is_empty());
}

#[test]
fn test_guard_deregisters_on_drop() {
    let registry = RunRegistry::new();
    let guard = registry.track(&AnalysisRequest::with_correlation_id("x", "run-1"));
    assert_eq!(guard.run().correlation_id, "run-1");
    assert!(registry.get("run-1").is_some());

    drop(guard);
    assert!(registry.is_empty());
}

#[test]
fn test_guard_leaves_replacement_registered() {
    let registry = RunRegistry::new();
    let request = AnalysisRequest::with_correlation_id("x", "run-1");
    let first = registry.track(&request);
    let _second = registry.track(&request);

    drop(first);
    assert_eq!(registry.len(), 1);
}
