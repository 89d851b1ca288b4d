use multibrain::*;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = ServiceConfig::default();
    assert_eq!(config.listen_addr(), "127.0.0.1:9100");
    assert!(!config.llm.enabled);
    assert_eq!(config.coordinator.run_timeout_secs, 30);
    assert!(config.experts.contains(&"networking".to_string()));
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multibrain.toml");

    let mut config = ServiceConfig::default();
    config.bind_port = 9200;
    config.experts = vec!["storage".to_string()];
    config.coordinator.stage_timeout_secs = Some(5);
    config.save(&path).unwrap();

    let loaded = ServiceConfig::load(&path).unwrap();
    assert_eq!(loaded.bind_port, 9200);
    assert_eq!(loaded.experts, vec!["storage"]);
    assert_eq!(loaded.coordinator.stage_timeout_secs, Some(5));
    assert_eq!(loaded.coordinator.max_concurrent_experts, None);
}

#[test]
fn test_load_hand_written_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multibrain.toml");
    std::fs::write(
        &path,
        r#"
bind_addr = "0.0.0.0"
bind_port = 8080
experts = ["networking", "linux"]
audit_log_capacity = 50

[llm]
enabled = true
api_key_env = "MULTIBRAIN_TEST_KEY"
model = "gpt-4o"
max_tokens = 512
temperature = 0.0

[coordinator]
run_timeout_secs = 10
max_concurrent_experts = 2
"#,
    )
    .unwrap();

    let config = ServiceConfig::load(&path).unwrap();
    assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    assert_eq!(config.audit_log_capacity, 50);
    assert!(config.llm.enabled);

    let coordinator = config.coordinator.to_coordinator_config();
    assert_eq!(coordinator.run_timeout, Duration::from_secs(10));
    assert_eq!(coordinator.stage_timeout, None);
    assert_eq!(coordinator.max_concurrent_experts, Some(2));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempdir().unwrap();
    assert!(ServiceConfig::load(&dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_zero_run_timeout_is_raised() {
    let mut config = ServiceConfig::default();
    config.coordinator.run_timeout_secs = 0;
    assert_eq!(
        config.coordinator.to_coordinator_config().run_timeout,
        Duration::from_secs(1)
    );
}

#[test]
fn test_llm_settings_read_key_from_env() {
    let mut config = ServiceConfig::default();
    config.llm.api_key_env = "MULTIBRAIN_CONFIG_TEST_UNSET_KEY".to_string();
    let llm = config.llm.to_llm_config();
    assert!(llm.api_key.is_empty());
    assert_eq!(llm.model, "gpt-4o-mini");
}

#[tokio::test]
async fn test_service_without_llm_uses_noop_stages() {
    let service = AnalysisService::new(ServiceConfig::default()).unwrap();

    let analysis = service.coordinator().analyze("restart nginx").await.unwrap();

    assert_eq!(analysis.intent.as_ref().unwrap().primary_intent, "unknown");
    assert_eq!(analysis.execution_strategy, ExecutionStrategy::ManualReview);
    assert_eq!(service.audit().for_correlation(analysis.correlation_id()).len(), 2);
}

#[test]
fn test_service_with_llm_but_no_key_falls_back() {
    let mut config = ServiceConfig::default();
    config.llm.enabled = true;
    config.llm.api_key_env = "MULTIBRAIN_CONFIG_TEST_UNSET_KEY".to_string();

    let service = AnalysisService::new(config).unwrap();
    assert!(service.coordinator().registered_domains().is_empty());
}
