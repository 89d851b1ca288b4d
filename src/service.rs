use crate::audit::MemoryAuditSink;
use crate::brain::{
    LlmClient, LlmDomainExpert, LlmIntentAnalyzer, LlmTechnicalPlanner, NoOpIntentAnalyzer,
    NoOpTechnicalPlanner,
};
use crate::config::ServiceConfig;
use crate::coordinator::MultibrainCoordinator;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Coordinator wired from config, plus the audit log the API reads back.
pub struct AnalysisService {
    coordinator: Arc<MultibrainCoordinator>,
    audit: Arc<MemoryAuditSink>,
    config: ServiceConfig,
}

impl AnalysisService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let audit = Arc::new(MemoryAuditSink::new(config.audit_log_capacity));
        let coordinator = MultibrainCoordinator::new(config.coordinator.to_coordinator_config())
            .with_audit_sink(audit.clone());

        let coordinator = if config.llm.enabled {
            let llm_config = config.llm.to_llm_config();
            if llm_config.api_key.is_empty() {
                warn!("LLM enabled but API key is empty, using no-op stages");
                Self::with_noop_stages(coordinator)
            } else {
                let client = Arc::new(LlmClient::new(llm_config)?);
                info!(
                    "Using LLM stages (model {}) with experts {:?}",
                    client.model(),
                    config.experts
                );
                let mut coordinator = coordinator
                    .with_intent_analyzer(Arc::new(LlmIntentAnalyzer::new(client.clone())))
                    .with_technical_planner(Arc::new(LlmTechnicalPlanner::new(
                        client.clone(),
                        config.experts.clone(),
                    )));
                for domain in &config.experts {
                    coordinator = coordinator
                        .with_expert(domain.clone(), Arc::new(LlmDomainExpert::new(client.clone())));
                }
                coordinator
            }
        } else {
            Self::with_noop_stages(coordinator)
        };

        Ok(Self::from_parts(Arc::new(coordinator), audit, config))
    }

    /// For callers that wire their own stages.
    pub fn from_parts(
        coordinator: Arc<MultibrainCoordinator>,
        audit: Arc<MemoryAuditSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            coordinator,
            audit,
            config,
        }
    }

    fn with_noop_stages(coordinator: MultibrainCoordinator) -> MultibrainCoordinator {
        coordinator
            .with_intent_analyzer(Arc::new(NoOpIntentAnalyzer))
            .with_technical_planner(Arc::new(NoOpTechnicalPlanner))
    }

    pub fn coordinator(&self) -> &Arc<MultibrainCoordinator> {
        &self.coordinator
    }

    pub fn audit(&self) -> &Arc<MemoryAuditSink> {
        &self.audit
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
