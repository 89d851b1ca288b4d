mod llm_client;
mod llm_stages;
mod noop;

pub use llm_client::{LlmClient, LlmConfig};
pub use llm_stages::*;
pub use noop::*;

use crate::types::*;
use async_trait::async_trait;

#[async_trait]
pub trait IntentAnalyzer: Send + Sync {
    async fn analyze_intent(&self, request_text: &str) -> anyhow::Result<IntentResult>;
}

#[async_trait]
pub trait TechnicalPlanner: Send + Sync {
    async fn create_plan(&self, intent: &IntentResult) -> anyhow::Result<TechnicalPlanResult>;
}

#[async_trait]
pub trait DomainExpert: Send + Sync {
    async fn provide_expertise(
        &self,
        domain: &str,
        request_text: &str,
        intent: &IntentResult,
        plan: &TechnicalPlanResult,
    ) -> anyhow::Result<DomainExpertResult>;
}
