use crate::brain::{IntentAnalyzer, TechnicalPlanner};
use crate::types::*;
use anyhow::Result;
use async_trait::async_trait;

/// Stand-in when no LLM backend is configured. Scores zero so every run
/// ends in manual review.
pub struct NoOpIntentAnalyzer;

#[async_trait]
impl IntentAnalyzer for NoOpIntentAnalyzer {
    async fn analyze_intent(&self, _request_text: &str) -> Result<IntentResult> {
        Ok(IntentResult {
            primary_intent: "unknown".to_string(),
            confidence: 0.0,
        })
    }
}

pub struct NoOpTechnicalPlanner;

#[async_trait]
impl TechnicalPlanner for NoOpTechnicalPlanner {
    async fn create_plan(&self, _intent: &IntentResult) -> Result<TechnicalPlanResult> {
        Ok(TechnicalPlanResult {
            execution_strategy: ExecutionStrategy::ManualReview.to_string(),
            required_domain_experts: Vec::new(),
            implementation_steps: vec!["Escalate to an operator: analysis backend disabled".to_string()],
            confidence: 0.0,
        })
    }
}
