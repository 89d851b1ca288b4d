use crate::brain::{DomainExpert, IntentAnalyzer, LlmClient, TechnicalPlanner};
use crate::types::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const INTENT_PROMPT: &str = r#"You classify requests sent to an IT operations automation platform.
Identify the single primary intent of the request (for example: troubleshooting,
monitoring, deployment, configuration, security_audit, information).

Respond with a JSON object:
{
  "primary_intent": "short_snake_case_label",
  "confidence": 0.0
}
confidence is a number between 0 and 1.
"#;

const PLANNER_PROMPT: &str = r#"You are the technical planner of an IT operations automation platform.
Given the classified intent of a request, produce an execution plan and name the
domain experts that must review it. Only use expert domains from the provided list.

Respond with a JSON object:
{
  "execution_strategy": "sequential|parallel|phased",
  "required_domain_experts": ["domain", ...],
  "implementation_steps": ["step", ...],
  "confidence": 0.0
}
confidence is a number between 0 and 1.
"#;

const EXPERT_PROMPT: &str = r#"You are a subject-matter expert reviewing an operations plan.
Assess it strictly from the point of view of your domain.

Respond with a JSON object:
{
  "confidence": 0.0,
  "risk_assessment": {
    "high_risk": ["..."],
    "medium_risk": ["..."],
    "low_risk": ["..."],
    "mitigation_strategies": ["..."]
  },
  "validation_criteria": ["..."]
}
confidence is a number between 0 and 1.
"#;

pub struct LlmIntentAnalyzer {
    client: Arc<LlmClient>,
}

impl LlmIntentAnalyzer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentAnalyzer for LlmIntentAnalyzer {
    async fn analyze_intent(&self, request_text: &str) -> Result<IntentResult> {
        let user_msg = format!("Request:\n{}", request_text);
        let reply = self.client.complete_json(INTENT_PROMPT, &user_msg).await?;
        debug!("Intent reply: {}", reply);
        parse_intent(&reply)
    }
}

pub struct LlmTechnicalPlanner {
    client: Arc<LlmClient>,
    available_domains: Vec<Domain>,
}

impl LlmTechnicalPlanner {
    pub fn new(client: Arc<LlmClient>, available_domains: Vec<Domain>) -> Self {
        Self {
            client,
            available_domains,
        }
    }
}

#[async_trait]
impl TechnicalPlanner for LlmTechnicalPlanner {
    async fn create_plan(&self, intent: &IntentResult) -> Result<TechnicalPlanResult> {
        let input = json!({
            "intent": intent,
            "available_domain_experts": self.available_domains,
        });
        let user_msg = format!(
            "Input:\n```json\n{}\n```\n\nProduce the plan.",
            serde_json::to_string_pretty(&input)?
        );
        let reply = self.client.complete_json(PLANNER_PROMPT, &user_msg).await?;
        debug!("Planner reply: {}", reply);
        parse_plan(&reply)
    }
}

pub struct LlmDomainExpert {
    client: Arc<LlmClient>,
}

impl LlmDomainExpert {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DomainExpert for LlmDomainExpert {
    async fn provide_expertise(
        &self,
        domain: &str,
        request_text: &str,
        intent: &IntentResult,
        plan: &TechnicalPlanResult,
    ) -> Result<DomainExpertResult> {
        let input = json!({
            "domain": domain,
            "request": request_text,
            "intent": intent,
            "plan": plan,
        });
        let system = format!("{}\nYour domain: {}", EXPERT_PROMPT, domain);
        let user_msg = format!(
            "Input:\n```json\n{}\n```\n\nReview the plan.",
            serde_json::to_string_pretty(&input)?
        );
        let reply = self.client.complete_json(&system, &user_msg).await?;
        debug!("Expert {} reply: {}", domain, reply);
        parse_expertise(domain, &reply)
    }
}

/// Missing or unparseable confidence comes back as NaN so the coordinator
/// zeroes and flags it instead of the stage guessing.
fn read_confidence(value: &Value) -> f64 {
    match value.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn read_string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_intent(value: &Value) -> Result<IntentResult> {
    let primary_intent = value
        .get("primary_intent")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing primary_intent"))?;

    Ok(IntentResult {
        primary_intent: primary_intent.trim().to_string(),
        confidence: read_confidence(value),
    })
}

pub(crate) fn parse_plan(value: &Value) -> Result<TechnicalPlanResult> {
    let execution_strategy = value
        .get("execution_strategy")
        .and_then(|v| v.as_str())
        .unwrap_or("sequential")
        .to_string();

    Ok(TechnicalPlanResult {
        execution_strategy,
        required_domain_experts: read_string_list(value.get("required_domain_experts"))
            .into_iter()
            .map(|d| d.to_lowercase())
            .collect(),
        implementation_steps: read_string_list(value.get("implementation_steps")),
        confidence: read_confidence(value),
    })
}

pub(crate) fn parse_expertise(domain: &str, value: &Value) -> Result<DomainExpertResult> {
    let risks = value.get("risk_assessment");
    let bucket = |name: &str| read_string_list(risks.and_then(|r| r.get(name)));

    Ok(DomainExpertResult {
        domain: domain.to_string(),
        confidence: read_confidence(value),
        risk_assessment: RiskAssessment {
            high_risk: bucket("high_risk"),
            medium_risk: bucket("medium_risk"),
            low_risk: bucket("low_risk"),
            mitigation_strategies: bucket("mitigation_strategies"),
        },
        validation_criteria: read_string_list(value.get("validation_criteria")),
    })
}
