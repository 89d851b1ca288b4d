use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type CorrelationId = String;
pub type Domain = String;

pub const COORDINATOR_ID: &str = "multibrain_coordinator";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_correlation_id(text, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_correlation_id(text: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            correlation_id: correlation_id.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentResult {
    pub primary_intent: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalPlanResult {
    pub execution_strategy: String,
    pub required_domain_experts: Vec<Domain>,
    pub implementation_steps: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RiskAssessment {
    #[serde(default)]
    pub high_risk: Vec<String>,
    #[serde(default)]
    pub medium_risk: Vec<String>,
    #[serde(default)]
    pub low_risk: Vec<String>,
    #[serde(default)]
    pub mitigation_strategies: Vec<String>,
}

impl RiskAssessment {
    /// Appends every bucket of `other` onto this one, keeping duplicates.
    pub fn extend_from(&mut self, other: &RiskAssessment) {
        self.high_risk.extend(other.high_risk.iter().cloned());
        self.medium_risk.extend(other.medium_risk.iter().cloned());
        self.low_risk.extend(other.low_risk.iter().cloned());
        self.mitigation_strategies
            .extend(other.mitigation_strategies.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.high_risk.is_empty()
            && self.medium_risk.is_empty()
            && self.low_risk.is_empty()
            && self.mitigation_strategies.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainExpertResult {
    pub domain: Domain,
    pub confidence: f64,
    pub risk_assessment: RiskAssessment,
    pub validation_criteria: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Parallel,
    Sequential,
    Phased,
    ManualReview,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStrategy::Parallel => "parallel",
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::Phased => "phased",
            ExecutionStrategy::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear run lifecycle. `Failed` is absorbing and reachable from any phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Pending,
    IntentAnalysis,
    TechnicalPlanning,
    SmeConsultation,
    ConfidenceAggregation,
    StrategyDetermination,
    Done,
    Failed,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Pending => "pending",
            AnalysisPhase::IntentAnalysis => "intent_analysis",
            AnalysisPhase::TechnicalPlanning => "technical_planning",
            AnalysisPhase::SmeConsultation => "sme_consultation",
            AnalysisPhase::ConfidenceAggregation => "confidence_aggregation",
            AnalysisPhase::StrategyDetermination => "strategy_determination",
            AnalysisPhase::Done => "done",
            AnalysisPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisPhase::Done | AnalysisPhase::Failed)
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub status: AnalysisPhase,
    pub phases_completed: Vec<AnalysisPhase>,
    /// Fatal errors keyed by the phase they happened in.
    pub phase_errors: BTreeMap<String, String>,
    /// Recoverable Phase 3 failures keyed by domain.
    pub expert_errors: BTreeMap<Domain, String>,
    /// Score keys whose confidence had to be replaced or clamped.
    pub confidence_flags: Vec<String>,
    pub fallbacks: Vec<String>,
    pub phase_timings_ms: BTreeMap<String, u64>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}

impl AnalysisMetadata {
    pub fn new() -> Self {
        Self {
            status: AnalysisPhase::Pending,
            phases_completed: Vec::new(),
            phase_errors: BTreeMap::new(),
            expert_errors: BTreeMap::new(),
            confidence_flags: Vec::new(),
            fallbacks: Vec::new(),
            phase_timings_ms: BTreeMap::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
            elapsed_ms: 0,
        }
    }

    pub fn has_completed(&self, phase: AnalysisPhase) -> bool {
        self.phases_completed.contains(&phase)
    }
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultibrainAnalysis {
    pub request: AnalysisRequest,
    pub intent: Option<IntentResult>,
    pub technical_plan: Option<TechnicalPlanResult>,
    pub sme_recommendations: BTreeMap<Domain, DomainExpertResult>,
    pub aggregated_confidence: f64,
    pub execution_strategy: ExecutionStrategy,
    pub risk_assessment: RiskAssessment,
    pub validation_criteria: BTreeSet<String>,
    pub implementation_steps: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl MultibrainAnalysis {
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            request,
            intent: None,
            technical_plan: None,
            sme_recommendations: BTreeMap::new(),
            aggregated_confidence: 0.0,
            execution_strategy: ExecutionStrategy::ManualReview,
            risk_assessment: RiskAssessment::default(),
            validation_criteria: BTreeSet::new(),
            implementation_steps: Vec::new(),
            metadata: AnalysisMetadata::new(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.request.correlation_id
    }

    /// Confidence scores keyed the way the aggregator weights them.
    pub fn confidence_scores(&self) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        if let Some(intent) = &self.intent {
            scores.insert("intent".to_string(), intent.confidence);
        }
        if let Some(plan) = &self.technical_plan {
            scores.insert("technical".to_string(), plan.confidence);
        }
        for (domain, result) in &self.sme_recommendations {
            scores.insert(sme_key(domain), result.confidence);
        }
        scores
    }

    /// True when nothing beyond the request itself was produced.
    pub fn is_empty(&self) -> bool {
        self.intent.is_none() && self.technical_plan.is_none() && self.sme_recommendations.is_empty()
    }
}

pub fn sme_key(domain: &str) -> String {
    format!("sme_{}", domain)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    IntentAnalysisRequest,
    TechnicalPlanningRequest,
    ExpertConsultationRequest,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessagePriority {
    High = 1,
    Normal = 2,
    Low = 3,
}

impl MessagePriority {
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

/// Audit record of one coordinator-to-stage call. Never read back by the
/// coordinator itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainMessage {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub message_type: MessageType,
    pub content: serde_json::Value,
    pub correlation_id: CorrelationId,
    pub timestamp: DateTime<Utc>,
    pub priority: MessagePriority,
}

impl BrainMessage {
    pub fn new(
        receiver: impl Into<String>,
        message_type: MessageType,
        content: serde_json::Value,
        correlation_id: impl Into<String>,
        priority: MessagePriority,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: COORDINATOR_ID.to_string(),
            receiver: receiver.into(),
            message_type,
            content,
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            priority,
        }
    }
}
