use crate::audit::{AuditSink, NoOpAuditSink};
use crate::brain::{DomainExpert, IntentAnalyzer, TechnicalPlanner};
use crate::confidence::{
    merge_risk_assessments, merge_validation_criteria, sanitize_confidence,
    ConfidenceAggregator, StrategySelector, DEFAULT_CONFIDENCE, FALLBACK_STRATEGY,
};
use crate::error::{AnalysisFailure, CoordinatorError};
use crate::metrics::{duration_ms, CommunicationMetrics, MetricsSnapshot};
use crate::registry::{ActiveRun, RunRegistry, RunSummary};
use crate::types::*;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Ceiling for a whole run, measured from its start.
    pub run_timeout: Duration,
    pub stage_timeout: Option<Duration>,
    /// Bounds the Phase 3 fan-out; unbounded when `None`.
    pub max_concurrent_experts: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            run_timeout: DEFAULT_RUN_TIMEOUT,
            stage_timeout: None,
            max_concurrent_experts: None,
        }
    }
}

pub struct MultibrainCoordinator {
    intent_analyzer: Option<Arc<dyn IntentAnalyzer>>,
    technical_planner: Option<Arc<dyn TechnicalPlanner>>,
    experts: HashMap<Domain, Arc<dyn DomainExpert>>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<CommunicationMetrics>,
    runs: RunRegistry,
    config: CoordinatorConfig,
}

type ExpertOutcome = anyhow::Result<DomainExpertResult>;

impl MultibrainCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            intent_analyzer: None,
            technical_planner: None,
            experts: HashMap::new(),
            audit: Arc::new(NoOpAuditSink),
            metrics: Arc::new(CommunicationMetrics::new()),
            runs: RunRegistry::new(),
            config,
        }
    }

    pub fn with_intent_analyzer(mut self, analyzer: Arc<dyn IntentAnalyzer>) -> Self {
        self.intent_analyzer = Some(analyzer);
        self
    }

    pub fn with_technical_planner(mut self, planner: Arc<dyn TechnicalPlanner>) -> Self {
        self.technical_planner = Some(planner);
        self
    }

    pub fn with_expert(mut self, domain: impl Into<String>, expert: Arc<dyn DomainExpert>) -> Self {
        self.experts.insert(domain.into(), expert);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn registered_domains(&self) -> Vec<Domain> {
        let mut domains: Vec<_> = self.experts.keys().cloned().collect();
        domains.sort();
        domains
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub async fn analyze(
        &self,
        request_text: impl Into<String>,
    ) -> Result<MultibrainAnalysis, AnalysisFailure> {
        self.run_analysis(AnalysisRequest::new(request_text)).await
    }

    /// Runs all five phases. On failure the partially filled analysis comes
    /// back inside the error.
    pub async fn run_analysis(
        &self,
        request: AnalysisRequest,
    ) -> Result<MultibrainAnalysis, AnalysisFailure> {
        let guard = self.runs.track(&request);
        let run = guard.run().clone();
        let mut analysis = MultibrainAnalysis::new(request);
        let started = Instant::now();
        self.metrics.record_run_started();

        info!(
            correlation_id = %run.correlation_id,
            "Starting multibrain analysis"
        );

        let outcome = match tokio::time::timeout(
            self.config.run_timeout,
            self.execute_phases(&mut analysis, &run),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                self.metrics.record_timeout();
                Err(CoordinatorError::Timeout {
                    after: self.config.run_timeout,
                })
            }
        };

        let elapsed = started.elapsed();
        analysis.metadata.finished_at = Some(Utc::now());
        analysis.metadata.elapsed_ms = duration_ms(elapsed);
        drop(guard);

        match outcome {
            Ok(()) => {
                self.metrics.record_run_finished(elapsed, true);
                info!(
                    correlation_id = %run.correlation_id,
                    confidence = analysis.aggregated_confidence,
                    strategy = %analysis.execution_strategy,
                    elapsed_ms = analysis.metadata.elapsed_ms,
                    "Multibrain analysis complete"
                );
                Ok(analysis)
            }
            Err(e) => {
                self.metrics.record_run_finished(elapsed, false);
                let failed_in = analysis.metadata.status;
                if matches!(e, CoordinatorError::Cancelled(_)) {
                    analysis.metadata.cancelled = true;
                    warn!(correlation_id = %run.correlation_id, "Analysis cancelled during {}", failed_in);
                } else {
                    error!(correlation_id = %run.correlation_id, "Analysis failed during {}: {}", failed_in, e);
                }
                analysis
                    .metadata
                    .phase_errors
                    .insert(failed_in.to_string(), e.to_string());
                analysis.metadata.status = AnalysisPhase::Failed;
                run.set_phase(AnalysisPhase::Failed);
                Err(AnalysisFailure::new(analysis, e))
            }
        }
    }

    async fn execute_phases(
        &self,
        analysis: &mut MultibrainAnalysis,
        run: &ActiveRun,
    ) -> Result<(), CoordinatorError> {
        // Phase 1
        let phase_start = self.enter_phase(analysis, run, AnalysisPhase::IntentAnalysis);
        let mut intent = self.analyze_intent(analysis).await?;
        self.ensure_active(run)?;
        intent.confidence = self.checked_confidence(analysis, "intent", intent.confidence);
        debug!(intent = %intent.primary_intent, confidence = intent.confidence, "Intent analyzed");
        analysis.intent = Some(intent);
        self.complete_phase(analysis, AnalysisPhase::IntentAnalysis, phase_start);

        // Phase 2
        let phase_start = self.enter_phase(analysis, run, AnalysisPhase::TechnicalPlanning);
        let mut plan = self.create_plan(analysis).await?;
        self.ensure_active(run)?;
        plan.confidence = self.checked_confidence(analysis, "technical", plan.confidence);
        debug!(
            experts = ?plan.required_domain_experts,
            confidence = plan.confidence,
            "Technical plan created"
        );
        analysis.technical_plan = Some(plan);
        self.complete_phase(analysis, AnalysisPhase::TechnicalPlanning, phase_start);

        // Phase 3
        let phase_start = self.enter_phase(analysis, run, AnalysisPhase::SmeConsultation);
        self.consult_experts(analysis, run).await?;
        self.complete_phase(analysis, AnalysisPhase::SmeConsultation, phase_start);

        // Phase 4
        let phase_start = self.enter_phase(analysis, run, AnalysisPhase::ConfidenceAggregation);
        let scores = analysis.confidence_scores();
        analysis.aggregated_confidence = match ConfidenceAggregator::try_aggregate(&scores) {
            Ok(confidence) => confidence,
            Err(e) => {
                warn!("Confidence aggregation failed, using {}: {}", DEFAULT_CONFIDENCE, e);
                analysis
                    .metadata
                    .fallbacks
                    .push(format!("confidence_aggregation: {}", e));
                DEFAULT_CONFIDENCE
            }
        };
        self.complete_phase(analysis, AnalysisPhase::ConfidenceAggregation, phase_start);

        // Phase 5
        let phase_start = self.enter_phase(analysis, run, AnalysisPhase::StrategyDetermination);
        analysis.execution_strategy =
            match StrategySelector::try_select_strategy(analysis.aggregated_confidence) {
                Ok(strategy) => strategy,
                Err(e) => {
                    warn!("Strategy selection failed, using {}: {}", FALLBACK_STRATEGY, e);
                    analysis
                        .metadata
                        .fallbacks
                        .push(format!("strategy_determination: {}", e));
                    FALLBACK_STRATEGY
                }
            };
        self.roll_up(analysis);
        self.complete_phase(analysis, AnalysisPhase::StrategyDetermination, phase_start);

        self.finish(analysis, run)
    }

    /// Last cancellation check; a run cancelled after Phase 3 never reaches Done.
    fn finish(&self, analysis: &mut MultibrainAnalysis, run: &ActiveRun) -> Result<(), CoordinatorError> {
        self.ensure_active(run)?;
        analysis.metadata.status = AnalysisPhase::Done;
        run.set_phase(AnalysisPhase::Done);
        Ok(())
    }

    async fn analyze_intent(
        &self,
        analysis: &MultibrainAnalysis,
    ) -> Result<IntentResult, CoordinatorError> {
        let analyzer = self
            .intent_analyzer
            .as_ref()
            .ok_or(CoordinatorError::MissingCollaborator("intent_analyzer"))?;

        self.emit(BrainMessage::new(
            "intent_analyzer",
            MessageType::IntentAnalysisRequest,
            json!({ "request": analysis.request.text }),
            analysis.correlation_id(),
            MessagePriority::High,
        ));

        call_stage(
            analyzer.analyze_intent(&analysis.request.text),
            "intent_analyzer",
            self.config.stage_timeout,
            &self.metrics,
        )
        .await
        .map_err(CoordinatorError::IntentAnalysis)
    }

    async fn create_plan(
        &self,
        analysis: &MultibrainAnalysis,
    ) -> Result<TechnicalPlanResult, CoordinatorError> {
        let intent = analysis.intent.as_ref().ok_or_else(|| {
            CoordinatorError::TechnicalPlanning(anyhow::anyhow!("no intent result to plan from"))
        })?;
        let planner = self
            .technical_planner
            .as_ref()
            .ok_or(CoordinatorError::MissingCollaborator("technical_planner"))?;

        self.emit(BrainMessage::new(
            "technical_planner",
            MessageType::TechnicalPlanningRequest,
            json!({ "intent": intent }),
            analysis.correlation_id(),
            MessagePriority::High,
        ));

        call_stage(
            planner.create_plan(intent),
            "technical_planner",
            self.config.stage_timeout,
            &self.metrics,
        )
        .await
        .map_err(CoordinatorError::TechnicalPlanning)
    }

    /// Fans out to every requested, registered expert and waits for all of
    /// them. Individual failures land in `metadata.expert_errors`.
    async fn consult_experts(
        &self,
        analysis: &mut MultibrainAnalysis,
        run: &ActiveRun,
    ) -> Result<(), CoordinatorError> {
        let (Some(intent), Some(plan)) = (analysis.intent.clone(), analysis.technical_plan.clone())
        else {
            return Err(CoordinatorError::TechnicalPlanning(anyhow::anyhow!(
                "no technical plan to consult experts on"
            )));
        };

        let requested = unique_domains(&plan.required_domain_experts);

        if requested.is_empty() {
            debug!("No domain experts requested");
            return Ok(());
        }

        let intent = Arc::new(intent);
        let plan = Arc::new(plan);
        let request_text: Arc<str> = Arc::from(analysis.request.text.as_str());
        let limiter = self
            .config
            .max_concurrent_experts
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        let mut domains = Vec::new();
        let mut handles = Vec::new();

        for domain in requested {
            let Some(expert) = self.experts.get(&domain).cloned() else {
                warn!("No expert registered for domain '{}'", domain);
                analysis
                    .metadata
                    .expert_errors
                    .insert(domain.clone(), format!("no expert registered for domain '{}'", domain));
                continue;
            };

            self.emit(BrainMessage::new(
                sme_key(&domain),
                MessageType::ExpertConsultationRequest,
                json!({
                    "domain": domain,
                    "intent": intent.primary_intent,
                    "execution_strategy": plan.execution_strategy,
                }),
                analysis.correlation_id(),
                MessagePriority::Normal,
            ));

            let task_domain = domain.clone();
            let intent = intent.clone();
            let plan = plan.clone();
            let request_text = request_text.clone();
            let limiter = limiter.clone();
            let metrics = self.metrics.clone();
            let stage_timeout = self.config.stage_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let stage = sme_key(&task_domain);
                call_stage(
                    expert.provide_expertise(&task_domain, &request_text, &intent, &plan),
                    &stage,
                    stage_timeout,
                    &metrics,
                )
                .await
            }));
            domains.push(domain);
        }

        let outcomes: Vec<ExpertOutcome> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| Err(anyhow::anyhow!("expert task aborted: {}", e))))
            .collect();

        self.ensure_active(run)?;

        for (domain, outcome) in domains.into_iter().zip(outcomes) {
            match outcome {
                Ok(mut result) => {
                    let key = sme_key(&domain);
                    result.confidence = self.checked_confidence(analysis, &key, result.confidence);
                    result.domain = domain.clone();
                    debug!(domain = %domain, confidence = result.confidence, "Expert responded");
                    analysis.sme_recommendations.insert(domain, result);
                }
                Err(e) => {
                    warn!("Expert '{}' failed: {:#}", domain, e);
                    analysis
                        .metadata
                        .expert_errors
                        .insert(domain, format!("{:#}", e));
                }
            }
        }

        Ok(())
    }

    fn roll_up(&self, analysis: &mut MultibrainAnalysis) {
        let plan = analysis.technical_plan.as_ref();

        // requested order, not map order
        let ordered: Vec<&DomainExpertResult> = plan
            .map(|p| unique_domains(&p.required_domain_experts))
            .unwrap_or_default()
            .iter()
            .filter_map(|d| analysis.sme_recommendations.get(d))
            .collect();

        let risk_assessment = merge_risk_assessments(ordered.iter().copied());
        let validation_criteria = merge_validation_criteria(ordered.iter().copied());
        let implementation_steps = plan
            .map(|p| p.implementation_steps.clone())
            .unwrap_or_default();

        analysis.risk_assessment = risk_assessment;
        analysis.validation_criteria = validation_criteria;
        analysis.implementation_steps = implementation_steps;
    }

    fn enter_phase(
        &self,
        analysis: &mut MultibrainAnalysis,
        run: &ActiveRun,
        phase: AnalysisPhase,
    ) -> Instant {
        debug!(correlation_id = %run.correlation_id, "Entering {}", phase);
        analysis.metadata.status = phase;
        run.set_phase(phase);
        Instant::now()
    }

    fn complete_phase(&self, analysis: &mut MultibrainAnalysis, phase: AnalysisPhase, started: Instant) {
        let elapsed = started.elapsed();
        self.metrics.record_phase(phase, elapsed);
        analysis
            .metadata
            .phase_timings_ms
            .insert(phase.to_string(), duration_ms(elapsed));
        analysis.metadata.phases_completed.push(phase);
    }

    /// Cancelled runs stop committing stage results.
    fn ensure_active(&self, run: &ActiveRun) -> Result<(), CoordinatorError> {
        if run.is_cancelled() {
            return Err(CoordinatorError::Cancelled(run.correlation_id.clone()));
        }
        Ok(())
    }

    fn checked_confidence(&self, analysis: &mut MultibrainAnalysis, key: &str, value: f64) -> f64 {
        let (confidence, flagged) = sanitize_confidence(value);
        if flagged {
            warn!("Confidence for {} was {}, using {}", key, value, confidence);
            analysis.metadata.confidence_flags.push(key.to_string());
        }
        confidence
    }

    fn emit(&self, message: BrainMessage) {
        match self.audit.record(message) {
            Ok(()) => self.metrics.record_message(),
            Err(e) => {
                self.metrics.record_failed_communication();
                debug!("Dropped brain message: {}", e);
            }
        }
    }

    /// Cooperative: stage calls already in flight run to completion and
    /// their results are discarded.
    pub fn cancel_run(&self, correlation_id: &str) -> bool {
        let cancelled = self.runs.cancel(correlation_id);
        if cancelled {
            info!(correlation_id = %correlation_id, "Analysis cancellation requested");
        }
        cancelled
    }

    pub fn active_runs(&self) -> Vec<RunSummary> {
        self.runs.list()
    }

    pub fn active_run(&self, correlation_id: &str) -> Option<RunSummary> {
        self.runs.get(correlation_id)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

async fn call_stage<T, F>(
    call: F,
    stage: &str,
    timeout: Option<Duration>,
    metrics: &CommunicationMetrics,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let Some(after) = timeout else {
        return call.await;
    };

    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            metrics.record_timeout();
            Err(CoordinatorError::StageTimeout {
                stage: stage.to_string(),
                after,
            }
            .into())
        }
    }
}

/// Requested domains in plan order, each once.
fn unique_domains(requested: &[Domain]) -> Vec<Domain> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect()
}
