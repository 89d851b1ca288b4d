use crate::types::AnalysisPhase;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by every run of one coordinator. Updated from concurrent
/// expert tasks, so everything is atomic.
#[derive(Debug, Default)]
pub struct CommunicationMetrics {
    runs_started: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    total_elapsed_ms: AtomicU64,
    intent_ms: AtomicU64,
    technical_planning_ms: AtomicU64,
    sme_consultation_ms: AtomicU64,
    confidence_aggregation_ms: AtomicU64,
    messages_exchanged: AtomicU64,
    failed_communications: AtomicU64,
    timeouts: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub total_elapsed_ms: u64,
    pub intent_ms: u64,
    pub technical_planning_ms: u64,
    pub sme_consultation_ms: u64,
    pub confidence_aggregation_ms: u64,
    pub messages_exchanged: u64,
    pub failed_communications: u64,
    pub timeouts: u64,
}

impl CommunicationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_finished(&self, elapsed: Duration, success: bool) {
        self.total_elapsed_ms
            .fetch_add(duration_ms(elapsed), Ordering::Relaxed);
        if success {
            self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.runs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_phase(&self, phase: AnalysisPhase, elapsed: Duration) {
        let counter = match phase {
            AnalysisPhase::IntentAnalysis => &self.intent_ms,
            AnalysisPhase::TechnicalPlanning => &self.technical_planning_ms,
            AnalysisPhase::SmeConsultation => &self.sme_consultation_ms,
            AnalysisPhase::ConfidenceAggregation => &self.confidence_aggregation_ms,
            _ => return,
        };
        counter.fetch_add(duration_ms(elapsed), Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_exchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_communication(&self) {
        self.failed_communications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            total_elapsed_ms: self.total_elapsed_ms.load(Ordering::Relaxed),
            intent_ms: self.intent_ms.load(Ordering::Relaxed),
            technical_planning_ms: self.technical_planning_ms.load(Ordering::Relaxed),
            sme_consultation_ms: self.sme_consultation_ms.load(Ordering::Relaxed),
            confidence_aggregation_ms: self.confidence_aggregation_ms.load(Ordering::Relaxed),
            messages_exchanged: self.messages_exchanged.load(Ordering::Relaxed),
            failed_communications: self.failed_communications.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.runs_started,
            &self.runs_succeeded,
            &self.runs_failed,
            &self.total_elapsed_ms,
            &self.intent_ms,
            &self.technical_planning_ms,
            &self.sme_consultation_ms,
            &self.confidence_aggregation_ms,
            &self.messages_exchanged,
            &self.failed_communications,
            &self.timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
