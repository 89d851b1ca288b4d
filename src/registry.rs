use crate::types::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Handle shared between a running analysis and the registry.
#[derive(Debug)]
pub struct ActiveRun {
    pub correlation_id: CorrelationId,
    pub request_text: String,
    pub started_at: DateTime<Utc>,
    phase: RwLock<AnalysisPhase>,
    cancelled: AtomicBool,
}

impl ActiveRun {
    fn new(request: &AnalysisRequest) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            request_text: request.text.clone(),
            started_at: Utc::now(),
            phase: RwLock::new(AnalysisPhase::Pending),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> AnalysisPhase {
        *self.phase.read().unwrap()
    }

    pub fn set_phase(&self, phase: AnalysisPhase) {
        *self.phase.write().unwrap() = phase;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            correlation_id: self.correlation_id.clone(),
            request_text: self.request_text.clone(),
            started_at: self.started_at,
            phase: self.phase(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub correlation_id: CorrelationId,
    pub request_text: String,
    pub started_at: DateTime<Utc>,
    pub phase: AnalysisPhase,
}

/// In-flight runs keyed by correlation id. Owned by one coordinator.
#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<CorrelationId, Arc<ActiveRun>>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run. A correlation id that is already active is replaced;
    /// the previous handle keeps working but is no longer visible.
    pub fn register(&self, request: &AnalysisRequest) -> Arc<ActiveRun> {
        let run = Arc::new(ActiveRun::new(request));
        self.runs
            .write()
            .unwrap()
            .insert(run.correlation_id.clone(), run.clone());
        run
    }

    /// Marks the run cancelled and drops it from the registry. In-flight stage
    /// calls are left to finish on their own.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        match self.runs.write().unwrap().remove(correlation_id) {
            Some(run) => {
                run.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the run only if the registered handle is still `run`.
    pub fn complete(&self, run: &Arc<ActiveRun>) {
        let mut runs = self.runs.write().unwrap();
        if runs
            .get(&run.correlation_id)
            .is_some_and(|current| Arc::ptr_eq(current, run))
        {
            runs.remove(&run.correlation_id);
        }
    }

    /// Registers a run and hands back a guard that deregisters it when
    /// dropped, so an abandoned run never lingers in the registry.
    pub fn track(&self, request: &AnalysisRequest) -> RunGuard {
        RunGuard {
            registry: self.clone(),
            run: self.register(request),
        }
    }

    pub fn get(&self, correlation_id: &str) -> Option<RunSummary> {
        self.runs
            .read()
            .unwrap()
            .get(correlation_id)
            .map(|r| r.summary())
    }

    pub fn list(&self) -> Vec<RunSummary> {
        let mut runs: Vec<_> = self
            .runs
            .read()
            .unwrap()
            .values()
            .map(|r| r.summary())
            .collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        runs
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a run registered for as long as it is alive.
pub struct RunGuard {
    registry: RunRegistry,
    run: Arc<ActiveRun>,
}

impl RunGuard {
    pub fn run(&self) -> &Arc<ActiveRun> {
        &self.run
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.complete(&self.run);
    }
}
