pub mod api;
pub mod audit;
pub mod brain;
pub mod confidence;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod types;

pub use api::create_router;
pub use audit::{AuditSink, ChannelAuditSink, MemoryAuditSink, NoOpAuditSink};
pub use brain::{DomainExpert, IntentAnalyzer, TechnicalPlanner};
pub use confidence::{ConfidenceAggregator, StrategySelector};
pub use config::ServiceConfig;
pub use coordinator::{CoordinatorConfig, MultibrainCoordinator};
pub use error::{AnalysisFailure, AuditError, ConfidenceError, CoordinatorError};
pub use metrics::{CommunicationMetrics, MetricsSnapshot};
pub use registry::{RunGuard, RunRegistry, RunSummary};
pub use service::AnalysisService;
pub use types::*;
