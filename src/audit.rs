use crate::error::AuditError;
use crate::types::*;
use std::collections::VecDeque;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// Destination for `BrainMessage`s. Recording is best-effort and must not
/// block the coordinator.
pub trait AuditSink: Send + Sync {
    fn record(&self, message: BrainMessage) -> Result<(), AuditError>;
}

pub struct NoOpAuditSink;

impl AuditSink for NoOpAuditSink {
    fn record(&self, _message: BrainMessage) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Bounded in-memory append log; the oldest messages fall off past capacity.
pub struct MemoryAuditSink {
    log: RwLock<VecDeque<BrainMessage>>,
    capacity: usize,
}

impl MemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn messages(&self) -> Vec<BrainMessage> {
        self.log.read().unwrap().iter().cloned().collect()
    }

    pub fn for_correlation(&self, correlation_id: &str) -> Vec<BrainMessage> {
        self.log
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.correlation_id == correlation_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.log.write().unwrap().clear();
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, message: BrainMessage) -> Result<(), AuditError> {
        let mut log = self.log.write().unwrap();
        log.push_back(message);
        while log.len() > self.capacity {
            log.pop_front();
        }
        Ok(())
    }
}

/// Forwards messages to an external consumer over a bounded channel.
pub struct ChannelAuditSink {
    tx: mpsc::Sender<BrainMessage>,
}

impl ChannelAuditSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BrainMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, message: BrainMessage) -> Result<(), AuditError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AuditError::Full,
            mpsc::error::TrySendError::Closed(_) => AuditError::Closed,
        })
    }
}
