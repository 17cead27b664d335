//! Call history capture for testing
//!
//! Thread-safe log of the collection calls made while a test runs.

use super::events::{Event, OperationId, OperationResult, OperationType};
use crate::types::DocId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe event log; clones share the same history
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<RwLock<EventLogInner>>,
    next_op_id: Arc<AtomicU64>,
}

struct EventLogInner {
    events: Vec<Event>,
    pending: HashMap<OperationId, usize>, // op_id to index in events
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(EventLogInner {
                events: Vec::new(),
                pending: HashMap::new(),
            })),
            next_op_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Record a call as it starts
    pub fn record_invoke(&self, op_type: OperationType) -> OperationId {
        let op_id = OperationId::new(self.next_op_id.fetch_add(1, Ordering::SeqCst));
        let event = Event::invoke(op_id, op_type);

        let mut inner = self.inner.write();
        let index = inner.events.len();
        inner.events.push(event);
        inner.pending.insert(op_id, index);

        op_id
    }

    /// Record a call's outcome
    pub fn record_return(&self, op_id: OperationId, result: OperationResult) {
        let mut inner = self.inner.write();

        if let Some(index) = inner.pending.remove(&op_id) {
            if let Some(event) = inner.events.get_mut(index) {
                event.complete(result);
            }
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.read().events.clone()
    }

    pub fn completed_events(&self) -> Vec<Event> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| e.is_complete())
            .cloned()
            .collect()
    }

    pub fn pending_events(&self) -> Vec<Event> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| !e.is_complete())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.events.clear();
        inner.pending.clear();
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events())
    }

    /// Import from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let events: Vec<Event> = serde_json::from_str(json)?;
        let log = Self::new();

        let max_op_id = events.iter().map(|e| e.op_id.0).max().unwrap_or(0);
        let pending: HashMap<OperationId, usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_complete())
            .map(|(idx, e)| (e.op_id, idx))
            .collect();

        {
            let mut inner = log.inner.write();
            inner.events = events;
            inner.pending = pending;
        }
        log.next_op_id.store(max_op_id + 1, Ordering::SeqCst);

        Ok(log)
    }

    pub fn events_by_type(&self, filter: impl Fn(&OperationType) -> bool) -> Vec<Event> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| filter(&e.op_type))
            .cloned()
            .collect()
    }

    /// `(docid, lazy)` of every document open, in call order
    pub fn document_opens(&self) -> Vec<(DocId, bool)> {
        self.events_by_type(|op| matches!(op, OperationType::OpenDocument { .. }))
            .into_iter()
            .filter_map(|e| match e.op_type {
                OperationType::OpenDocument { did, lazy } => Some((did, lazy)),
                _ => None,
            })
            .collect()
    }

    /// Docids opened without the lazy flag, in call order
    pub fn strict_opens(&self) -> Vec<DocId> {
        self.document_opens()
            .into_iter()
            .filter(|(_, lazy)| !lazy)
            .map(|(did, _)| did)
            .collect()
    }

    pub fn posting_list_opens(&self) -> Vec<String> {
        self.events_by_type(|op| matches!(op, OperationType::OpenPostingList { .. }))
            .into_iter()
            .filter_map(|e| match e.op_type {
                OperationType::OpenPostingList { term } => Some(term),
                _ => None,
            })
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_basic() {
        let log = EventLog::new();

        let op_id = log.record_invoke(OperationType::DeleteDocument { did: 1 });

        assert_eq!(log.len(), 1);
        assert_eq!(log.pending_events().len(), 1);
        assert_eq!(log.completed_events().len(), 0);

        log.record_return(op_id, OperationResult::Success);

        assert_eq!(log.pending_events().len(), 0);
        assert_eq!(log.completed_events().len(), 1);
    }

    #[test]
    fn test_out_of_order_completion() {
        let log = EventLog::new();
        let op1 = log.record_invoke(OperationType::OpenDocument { did: 1, lazy: true });
        let op2 = log.record_invoke(OperationType::OpenDocument { did: 1, lazy: false });

        log.record_return(op2, OperationResult::Success);
        assert_eq!(log.pending_events().len(), 1);
        log.record_return(op1, OperationResult::Success);
        assert_eq!(log.completed_events().len(), 2);

        assert_eq!(log.document_opens(), vec![(1, true), (1, false)]);
        assert_eq!(log.strict_opens(), vec![1]);
    }

    #[test]
    fn test_event_log_json_roundtrip() {
        let log = EventLog::new();
        let op_id = log.record_invoke(OperationType::OpenPostingList {
            term: "rust".to_string(),
        });
        log.record_return(op_id, OperationResult::Success);
        log.record_invoke(OperationType::AddDocument);

        let json = log.to_json().unwrap();
        let restored = EventLog::from_json(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.pending_events().len(), 1);
        assert_eq!(restored.posting_list_opens(), vec!["rust".to_string()]);

        let next = restored.record_invoke(OperationType::BeginTransaction);
        assert_eq!(next, OperationId::new(3));
    }

    #[test]
    fn test_event_log_clear() {
        let log = EventLog::new();
        log.record_invoke(OperationType::AddDocument);
        log.clear();
        assert!(log.is_empty());
    }
}
