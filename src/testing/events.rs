//! Event types for capturing collection calls
//!
//! Events record which collection entry points a posting list tree or a
//! test touched, in call order, so tests can assert on access patterns as
//! well as on results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::DocId;

/// Unique identifier for an operation; increases in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u64);

impl OperationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Collection entry point that was called
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationType {
    OpenDocument { did: DocId, lazy: bool },
    OpenPostingList { term: String },
    AddDocument,
    ReplaceDocument { did: DocId },
    DeleteDocument { did: DocId },
    BeginTransaction,
    CommitTransaction,
    CancelTransaction,
}

/// Outcome of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationResult {
    Success,
    DocumentAdded { did: DocId },
    NotFound { did: DocId },
    Error { message: String },
}

/// A recorded call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub op_id: OperationId,
    pub op_type: OperationType,
    /// None while the call is in progress
    pub result: Option<OperationResult>,
}

impl Event {
    pub fn invoke(op_id: OperationId, op_type: OperationType) -> Self {
        Self {
            op_id,
            op_type,
            result: None,
        }
    }

    pub fn complete(&mut self, result: OperationResult) {
        self.result = Some(result);
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    pub fn succeeded(&self) -> bool {
        matches!(
            self.result,
            Some(OperationResult::Success) | Some(OperationResult::DocumentAdded { .. })
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({}) {:?} -> ", self.op_id.0, self.op_type)?;
        match &self.result {
            Some(result) => write!(f, "{:?}", result),
            None => write!(f, "<pending>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_completion() {
        let mut event = Event::invoke(
            OperationId::new(1),
            OperationType::OpenDocument { did: 4, lazy: true },
        );
        assert!(!event.is_complete());
        assert!(event.to_string().ends_with("<pending>"));

        event.complete(OperationResult::NotFound { did: 4 });
        assert!(event.is_complete());
        assert!(!event.succeeded());
    }

    #[test]
    fn test_operation_ids_order() {
        assert!(OperationId::new(1) < OperationId::new(2));
    }
}
