//! Single-writer transaction flag

use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::CuttleError;
use crate::Result;

/// Tracks whether a transaction is open on a writable collection.
///
/// At most one transaction may be open, and it must be committed or
/// cancelled on the thread that began it.
#[derive(Debug, Default)]
pub struct TransactionFlag {
    owner: Mutex<Option<ThreadId>>,
}

impl TransactionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.owner.lock().is_some()
    }

    pub fn begin(&self) -> Result<()> {
        let mut owner = self.owner.lock();
        if owner.is_some() {
            return Err(CuttleError::InvalidOperation(
                "cannot begin transaction: transaction already in progress".to_string(),
            ));
        }
        *owner = Some(thread::current().id());
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.finish("commit")
    }

    pub fn cancel(&self) -> Result<()> {
        self.finish("cancel")
    }

    /// Clear the flag regardless of owner; for rollback on drop
    pub fn force_clear(&self) -> bool {
        self.owner.lock().take().is_some()
    }

    fn finish(&self, action: &str) -> Result<()> {
        let mut owner = self.owner.lock();
        match *owner {
            None => Err(CuttleError::InvalidOperation(format!(
                "cannot {} transaction: no transaction currently in progress",
                action
            ))),
            Some(id) if id != thread::current().id() => Err(CuttleError::InvalidOperation(format!(
                "cannot {} transaction: it was begun on another thread",
                action
            ))),
            Some(_) => {
                *owner = None;
                Ok(())
            }
        }
    }
}
