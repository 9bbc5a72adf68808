//! Typed bookkeeping for best-effort multi-item writes.
//!
//! Bulk operations (ledger creation, service-master replacement) write each
//! item independently and keep going on failure. The outcome records which
//! keys landed and which did not, and is serialized into the response body.

use serde::{Deserialize, Serialize};

/// A single item that failed to write, with the backend's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub key: String,
    pub reason: String,
}

/// Per-item result of a best-effort batch write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful write of `key`.
    pub fn ok(&mut self, key: impl Into<String>) {
        self.succeeded.push(key.into());
    }

    /// Records a failed write of `key`.
    pub fn fail(&mut self, key: impl Into<String>, reason: impl ToString) {
        self.failed.push(BatchFailure {
            key: key.into(),
            reason: reason.to_string(),
        });
    }

    /// Whether every item landed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Folds another outcome into this one.
    pub fn merge(&mut self, other: BatchOutcome) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcome_is_complete() {
        assert!(BatchOutcome::new().is_complete());
    }

    #[test]
    fn test_failure_marks_incomplete() {
        let mut outcome = BatchOutcome::new();
        outcome.ok("a@example.com");
        outcome.fail("b@example.com", "throughput exceeded");
        assert!(!outcome.is_complete());
        assert_eq!(outcome.succeeded, vec!["a@example.com"]);
        assert_eq!(outcome.failed[0].key, "b@example.com");
    }

    #[test]
    fn test_merge_combines_both_sides() {
        let mut left = BatchOutcome::new();
        left.ok("a");
        let mut right = BatchOutcome::new();
        right.fail("b", "boom");
        left.merge(right);
        assert_eq!(left.succeeded.len(), 1);
        assert_eq!(left.failed.len(), 1);
    }
}
