use std::fmt;

use im::Vector;
use serde::{Deserialize, Serialize};
use shared::{domain::EntityId, error::ApiError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAction {
    pub name: String,
    pub title: String,
}

impl BulkAction {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: EntityId,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded(EntityId),
    Failed(BulkFailure),
}

/// The single bulk run of the process. A finished run stays readable (with
/// `running == false`) until the next one starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkActionRun {
    pub action: BulkAction,
    pub running: bool,
    pub processed_count: usize,
    pub total_count: usize,
    pub succeeded: usize,
    pub failures: Vector<BulkFailure>,
}

impl BulkActionRun {
    pub(crate) fn start(action: BulkAction, count: usize) -> Self {
        Self {
            action,
            running: true,
            processed_count: 0,
            total_count: count,
            succeeded: 0,
            failures: Vector::new(),
        }
    }

    pub(crate) fn advance(&mut self, outcome: UnitOutcome) {
        self.processed_count += 1;
        match outcome {
            UnitOutcome::Succeeded(_) => self.succeeded += 1,
            UnitOutcome::Failed(failure) => self.failures.push_back(failure),
        }
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_complete(&self) -> bool {
        self.processed_count >= self.total_count
    }

    pub fn summary(&self) -> BulkSummary {
        BulkSummary {
            title: self.action.title.clone(),
            succeeded: self.succeeded,
            total: self.total_count,
            failed_ids: self.failures.iter().map(|failure| failure.id.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSummary {
    pub title: String,
    pub succeeded: usize,
    pub total: usize,
    pub failed_ids: Vec<EntityId>,
}

impl BulkSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed_ids.is_empty() && self.succeeded == self.total
    }
}

impl fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} succeeded.", self.succeeded, self.total)
    }
}
