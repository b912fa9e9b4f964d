//! Dashboard metrics over an already-filtered task set.

use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMetrics {
    pub total: usize,
    pub completed: usize,
    pub archived: usize,
    pub overdue: usize,
    pub in_review: usize,
    /// Percentage of tasks in Done, 0 when there are none.
    pub completion_rate: f64,
}

/// Compute metrics. Callers pass the visible set only.
pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> BoardMetrics {
    let mut metrics = BoardMetrics {
        total: tasks.len(),
        ..Default::default()
    };

    for task in tasks {
        match task.status {
            TaskStatus::Done => metrics.completed += 1,
            TaskStatus::Archived => metrics.archived += 1,
            TaskStatus::Review => metrics.in_review += 1,
            _ => {}
        }
        if task.is_overdue(now) {
            metrics.overdue += 1;
        }
    }

    if metrics.total > 0 {
        metrics.completion_rate = metrics.completed as f64 / metrics.total as f64 * 100.0;
    }
    metrics
}
