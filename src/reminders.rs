//! Periodic reminder scan.
//!
//! The scanner compares each visible task's `reminder` timestamp against
//! the current instant and reports tasks whose reminder fell within the
//! trailing window. Each task id triggers at most once per scanner
//! lifetime. Triggered ids also enter an "active" set that the user
//! clears by dismissing or viewing the reminder.
//!
//! Scanning is read-only: tasks are borrowed, never modified.

use crate::types::Task;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use tracing::{debug, info};

/// A reminder that just fired.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderNotice {
    pub task_id: String,
    pub title: String,
    pub assignee_id: String,
    pub reminder: DateTime<Utc>,
}

impl ReminderNotice {
    fn from_task(task: &Task, reminder: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            assignee_id: task.assignee_id.clone(),
            reminder,
        }
    }
}

/// Tracks which reminders have fired and which are still unacknowledged.
///
/// Uses internal mutexes so one scanner can be shared between the scan
/// loop and whatever handles dismissals.
pub struct ReminderScanner {
    window: Duration,
    /// Every id that has ever fired. Never cleared.
    notified: Mutex<HashSet<String>>,
    /// Fired and not yet dismissed or viewed.
    active: Mutex<HashSet<String>>,
}

impl ReminderScanner {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            notified: Mutex::new(HashSet::new()),
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a reminder at `at` is due at `now`.
    fn in_window(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        at <= now && now - at <= self.window
    }

    /// Scan `tasks` and return the reminders that fire now.
    pub fn scan(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<ReminderNotice> {
        let mut notified = self.notified.lock().unwrap();
        let mut active = self.active.lock().unwrap();

        let mut fired = Vec::new();
        for task in tasks {
            let Some(at) = task.reminder else {
                continue;
            };
            if !self.in_window(at, now) || active.contains(&task.id) {
                continue;
            }
            if notified.insert(task.id.clone()) {
                active.insert(task.id.clone());
                fired.push(ReminderNotice::from_task(task, at));
            }
        }

        if !fired.is_empty() {
            debug!(count = fired.len(), "Reminders fired");
        }
        fired
    }

    /// The user dismissed a reminder notification.
    pub fn dismiss(&self, task_id: &str) -> bool {
        self.active.lock().unwrap().remove(task_id)
    }

    /// The user opened the reminded task.
    pub fn view(&self, task_id: &str) -> bool {
        self.dismiss(task_id)
    }

    /// Ids fired and not yet acknowledged, sorted.
    pub fn active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.lock().unwrap().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn has_fired(&self, task_id: &str) -> bool {
        self.notified.lock().unwrap().contains(task_id)
    }
}

/// Run the scan every `interval` until `shutdown` resolves.
///
/// `source` supplies the current visible task set on each tick; `notify`
/// receives every notice that fires.
pub async fn run<S, N, F>(
    scanner: &ReminderScanner,
    interval: StdDuration,
    mut source: S,
    mut notify: N,
    shutdown: F,
) where
    S: FnMut() -> Vec<Task>,
    N: FnMut(ReminderNotice),
    F: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(interval_secs = interval.as_secs(), "Reminder scan started");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Reminder scan stopped");
                break;
            }
            _ = ticker.tick() => {
                let tasks = source();
                for notice in scanner.scan(&tasks, Utc::now()) {
                    notify(notice);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskStatus, TransferHistory};
    use chrono::TimeZone;

    fn reminder_task(id: &str, at: DateTime<Utc>) -> Task {
        Task {
            id: id.into(),
            title: format!("Reminder {}", id),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Default::default(),
            assignee_id: "u1".into(),
            company_id: None,
            due_date: at,
            created_at: at - Duration::days(1),
            started_at: None,
            completed_at: None,
            creator_id: Some("u1".into()),
            faq_id: None,
            reminder: Some(at),
            checklist: Vec::new(),
            repeat_frequency: Default::default(),
            attachment_url: None,
            notes: None,
            is_replicated: false,
            transfer_history: TransferHistory::new(),
            due_notification_sent: false,
            last_notification_date: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_fires_once_inside_window() {
        let scanner = ReminderScanner::new(Duration::minutes(2));
        let tasks = vec![reminder_task("r1", now() - Duration::seconds(30))];

        let fired = scanner.scan(&tasks, now());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].task_id, "r1");

        // Still inside the window on the next tick.
        assert!(scanner.scan(&tasks, now() + Duration::seconds(30)).is_empty());
    }

    #[test]
    fn test_dismiss_does_not_refire() {
        let scanner = ReminderScanner::new(Duration::minutes(2));
        let tasks = vec![reminder_task("r1", now())];
        assert_eq!(scanner.scan(&tasks, now()).len(), 1);
        assert!(scanner.dismiss("r1"));
        assert!(scanner.active().is_empty());
        assert!(scanner.scan(&tasks, now() + Duration::seconds(30)).is_empty());
        assert!(scanner.has_fired("r1"));
    }

    #[test]
    fn test_ignores_future_stale_and_plain_tasks() {
        let scanner = ReminderScanner::new(Duration::minutes(2));
        let mut plain = reminder_task("p", now());
        plain.reminder = None;
        let tasks = vec![
            reminder_task("future", now() + Duration::seconds(1)),
            reminder_task("stale", now() - Duration::minutes(3)),
            plain,
        ];
        assert!(scanner.scan(&tasks, now()).is_empty());
    }

    #[test]
    fn test_scan_leaves_tasks_untouched() {
        let scanner = ReminderScanner::new(Duration::minutes(2));
        let tasks = vec![reminder_task("r1", now())];
        let before = tasks.clone();
        scanner.scan(&tasks, now());
        assert_eq!(tasks, before);
    }
}
