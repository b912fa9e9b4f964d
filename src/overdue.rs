//! Overdue-task escalation planning.
//!
//! Produces the notices that should go out for overdue tasks: one to the
//! assignee and one to each manager of the assignee's team. Delivery is
//! somebody else's job; once it is done, [`mark_notified`] stamps the task
//! so the next run only repeats the notice when it escalates.

use crate::config::OverdueConfig;
use crate::types::{Collaborator, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Attention,
    Urgent,
}

impl Urgency {
    pub fn for_days(days_overdue: i64, config: &OverdueConfig) -> Self {
        if days_overdue >= config.urgent_days {
            Urgency::Urgent
        } else if days_overdue >= config.attention_days {
            Urgency::Attention
        } else {
            Urgency::Normal
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Normal => "normal",
            Urgency::Attention => "attention",
            Urgency::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    Assignee,
    Manager,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueNotice {
    pub task_id: String,
    pub task_title: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub recipient_kind: RecipientKind,
    pub assignee_name: String,
    pub days_overdue: i64,
    pub urgency: Urgency,
}

fn days_overdue(task: &Task, at: DateTime<Utc>) -> i64 {
    (at - task.due_date).num_days()
}

/// Whether an overdue task is due for a notice at `now`.
///
/// A task never notified always is. A notified task is again once its
/// urgency has risen since the last notice or `renotify_after_days` have
/// passed.
pub fn needs_notice(task: &Task, now: DateTime<Utc>, config: &OverdueConfig) -> bool {
    if !task.due_notification_sent {
        return true;
    }
    let Some(last) = task.last_notification_date else {
        return true;
    };
    let escalated = Urgency::for_days(days_overdue(task, now), config)
        > Urgency::for_days(days_overdue(task, last), config);
    escalated || (now - last).num_days() >= config.renotify_after_days
}

/// The task as stored after its notices went out.
pub fn mark_notified(task: &Task, now: DateTime<Utc>) -> Task {
    let mut next = task.clone();
    next.due_notification_sent = true;
    next.last_notification_date = Some(now);
    next
}

/// Plan notices for every overdue task in `tasks`.
///
/// A task qualifies when its due date is at or before `now`, it is not
/// Done or Archived, its assignee is known and [`needs_notice`] holds.
/// Notices are ordered by task, assignee first.
pub fn plan(
    tasks: &[Task],
    collaborators: &[Collaborator],
    now: DateTime<Utc>,
    config: &OverdueConfig,
) -> Vec<OverdueNotice> {
    let mut notices = Vec::new();

    for task in tasks {
        if task.status.is_terminal() || task.due_date > now || !needs_notice(task, now, config) {
            continue;
        }
        let Some(assignee) = collaborators.iter().find(|c| c.id == task.assignee_id) else {
            continue;
        };

        let overdue_days = days_overdue(task, now);
        let urgency = Urgency::for_days(overdue_days, config);
        let notice = |recipient: &Collaborator, kind| OverdueNotice {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            recipient_id: recipient.id.clone(),
            recipient_name: recipient.name.clone(),
            recipient_kind: kind,
            assignee_name: assignee.name.clone(),
            days_overdue: overdue_days,
            urgency,
        };

        notices.push(notice(assignee, RecipientKind::Assignee));
        for manager in collaborators
            .iter()
            .filter(|c| c.id != assignee.id && c.is_manager() && c.shares_team_with(assignee))
        {
            let kind = if manager.is_admin() {
                RecipientKind::Admin
            } else {
                RecipientKind::Manager
            };
            notices.push(notice(manager, kind));
        }
    }

    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;
    use crate::types::{TaskStatus, TransferHistory};
    use chrono::{Duration, TimeZone};

    fn person(id: &str, role: &str, level: AccessLevel) -> Collaborator {
        Collaborator {
            id: id.into(),
            name: id.to_uppercase(),
            email: None,
            avatar: String::new(),
            role: role.into(),
            access_level: level,
            allowed: true,
            area: None,
            must_change_password: false,
        }
    }

    fn task(id: &str, assignee: &str, due: DateTime<Utc>, status: TaskStatus) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            status,
            priority: Default::default(),
            assignee_id: assignee.into(),
            company_id: None,
            due_date: due,
            created_at: due - Duration::days(30),
            started_at: None,
            completed_at: None,
            creator_id: None,
            faq_id: None,
            reminder: None,
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

    #[test]
    fn test_urgency_thresholds() {
        let config = OverdueConfig::default();
        assert_eq!(Urgency::for_days(0, &config), Urgency::Normal);
        assert_eq!(Urgency::for_days(3, &config), Urgency::Attention);
        assert_eq!(Urgency::for_days(7, &config), Urgency::Urgent);
    }

    #[test]
    fn test_notices_go_to_assignee_and_team_managers() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let people = vec![
            person("ana", "QA", AccessLevel::Colaborador),
            person("bia", "qa ", AccessLevel::Gestor),
            person("caio", "QA", AccessLevel::Admin),
            person("duda", "Dev", AccessLevel::Gestor),
        ];
        let tasks = vec![
            task("late", "ana", now - Duration::days(4), TaskStatus::InProgress),
            task("done", "ana", now - Duration::days(9), TaskStatus::Done),
            task("future", "ana", now + Duration::days(1), TaskStatus::Pending),
            task("ghost", "nobody", now - Duration::days(9), TaskStatus::Pending),
        ];

        let notices = plan(&tasks, &people, now, &OverdueConfig::default());
        let recipients: Vec<(&str, RecipientKind)> = notices
            .iter()
            .map(|n| (n.recipient_id.as_str(), n.recipient_kind))
            .collect();
        assert_eq!(
            recipients,
            vec![
                ("ana", RecipientKind::Assignee),
                ("bia", RecipientKind::Manager),
                ("caio", RecipientKind::Admin),
            ]
        );
        assert!(notices.iter().all(|n| n.urgency == Urgency::Attention));
        assert!(notices.iter().all(|n| n.days_overdue == 4));
    }

    #[test]
    fn test_notified_task_waits_for_escalation_or_interval() {
        let config = OverdueConfig::default();
        let due = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let fresh = task("late", "ana", due, TaskStatus::Pending);
        assert!(needs_notice(&fresh, due + Duration::days(1), &config));

        let notified = mark_notified(&fresh, due + Duration::days(1));
        assert!(notified.due_notification_sent);
        assert_eq!(notified.last_notification_date, Some(due + Duration::days(1)));
        // Same urgency, interval not yet elapsed.
        assert!(!needs_notice(&notified, due + Duration::days(2), &config));
        // Crossed into attention.
        assert!(needs_notice(&notified, due + Duration::days(3), &config));

        let attention = mark_notified(&fresh, due + Duration::days(3));
        assert!(!needs_notice(&attention, due + Duration::days(5), &config));
        assert!(needs_notice(&attention, due + Duration::days(6), &config));
    }

    #[test]
    fn test_plan_skips_tasks_already_notified() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let people = vec![person("ana", "QA", AccessLevel::Colaborador)];
        let late = task("late", "ana", now - Duration::days(1), TaskStatus::Pending);
        let quiet = mark_notified(&late, now - Duration::hours(6));
        let notices = plan(&[quiet], &people, now, &OverdueConfig::default());
        assert!(notices.is_empty());
    }

    #[test]
    fn test_manager_assignee_is_not_notified_twice() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let people = vec![person("bia", "QA", AccessLevel::Gestor)];
        let tasks = vec![task("late", "bia", now, TaskStatus::Pending)];
        let notices = plan(&tasks, &people, now, &OverdueConfig::default());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].recipient_kind, RecipientKind::Assignee);
    }
}
