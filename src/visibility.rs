//! Visibility filter.
//!
//! Decides which companies, collaborators and tasks an acting user may
//! see. Everything downstream (metrics, agenda, kanban) consumes only the
//! filtered sets.

use crate::types::{Collaborator, Company, Task};
use std::collections::HashMap;

/// The subset of the board one user may see.
#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    pub tasks: Vec<Task>,
    pub companies: Vec<Company>,
    pub collaborators: Vec<Collaborator>,
}

/// Why a task is visible. Rules are evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityRule {
    /// Acting user is the assignee or the creator.
    Involved,
    /// Assignee is a teammate and the task is replicated or the user manages.
    AssigneeTeammate,
    /// Creator is a teammate and the task is replicated or the user manages.
    CreatorTeammate,
}

/// Companies visible to `user`, sorted by name.
pub fn visible_companies(companies: &[Company], user: &Collaborator) -> Vec<Company> {
    let key = user.team_key();
    let mut visible: Vec<Company> = companies
        .iter()
        .filter(|c| user.is_admin() || c.is_visible_to_team(&key))
        .cloned()
        .collect();
    visible.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    visible
}

/// Collaborators visible to `user`: everyone for admins, otherwise the user's team.
pub fn visible_collaborators(
    collaborators: &[Collaborator],
    user: &Collaborator,
) -> Vec<Collaborator> {
    collaborators
        .iter()
        .filter(|c| user.is_admin() || user.shares_team_with(c))
        .cloned()
        .collect()
}

/// Index collaborators by id for repeated lookups.
pub fn index_collaborators(collaborators: &[Collaborator]) -> HashMap<&str, &Collaborator> {
    collaborators.iter().map(|c| (c.id.as_str(), c)).collect()
}

/// Evaluate the task rules for one task. `None` means not visible.
///
/// Reminders get no special treatment: a reminder is visible only through
/// the same rules as any other task.
pub fn task_visibility(
    task: &Task,
    user: &Collaborator,
    by_id: &HashMap<&str, &Collaborator>,
) -> Option<VisibilityRule> {
    if task.is_involved(&user.id) {
        return Some(VisibilityRule::Involved);
    }

    let team_wide = task.is_replicated || user.is_manager();
    if !team_wide {
        return None;
    }

    let teammate = |id: &str| {
        by_id
            .get(id)
            .is_some_and(|other| user.shares_team_with(other))
    };

    if teammate(&task.assignee_id) {
        return Some(VisibilityRule::AssigneeTeammate);
    }
    if task.creator_id.as_deref().is_some_and(teammate) {
        return Some(VisibilityRule::CreatorTeammate);
    }
    None
}

/// Tasks visible to `user`, in input order.
pub fn visible_tasks(tasks: &[Task], collaborators: &[Collaborator], user: &Collaborator) -> Vec<Task> {
    let by_id = index_collaborators(collaborators);
    tasks
        .iter()
        .filter(|t| task_visibility(t, user, &by_id).is_some())
        .cloned()
        .collect()
}

/// Compute the full visible set. Pure; recompute whenever an input changes.
pub fn filter(
    tasks: &[Task],
    companies: &[Company],
    collaborators: &[Collaborator],
    user: &Collaborator,
) -> VisibleSet {
    VisibleSet {
        tasks: visible_tasks(tasks, collaborators, user),
        companies: visible_companies(companies, user),
        collaborators: visible_collaborators(collaborators, user),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;
    use chrono::Utc;

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

    fn task(id: &str, assignee: &str, creator: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            status: Default::default(),
            priority: Default::default(),
            assignee_id: assignee.into(),
            company_id: None,
            due_date: now,
            created_at: now,
            started_at: None,
            completed_at: None,
            creator_id: Some(creator.into()),
            faq_id: None,
            reminder: None,
            checklist: vec![],
            repeat_frequency: Default::default(),
            attachment_url: None,
            notes: None,
            is_replicated: false,
            transfer_history: Default::default(),
            due_notification_sent: false,
            last_notification_date: None,
        }
    }

    #[test]
    fn test_creator_rule_applies_when_assignee_is_elsewhere() {
        let manager = person("m", "QA", AccessLevel::Gestor);
        let teammate = person("t", "qa ", AccessLevel::Colaborador);
        let outsider = person("o", "Dev", AccessLevel::Colaborador);
        let people = vec![manager.clone(), teammate, outsider];
        let by_id = index_collaborators(&people);

        let t = task("x", "o", "t");
        assert_eq!(
            task_visibility(&t, &manager, &by_id),
            Some(VisibilityRule::CreatorTeammate)
        );
    }

    #[test]
    fn test_unknown_assignee_is_not_a_teammate() {
        let manager = person("m", "QA", AccessLevel::Gestor);
        let people = vec![manager.clone()];
        let by_id = index_collaborators(&people);
        let t = task("x", "ghost", "ghost2");
        assert_eq!(task_visibility(&t, &manager, &by_id), None);
    }

    #[test]
    fn test_companies_sorted_by_name() {
        let user = person("u", "QA", AccessLevel::Colaborador);
        let companies = vec![
            Company { id: "2".into(), name: "beta".into(), logo: String::new(), team: vec!["QA".into()] },
            Company { id: "1".into(), name: "Alpha".into(), logo: String::new(), team: vec![" qa".into()] },
            Company { id: "3".into(), name: "Gamma".into(), logo: String::new(), team: vec!["Dev".into()] },
        ];
        let names: Vec<String> = visible_companies(&companies, &user)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "beta"]);
    }
}
