//! Integration tests for the visibility filter.

mod common;

use common::{company, person, task};
use squad_tasks::access::AccessLevel;
use squad_tasks::visibility::{self, VisibilityRule};

#[test]
fn involvement_dominates_team_rules() {
    let outsider_creator = person("o", "Finance", AccessLevel::Colaborador);
    let me = person("me", "QA", AccessLevel::Colaborador);
    let people = vec![outsider_creator, me.clone()];
    let by_id = visibility::index_collaborators(&people);

    let assigned = task("t1", "me", "o", &[]);
    let created = task("t2", "o", "me", &[]);
    assert_eq!(
        visibility::task_visibility(&assigned, &me, &by_id),
        Some(VisibilityRule::Involved)
    );
    assert_eq!(
        visibility::task_visibility(&created, &me, &by_id),
        Some(VisibilityRule::Involved)
    );
}

#[test]
fn teammate_task_needs_replication_for_non_managers() {
    let me = person("me", "QA", AccessLevel::Colaborador);
    let mate = person("mate", " qa ", AccessLevel::Colaborador);
    let people = vec![me.clone(), mate];

    let mut t = task("t", "mate", "mate", &[]);
    assert!(visibility::visible_tasks(std::slice::from_ref(&t), &people, &me).is_empty());

    t.is_replicated = true;
    let visible = visibility::visible_tasks(std::slice::from_ref(&t), &people, &me);
    assert_eq!(visible.len(), 1);
}

#[test]
fn managers_see_their_team_but_not_other_teams() {
    let gestor = person("g", "QA", AccessLevel::Gestor);
    let mate = person("m", "QA", AccessLevel::Colaborador);
    let dev = person("d", "Dev", AccessLevel::Colaborador);
    let people = vec![gestor.clone(), mate, dev];

    let tasks = vec![
        task("qa-task", "m", "m", &[]),
        task("dev-task", "d", "d", &[]),
        task("created-by-mate", "d", "m", &[]),
    ];
    let visible = visibility::visible_tasks(&tasks, &people, &gestor);
    let ids: Vec<_> = visible.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["qa-task", "created-by-mate"]);
}

#[test]
fn admins_see_every_company_and_collaborator_but_not_every_task() {
    let admin = person("a", "Board", AccessLevel::Admin);
    let dev = person("d", "Dev", AccessLevel::Colaborador);
    let people = vec![admin.clone(), dev];
    let companies = vec![
        company("c2", "beta", &["Dev"]),
        company("c1", "Alpha", &["QA"]),
    ];
    let tasks = vec![task("t", "d", "d", &[])];

    let set = visibility::filter(&tasks, &companies, &people, &admin);
    assert_eq!(set.collaborators.len(), 2);
    let names: Vec<_> = set.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "beta"]);
    assert!(set.tasks.is_empty());
}

#[test]
fn companies_match_team_case_insensitively() {
    let me = person("me", "Qa", AccessLevel::Colaborador);
    let companies = vec![
        company("c1", "Acme", &["QA ", "Dev"]),
        company("c2", "Globex", &["Dev"]),
    ];
    let visible = visibility::visible_companies(&companies, &me);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, "c1");
}

#[test]
fn reminders_follow_the_same_rules() {
    let gestor = person("g", "QA", AccessLevel::Gestor);
    let other_team = person("o", "Dev", AccessLevel::Colaborador);
    let people = vec![gestor.clone(), other_team];

    let mut reminder = task("r", "o", "o", &[]);
    reminder.reminder = Some(reminder.due_date);
    assert!(visibility::visible_tasks(&[reminder], &people, &gestor).is_empty());
}
