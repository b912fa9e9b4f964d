//! `import-template` subcommand.
//!
//! Reads a processed-document JSON (numbered tasks with subtasks) and turns
//! it into one task template whose tasks carry the subtasks as activities.

use crate::types::{TaskPriority, TaskTemplate, TemplateActivity, TemplateTask};
use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Arguments for the import-template subcommand
#[derive(Args, Debug)]
pub struct ImportTemplateArgs {
    /// Processed document to import
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Acting user id (must be a gestor or admin)
    #[arg(long)]
    pub user: String,

    /// Template name
    #[arg(long, default_value = "Tarefas Squad")]
    pub name: String,

    /// Parse and report without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    #[serde(default)]
    pub processed_at: String,
    #[serde(default)]
    pub total_tasks: usize,
    pub tasks: Vec<ProcessedTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessedTask {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

impl ProcessedDocument {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Build the template. Blank task titles and blank subtasks are skipped.
pub fn build_template(doc: &ProcessedDocument, name: &str, source: &str) -> TaskTemplate {
    let template_id = Uuid::now_v7().to_string();

    let tasks: Vec<TemplateTask> = doc
        .tasks
        .iter()
        .filter(|t| !t.title.trim().is_empty())
        .map(|t| {
            let task_id = Uuid::now_v7().to_string();
            TemplateTask {
                activities: t
                    .subtasks
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| TemplateActivity {
                        id: Uuid::now_v7().to_string(),
                        template_task_id: task_id.clone(),
                        title: s.to_string(),
                    })
                    .collect(),
                id: task_id,
                template_id: template_id.clone(),
                title: t.title.trim().to_string(),
                description: format!("Tarefa {}", t.number),
                priority: TaskPriority::Medium,
            }
        })
        .collect();

    let description = if doc.processed_at.is_empty() {
        format!("Imported from \"{}\". {} tasks.", source, tasks.len())
    } else {
        format!(
            "Imported from \"{}\" processed at {}. {} tasks.",
            source,
            doc.processed_at,
            tasks.len()
        )
    };

    TaskTemplate {
        id: template_id,
        name: name.to_string(),
        description,
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "processedAt": "2025-11-02T10:00:00Z",
        "totalTasks": 3,
        "tasks": [
            {"number": 1, "title": "Onboarding", "subtasks": ["Contrato", " ", "Kickoff"]},
            {"number": 2, "title": "  ", "subtasks": ["ignored"]},
            {"number": 3, "title": "Setup"}
        ]
    }"#;

    #[test]
    fn test_build_template_from_document() {
        let doc: ProcessedDocument = serde_json::from_str(DOC).unwrap();
        assert_eq!(doc.total_tasks, 3);

        let template = build_template(&doc, "Tarefas Squad", "tarefas.json");
        assert_eq!(template.tasks.len(), 2);
        assert!(template.description.contains("2025-11-02T10:00:00Z"));

        let onboarding = &template.tasks[0];
        assert_eq!(onboarding.description, "Tarefa 1");
        assert_eq!(onboarding.template_id, template.id);
        let titles: Vec<_> = onboarding.activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Contrato", "Kickoff"]);
        assert!(onboarding
            .activities
            .iter()
            .all(|a| a.template_task_id == onboarding.id));

        assert!(template.tasks[1].activities.is_empty());
    }
}
