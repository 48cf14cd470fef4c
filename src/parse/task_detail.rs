use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::task::{Dependency, Priority, Task, TaskStatus};
use crate::parse::line::{self, LineKind};
use crate::parse::task_list::parse_iso_date;

/// `- Title (ID: x) - status`
static DEPENDENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(ID:\s*([^)]+)\)(?:\s*-\s*(.+))?$").unwrap());

#[derive(PartialEq)]
enum Section {
    Header,
    Description,
    Dependencies,
    Other,
}

/// Parse a single-task detail page. Returns `None` when no ID was found.
pub fn parse_task_detail(text: &str) -> Option<Task> {
    let mut task = Task::new(String::new(), String::new());
    let mut section = Section::Header;
    let mut description: Vec<&str> = Vec::new();

    for line in line::tokenize(text) {
        if let LineKind::Heading { level, text } = line.kind {
            section = match (level, text.to_lowercase().as_str()) {
                (1, _) => {
                    if task.title.is_empty() {
                        task.title = text.to_string();
                    }
                    Section::Header
                }
                (_, "açıklama") => Section::Description,
                (_, "bağımlılıklar") => Section::Dependencies,
                _ => Section::Other,
            };
            continue;
        }

        match section {
            Section::Description => {
                if !line.is_blank() {
                    description.push(line.text);
                }
            }
            Section::Dependencies => {
                let item = match line.kind {
                    LineKind::Bullet(item) => item,
                    LineKind::Label { .. } => line.text.strip_prefix("- ").unwrap_or(line.text),
                    _ => continue,
                };
                if let Some(dep) = parse_dependency(item) {
                    task.dependencies.push(dep);
                }
            }
            Section::Header => {
                let LineKind::Label { key, value } = line.kind else {
                    continue;
                };
                apply_field(&mut task, key, value);
            }
            Section::Other => {}
        }
    }

    if task.id.is_empty() {
        debug!("task detail page carried no ID");
        return None;
    }
    task.description = description.join("\n");
    if !task.dependencies.is_empty() {
        task.dependency_out = task.dependencies.len();
        task.dependency_unmet = task
            .dependencies
            .iter()
            .filter(|d| d.target_status != Some(TaskStatus::Completed))
            .count();
    }
    Some(task)
}

fn apply_field(task: &mut Task, key: &str, value: &str) {
    match key.to_lowercase().as_str() {
        "id" => {
            task.id = value
                .split_whitespace()
                .next()
                .map(|v| line::unquote(v).to_string())
                .unwrap_or_default()
        }
        "durum" => task.status = TaskStatus::from_token(value),
        "öncelik" => task.priority = Priority::from_token(value),
        "proje" => {
            let (name, id) = line::split_id_suffix(value);
            task.project_name = (!name.is_empty()).then(|| name.to_string());
            task.project_id = id.map(str::to_string);
        }
        "üst görev" => task.parent_id = line::split_id_suffix(value).1.map(str::to_string),
        "son tarih" => task.due_date = parse_iso_date(value),
        "oluşturma" | "oluşturulma" => task.created = parse_iso_date(value),
        "etiketler" => task.tags = line::split_csv(value).collect(),
        "bu göreve bağımlı sayısı" => {
            task.dependency_in = line::first_number(value).unwrap_or(0);
        }
        _ => {}
    }
}

fn parse_dependency(item: &str) -> Option<Dependency> {
    let caps = DEPENDENCY.captures(item.trim())?;
    Some(Dependency {
        target_title: caps[1].trim().to_string(),
        target_id: caps[2].trim().to_string(),
        target_status: caps.get(3).and_then(|s| TaskStatus::from_token(s.as_str())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const DETAIL: &str = "# Implement login\n\
        \n\
        **ID:** task-42\n\
        **Durum:** devam_ediyor\n\
        **Öncelik:** yuksek\n\
        **Proje:** Web App (ID: proj-1)\n\
        **Üst Görev:** Auth epic (ID: task-7)\n\
        **Son Tarih:** 2025-08-15\n\
        **Etiketler:** auth, backend\n\
        \n\
        ## Açıklama\n\
        First line.\n\
        \n\
        Second line.\n\
        \n\
        ## Bağımlılıklar\n\
        - Design schema (ID: task-1) - tamamlandi\n\
        - Set up CI (ID: task-2) - beklemede\n\
        \n\
        ## Notlar\n\
        **ID:** not-this-one\n";

    #[test]
    fn parses_full_detail_page() {
        let task = parse_task_detail(DETAIL).unwrap();
        assert_eq!(task.title, "Implement login");
        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.project_name.as_deref(), Some("Web App"));
        assert_eq!(task.project_id.as_deref(), Some("proj-1"));
        assert_eq!(task.parent_id.as_deref(), Some("task-7"));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 8, 15));
        assert_eq!(task.tags.len(), 2);
        assert_eq!(task.description, "First line.\nSecond line.");
        assert_eq!(
            task.dependencies,
            vec![
                Dependency {
                    target_id: "task-1".into(),
                    target_title: "Design schema".into(),
                    target_status: Some(TaskStatus::Completed),
                },
                Dependency {
                    target_id: "task-2".into(),
                    target_title: "Set up CI".into(),
                    target_status: Some(TaskStatus::Pending),
                },
            ]
        );
        assert_eq!((task.dependency_out, task.dependency_unmet), (2, 1));
    }

    #[test]
    fn labels_in_unknown_sections_are_ignored() {
        let task = parse_task_detail(DETAIL).unwrap();
        assert_eq!(task.id, "task-42");
    }

    #[test]
    fn missing_id_yields_none() {
        assert!(parse_task_detail("# Orphan\n**Durum:** beklemede\n").is_none());
        assert!(parse_task_detail("").is_none());
    }
}
