use tracing::debug;

use crate::model::project::Project;
use crate::parse::line::{self, LineKind};

/// Parse a project listing: a `###` heading per project followed by
/// `**ID:**`, `**Tanım:**` and `**Görev Sayısı:**` lines.
pub fn parse_projects(text: &str) -> Vec<Project> {
    let mut projects = Vec::new();
    let mut current: Option<Project> = None;

    for line in line::tokenize(text) {
        match line.kind {
            LineKind::Heading { level: 3, text } => {
                push(current.take(), &mut projects);
                let (name, active) = strip_active_marker(strip_icon(text));
                let mut project = Project::new(String::new(), name);
                project.is_active = active;
                current = Some(project);
            }
            LineKind::Label { key, value } => {
                let Some(project) = current.as_mut() else {
                    continue;
                };
                match key.to_lowercase().as_str() {
                    "id" => project.id = line::unquote(value).to_string(),
                    "tanım" | "açıklama" => project.description = value.to_string(),
                    "görev sayısı" => project.task_count = line::first_number(value).unwrap_or(0),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    push(current.take(), &mut projects);
    projects
}

fn push(project: Option<Project>, projects: &mut Vec<Project>) {
    match project {
        Some(p) if !p.id.is_empty() => projects.push(p),
        Some(p) => debug!(name = %p.name, "dropping project without ID"),
        None => {}
    }
}

/// Parse the active project page. `None` when the store reports that no
/// project is active.
pub fn parse_active_project(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if lowered.contains("henüz aktif proje") || lowered.trim() == "none" {
        return None;
    }
    line::tokenize(text)
        .find_map(|l| l.label("ID"))
        .map(|v| line::unquote(v).to_string())
        .filter(|id| !id.is_empty())
}

/// Drop leading emoji and symbols from a heading
fn strip_icon(text: &str) -> &str {
    text.trim_start_matches(|c: char| !c.is_alphanumeric()).trim()
}

fn strip_active_marker(name: &str) -> (&str, bool) {
    for marker in ["(Aktif)", "(aktif)", "(active)"] {
        if let Some(stripped) = name.strip_suffix(marker) {
            return (stripped.trim(), true);
        }
    }
    (name, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_listing() {
        let input = "## Projeler\n\
            \n\
            ### 🔒 Test Project 1 (Aktif)\n\
            - **ID:** proj-1\n\
            - **Tanım:** First project\n\
            - **Görev Sayısı:** 12 (3 tamamlandı)\n\
            \n\
            ### Second\n\
            **ID:** proj-2\n\
            **Görev Sayısı:** 0\n\
            \n\
            ### No id\n\
            **Tanım:** dropped\n";
        let projects = parse_projects(input);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "proj-1");
        assert_eq!(projects[0].name, "Test Project 1");
        assert!(projects[0].is_active);
        assert_eq!(projects[0].description, "First project");
        assert_eq!(projects[0].task_count, 12);
        assert_eq!(projects[1].name, "Second");
        assert!(!projects[1].is_active);
    }

    #[test]
    fn labels_before_any_heading_are_ignored() {
        assert!(parse_projects("**ID:** stray\n").is_empty());
    }

    #[test]
    fn active_project() {
        assert_eq!(
            parse_active_project("## Aktif Proje\n**ID:** proj-1\n**İsim:** Web"),
            Some("proj-1".to_string())
        );
        assert_eq!(parse_active_project("Henüz aktif proje ayarlanmamış."), None);
        assert_eq!(parse_active_project("none"), None);
        assert_eq!(parse_active_project(""), None);
    }
}
