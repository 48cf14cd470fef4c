use crate::model::project::{HierarchyProgress, Summary};
use crate::parse::line;

/// Parse the workspace summary block (`Toplam görev sayısı: 25`, ...).
/// Missing counters stay zero.
pub fn parse_summary(text: &str) -> Summary {
    let mut summary = Summary::default();
    for line in line::tokenize(text) {
        let line::LineKind::Label { key, value } = line.kind else {
            continue;
        };
        let count = || line::first_number(value).unwrap_or(0);
        match key.to_lowercase().as_str() {
            "toplam görev sayısı" | "toplam görev" => summary.total_tasks = count(),
            "tamamlanan" => summary.completed = count(),
            "devam eden" => summary.in_progress = count(),
            "bekleyen" | "beklemede" => summary.pending = count(),
            "toplam proje sayısı" | "toplam proje" => summary.total_projects = count(),
            "aktif proje" => summary.active_project = active_name(value),
            _ => {}
        }
    }
    summary
}

fn active_name(value: &str) -> Option<String> {
    let value = value.trim();
    let lowered = value.to_lowercase();
    if value.is_empty() || lowered.starts_with("yok") || lowered == "none" || value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Lowercase a label key. Turkish dotted capital I lowercases to `i` plus a
/// combining dot, which is dropped so `İlerleme` folds to `ilerleme`.
fn fold_key(key: &str) -> String {
    key.to_lowercase().replace('\u{307}', "")
}

/// Parse the progress block of a task hierarchy page
pub fn parse_hierarchy_progress(text: &str) -> HierarchyProgress {
    let mut progress = HierarchyProgress::default();
    for line in line::tokenize(text) {
        let line::LineKind::Label { key, value } = line.kind else {
            continue;
        };
        let count = || line::first_number(value).unwrap_or(0);
        match fold_key(key).as_str() {
            "toplam alt görev" => progress.total_subtasks = count(),
            "tamamlanan" => progress.completed = count(),
            "devam eden" => progress.in_progress = count(),
            "beklemede" | "bekleyen" => progress.pending = count(),
            "ilerleme" => {
                progress.percent = line::first_number(value).map(|p| p.min(100) as u8)
            }
            _ => {}
        }
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_summary_block() {
        let input = "## 📊 Özet\n\
            \n\
            **Toplam görev sayısı:** 25\n\
            **Tamamlanan:** 10\n\
            **Devam eden:** 5\n\
            **Bekleyen:** 10\n\
            **Toplam proje sayısı:** 3\n\
            **Aktif proje:** Web App\n";
        assert_eq!(
            parse_summary(input),
            Summary {
                total_tasks: 25,
                completed: 10,
                in_progress: 5,
                pending: 10,
                total_projects: 3,
                active_project: Some("Web App".into()),
            }
        );
    }

    #[test]
    fn no_active_project_sentinel() {
        assert_eq!(parse_summary("Aktif proje: Yok").active_project, None);
        assert_eq!(parse_summary("Aktif proje: none").active_project, None);
        assert_eq!(parse_summary(""), Summary::default());
    }

    #[test]
    fn parses_hierarchy_progress() {
        let input = "## 📊 İstatistikler\n\
            - Toplam alt görev: 4\n\
            - Tamamlanan: 1\n\
            - Devam eden: 2\n\
            - Beklemede: 1\n\
            - İlerleme: 25.0%\n";
        assert_eq!(
            parse_hierarchy_progress(input),
            HierarchyProgress {
                total_subtasks: 4,
                completed: 1,
                in_progress: 2,
                pending: 1,
                percent: Some(25),
            }
        );
    }
}
