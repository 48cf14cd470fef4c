use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::model::project::{HierarchyProgress, Project, Summary, mark_active};
use crate::model::task::{Priority, Task, TaskStatus};
use crate::model::template::Template;
use crate::parse::{
    TaskEvent, parse_active_project, parse_hierarchy_progress, parse_projects, parse_summary,
    parse_task_detail, parse_task_list, parse_templates,
};
use crate::remote::{ToolClient, ToolError};

/// Filters understood by the store's list tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// List every project instead of only the active one
    pub all_projects: bool,
    pub status: Option<TaskStatus>,
    pub project_id: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            all_projects: true,
            status: None,
            project_id: None,
        }
    }
}

impl ListQuery {
    fn to_args(&self) -> Value {
        let mut args = Map::new();
        args.insert("tum_projeler".into(), Value::Bool(self.all_projects));
        if let Some(status) = self.status {
            args.insert("durum".into(), status.wire_value().into());
        }
        if let Some(project) = &self.project_id {
            args.insert("proje_id".into(), project.as_str().into());
        }
        Value::Object(args)
    }
}

/// Fields of a task or subtask to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }

    fn to_args(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("baslik".into(), self.title.as_str().into());
        args.insert("aciklama".into(), self.description.as_str().into());
        args.insert(
            "oncelik".into(),
            self.priority.unwrap_or(Priority::Medium).wire_value().into(),
        );
        if let Some(project) = &self.project_id {
            args.insert("proje_id".into(), project.as_str().into());
        }
        if let Some(due) = self.due_date {
            args.insert("son_tarih".into(), due.format("%Y-%m-%d").to_string().into());
        }
        if !self.tags.is_empty() {
            args.insert("etiketler".into(), self.tags.join(",").into());
        }
        args
    }
}

/// Partial edit of an existing task; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        *self == TaskEdit::default()
    }

    fn to_args(&self, id: &str) -> Value {
        let mut args = Map::new();
        args.insert("id".into(), id.into());
        if let Some(title) = &self.title {
            args.insert("baslik".into(), title.as_str().into());
        }
        if let Some(description) = &self.description {
            args.insert("aciklama".into(), description.as_str().into());
        }
        if let Some(priority) = self.priority {
            args.insert("oncelik".into(), priority.wire_value().into());
        }
        if let Some(project) = &self.project_id {
            args.insert("proje_id".into(), project.as_str().into());
        }
        if let Some(due) = self.due_date {
            args.insert("son_tarih".into(), due.format("%Y-%m-%d").to_string().into());
        }
        Value::Object(args)
    }
}

/// Typed operations over the store's tools.
///
/// Responses are parsed here; parsing never fails, so the only errors are
/// the ones the transport or the store itself produced.
pub struct TaskStore<C> {
    client: C,
}

impl<C: ToolClient> TaskStore<C> {
    pub fn new(client: C) -> Self {
        TaskStore { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn call(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.client.call_tool(tool, args).await
    }

    pub async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<TaskEvent>, ToolError> {
        let text = self.call("gorev_listele", query.to_args()).await?;
        let events = parse_task_list(&text);
        debug!(tasks = events.len(), "listed tasks");
        Ok(events)
    }

    /// `None` when the store answered with something that is not a task page
    pub async fn task_detail(&self, id: &str) -> Result<Option<Task>, ToolError> {
        let text = self.call("gorev_detay", json!({ "id": id })).await?;
        Ok(parse_task_detail(&text))
    }

    pub async fn hierarchy(&self, id: &str) -> Result<HierarchyProgress, ToolError> {
        let text = self
            .call("gorev_hiyerarsi_goster", json!({ "gorev_id": id }))
            .await?;
        Ok(parse_hierarchy_progress(&text))
    }

    /// Returns the store's confirmation text
    pub async fn create_task(&self, task: &NewTask) -> Result<String, ToolError> {
        let text = self.call("gorev_olustur", Value::Object(task.to_args())).await?;
        info!(title = %task.title, "task created");
        Ok(text)
    }

    pub async fn create_from_template(
        &self,
        template_id: &str,
        values: &IndexMap<String, String>,
    ) -> Result<String, ToolError> {
        let args = json!({ "template_id": template_id, "degerler": values });
        let text = self.call("templateden_gorev_olustur", args).await?;
        info!(template = template_id, "task created from template");
        Ok(text)
    }

    pub async fn create_subtask(&self, parent_id: &str, task: &NewTask) -> Result<String, ToolError> {
        let mut args = task.to_args();
        // Subtasks inherit the parent's project
        args.remove("proje_id");
        args.insert("parent_id".into(), parent_id.into());
        let text = self.call("gorev_altgorev_olustur", Value::Object(args)).await?;
        info!(parent = parent_id, title = %task.title, "subtask created");
        Ok(text)
    }

    pub async fn update_status(&self, id: &str, status: TaskStatus) -> Result<(), ToolError> {
        self.call(
            "gorev_guncelle",
            json!({ "id": id, "durum": status.wire_value() }),
        )
        .await?;
        Ok(())
    }

    pub async fn edit_task(&self, id: &str, edit: &TaskEdit) -> Result<(), ToolError> {
        self.call("gorev_duzenle", edit.to_args(id)).await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ToolError> {
        self.call("gorev_sil", json!({ "id": id, "onay": true })).await?;
        Ok(())
    }

    /// Move `id` under `new_parent`, or to the root when `None`.
    /// Cycle and project rules are enforced by the store.
    pub async fn change_parent(&self, id: &str, new_parent: Option<&str>) -> Result<(), ToolError> {
        self.call(
            "gorev_ust_degistir",
            json!({ "gorev_id": id, "yeni_parent_id": new_parent.unwrap_or("") }),
        )
        .await?;
        Ok(())
    }

    pub async fn add_dependency(&self, source: &str, target: &str, kind: &str) -> Result<(), ToolError> {
        self.call(
            "gorev_bagimlilik_ekle",
            json!({ "kaynak_id": source, "hedef_id": target, "baglanti_tipi": kind }),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_dependency(&self, source: &str, target: &str) -> Result<(), ToolError> {
        self.call(
            "gorev_bagimlilik_kaldir",
            json!({ "kaynak_id": source, "hedef_id": target }),
        )
        .await?;
        Ok(())
    }

    /// Projects with the active one marked
    pub async fn projects(&self) -> Result<Vec<Project>, ToolError> {
        let mut projects = parse_projects(&self.call("proje_listele", json!({})).await?);
        let active = self.active_project().await?;
        mark_active(&mut projects, active.as_deref());
        Ok(projects)
    }

    pub async fn active_project(&self) -> Result<Option<String>, ToolError> {
        let text = self.call("aktif_proje_goster", json!({})).await?;
        Ok(parse_active_project(&text))
    }

    pub async fn set_active_project(&self, id: &str) -> Result<(), ToolError> {
        self.call("proje_aktif_yap", json!({ "proje_id": id })).await?;
        Ok(())
    }

    pub async fn templates(&self, category: Option<&str>) -> Result<Vec<Template>, ToolError> {
        let args = match category {
            Some(c) => json!({ "kategori": c }),
            None => json!({}),
        };
        Ok(parse_templates(&self.call("template_listele", args).await?))
    }

    pub async fn summary(&self) -> Result<Summary, ToolError> {
        Ok(parse_summary(&self.call("ozet_goster", json!({})).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Records every call and answers with a fixed text per tool
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, Value)>>,
        replies: Vec<(&'static str, &'static str)>,
    }

    impl ToolClient for Recorder {
        async fn call_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
            self.calls.borrow_mut().push((name.to_string(), args));
            Ok(self
                .replies
                .iter()
                .find(|(tool, _)| *tool == name)
                .map(|(_, text)| text.to_string())
                .unwrap_or_default())
        }
    }

    fn last_call(store: &TaskStore<Recorder>) -> (String, Value) {
        store.client().calls.borrow().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn change_parent_to_root_sends_empty_id() {
        let store = TaskStore::new(Recorder::default());
        store.change_parent("t1", None).await.unwrap();
        assert_eq!(
            last_call(&store),
            (
                "gorev_ust_degistir".to_string(),
                json!({ "gorev_id": "t1", "yeni_parent_id": "" })
            )
        );
        store.change_parent("t1", Some("p")).await.unwrap();
        assert_eq!(last_call(&store).1["yeni_parent_id"], "p");
    }

    #[tokio::test]
    async fn mutations_use_wire_values() {
        let store = TaskStore::new(Recorder::default());
        store.update_status("t1", TaskStatus::InProgress).await.unwrap();
        assert_eq!(last_call(&store).1, json!({ "id": "t1", "durum": "devam_ediyor" }));

        store.delete_task("t1").await.unwrap();
        assert_eq!(last_call(&store).1, json!({ "id": "t1", "onay": true }));

        let edit = TaskEdit {
            priority: Some(Priority::High),
            ..Default::default()
        };
        store.edit_task("t1", &edit).await.unwrap();
        assert_eq!(last_call(&store).1, json!({ "id": "t1", "oncelik": "yuksek" }));
    }

    #[tokio::test]
    async fn list_query_arguments() {
        let store = TaskStore::new(Recorder::default());
        store.list_tasks(&ListQuery::default()).await.unwrap();
        assert_eq!(last_call(&store).1, json!({ "tum_projeler": true }));

        let query = ListQuery {
            all_projects: false,
            status: Some(TaskStatus::Pending),
            project_id: Some("p1".into()),
        };
        store.list_tasks(&query).await.unwrap();
        assert_eq!(
            last_call(&store).1,
            json!({ "tum_projeler": false, "durum": "beklemede", "proje_id": "p1" })
        );
    }

    #[tokio::test]
    async fn subtask_carries_parent_not_project() {
        let store = TaskStore::new(Recorder::default());
        let mut task = NewTask::new("Child");
        task.project_id = Some("ignored".into());
        task.tags = vec!["a".into(), "b".into()];
        task.due_date = NaiveDate::from_ymd_opt(2025, 7, 1);
        store.create_subtask("p", &task).await.unwrap();
        let (tool, args) = last_call(&store);
        assert_eq!(tool, "gorev_altgorev_olustur");
        assert_eq!(
            args,
            json!({
                "baslik": "Child",
                "aciklama": "",
                "oncelik": "orta",
                "son_tarih": "2025-07-01",
                "etiketler": "a,b",
                "parent_id": "p"
            })
        );
    }

    #[tokio::test]
    async fn projects_are_marked_active() {
        let store = TaskStore::new(Recorder {
            replies: vec![
                (
                    "proje_listele",
                    "### Alpha\n- **ID:** a1\n- **Görev Sayısı:** 3\n\n### Beta\n- **ID:** b2\n",
                ),
                ("aktif_proje_goster", "**ID:** b2"),
            ],
            ..Default::default()
        });
        let projects = store.projects().await.unwrap();
        let active: Vec<(&str, bool)> = projects
            .iter()
            .map(|p| (p.id.as_str(), p.is_active))
            .collect();
        assert_eq!(active, vec![("a1", false), ("b2", true)]);
    }
}
