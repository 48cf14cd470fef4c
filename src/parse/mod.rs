pub mod line;
pub mod project;
pub mod summary;
pub mod task_detail;
pub mod task_list;
pub mod template;

pub use project::{parse_active_project, parse_projects};
pub use summary::{parse_hierarchy_progress, parse_summary};
pub use task_detail::parse_task_detail;
pub use task_list::{TaskEvent, parse_task_list, parse_task_list_on};
pub use template::parse_templates;
