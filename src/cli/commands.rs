use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gtree",
    about = concat!("gorev-tree v", env!("CARGO_PKG_VERSION"), " - a task tree over the gorev store"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding gorev-tree.toml and the saved view state
    #[arg(short = 'C', long = "state-dir", global = true)]
    pub state_dir: Option<String>,

    /// Command line that starts the task store server (overrides the config)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// More log output on stderr (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree (default)
    Tree(TreeArgs),
    /// Show task details and subtask progress
    Show(ShowArgs),
    /// List projects, or set the active one
    Projects(ProjectsArgs),
    /// List task templates
    Templates(TemplatesArgs),
    /// Show store-wide counts
    Summary,
    /// Create a task, a subtask or a task from a template
    Add(AddArgs),
    /// Change fields of a task
    Edit(EditArgs),
    /// Add or remove a dependency between two tasks
    Dep(DepArgs),
    /// Move tasks under another task, to the root, or into a group
    Move(MoveArgs),
    /// Set the status of tasks
    Status(StatusArgs),
    /// Permanently delete tasks
    Delete(DeleteArgs),
    /// List or remove saved filter profiles
    Profiles(ProfilesArgs),
    /// Change the remembered selection
    Select(SelectArgs),
}

// ---------------------------------------------------------------------------
// View args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct TreeArgs {
    /// Case-insensitive text to search in titles, descriptions and tags
    #[arg(long, short)]
    pub search: Option<String>,
    /// Only tasks with this status (pending, in-progress, completed)
    #[arg(long)]
    pub status: Option<String>,
    /// Only tasks with this priority (high, medium, low)
    #[arg(long)]
    pub priority: Option<String>,
    /// Only tasks of this project ID
    #[arg(long)]
    pub project: Option<String>,
    /// Only tasks carrying any of these tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Only overdue tasks
    #[arg(long)]
    pub overdue: bool,
    /// Only tasks due today
    #[arg(long)]
    pub due_today: bool,
    /// Only tasks due within seven days
    #[arg(long)]
    pub due_this_week: bool,
    /// Only tasks with at least one tag
    #[arg(long)]
    pub tagged: bool,
    /// Only tasks with dependencies
    #[arg(long)]
    pub has_deps: bool,
    /// Group by: none, status, priority, project, tag, due-date
    #[arg(long, short)]
    pub group: Option<String>,
    /// Sort by: title, priority, status, due-date, created
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// List matches without nesting
    #[arg(long)]
    pub flat: bool,
    /// Which relatives of a match stay visible: flat, path, subtree
    #[arg(long, conflicts_with = "flat")]
    pub hierarchy: Option<String>,
    /// Hide completed tasks
    #[arg(long)]
    pub hide_completed: bool,
    /// Toggle a group open or closed by key (repeatable)
    #[arg(long = "toggle-group")]
    pub toggle_group: Vec<String>,
    /// Collapse or expand a task's children by ID (repeatable)
    #[arg(long = "toggle-task")]
    pub toggle_task: Vec<String>,
    /// Start from a saved filter profile
    #[arg(long)]
    pub profile: Option<String>,
    /// Save the resulting filter as a named profile
    #[arg(long)]
    pub save_profile: Option<String>,
    /// Remember these view settings for later runs
    #[arg(long)]
    pub remember: bool,
    /// Also write grouping and sort as defaults to gorev-tree.toml
    #[arg(long)]
    pub save_default: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

#[derive(Args)]
pub struct ProjectsArgs {
    /// Make this project active
    #[arg(long)]
    pub activate: Option<String>,
}

#[derive(Args)]
pub struct TemplatesArgs {
    /// Only this category
    #[arg(long)]
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
#[command(group(ArgGroup::new("source").args(["title", "template"]).required(true)))]
pub struct AddArgs {
    /// Task title
    pub title: Option<String>,
    #[arg(long, short)]
    pub description: Option<String>,
    /// high, medium or low
    #[arg(long, short)]
    pub priority: Option<String>,
    /// Project ID (ignored for subtasks)
    #[arg(long)]
    pub project: Option<String>,
    /// Due date, YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
    /// Tag (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Create as a subtask of this task
    #[arg(long, conflicts_with = "template")]
    pub parent: Option<String>,
    /// Create from this template ID
    #[arg(long)]
    pub template: Option<String>,
    /// Template field value as KEY=VALUE (repeatable)
    #[arg(long = "field", requires = "template")]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
    /// Due date, YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct DepArgs {
    /// Action: "add" or "rm"
    pub action: String,
    /// Task that depends on the other
    pub id: String,
    /// Task it depends on
    pub dep_id: String,
    /// Link kind sent with "add"
    #[arg(long, default_value = "depends_on")]
    pub kind: String,
}

#[derive(Args)]
#[command(group(ArgGroup::new("target").args(["onto", "root", "to_group"]).required(true)))]
pub struct MoveArgs {
    /// Task IDs to move (default: the remembered selection)
    pub ids: Vec<String>,
    /// New parent task ID
    #[arg(long)]
    pub onto: Option<String>,
    /// Make the tasks root tasks
    #[arg(long)]
    pub root: bool,
    /// Drop on a group of the remembered grouping, e.g. "completed",
    /// "high" or "project:<id>", to change that field instead
    #[arg(long)]
    pub to_group: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// New status (pending, in-progress, completed)
    pub status: String,
    /// Task IDs (default: the remembered selection)
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Task IDs (default: the remembered selection)
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct ProfilesArgs {
    /// Remove the named profile
    #[arg(long)]
    pub remove: Option<String>,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Task ID to click
    #[arg(required_unless_present = "clear")]
    pub id: Option<String>,
    /// Toggle the task in the current selection
    #[arg(long)]
    pub add: bool,
    /// Extend from the anchor through this task in view order
    #[arg(long)]
    pub range: bool,
    /// Clear the selection
    #[arg(long, conflicts_with_all = ["add", "range"])]
    pub clear: bool,
}
