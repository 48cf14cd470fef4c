use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, set_view_defaults};
use crate::io::resolve_state_dir;
use crate::io::state::{self, UiState};
use crate::logging;
use crate::model::config::{Config, ServerConfig};
use crate::model::task::{Priority, TaskStatus};
use crate::model::view::{FilterCriteria, GroupStrategy, HierarchyMode, SortField, ViewPrefs};
use crate::ops::reparent::DropTarget;
use crate::ops::selection::ClickMods;
use crate::remote::{McpClient, NewTask, TaskEdit, ToolClient};
use crate::session::Session;

type CmdResult = Result<(), Box<dyn Error>>;

/// What every command needs besides its own args
struct Context {
    state_dir: PathBuf,
    config: Config,
    doc: toml_edit::DocumentMut,
    json: bool,
    today: NaiveDate,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let state_dir = resolve_state_dir(cli.state_dir.as_deref().map(Path::new));
    let (config, doc) = config_io::read_config(&state_dir)?;
    logging::init(cli.verbose, config.logging.level.as_deref());

    let ctx = Context {
        state_dir,
        config,
        doc,
        json: cli.json,
        today: chrono::Local::now().date_naive(),
    };
    let command = cli.command.unwrap_or(Commands::Tree(TreeArgs::default()));

    // Local-only commands never start the server
    let command = match command {
        Commands::Profiles(args) => return cmd_profiles(&ctx, args),
        Commands::Select(args) if args.clear => return cmd_clear_selection(&ctx),
        other => other,
    };

    let server = server_config(&ctx.config, cli.server.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(command, ctx, server))
}

/// `--server "cmd arg..."` replaces the configured command line
fn server_config(config: &Config, line: Option<&str>) -> Result<ServerConfig, Box<dyn Error>> {
    let mut server = config.server.clone();
    if let Some(line) = line {
        let mut words = line.split_whitespace().map(str::to_string);
        server.command = words.next().ok_or("--server needs a command")?;
        server.args = words.collect();
    }
    Ok(server)
}

async fn run(command: Commands, mut ctx: Context, server: ServerConfig) -> CmdResult {
    debug!(command = %server.command, "starting task store");
    let client = McpClient::spawn(&server).await?;
    let state = state::read_ui_state(&ctx.state_dir).unwrap_or_else(|| default_state(&ctx.config));
    let session = Session::from_state(client, state);

    let result = match command {
        Commands::Tree(args) => cmd_tree(&session, args, &mut ctx).await,
        Commands::Show(args) => cmd_show(&session, args, &ctx).await,
        Commands::Projects(args) => cmd_projects(&session, args, &ctx).await,
        Commands::Templates(args) => cmd_templates(&session, args, &ctx).await,
        Commands::Summary => cmd_summary(&session, &ctx).await,
        Commands::Add(args) => cmd_add(&session, args, &ctx).await,
        Commands::Edit(args) => cmd_edit(&session, args).await,
        Commands::Dep(args) => cmd_dep(&session, args).await,
        Commands::Move(args) => cmd_move(&session, args, &ctx).await,
        Commands::Status(args) => cmd_status(&session, args, &ctx).await,
        Commands::Delete(args) => cmd_delete(&session, args, &ctx).await,
        Commands::Select(args) => cmd_select(&session, args, &ctx).await,
        Commands::Profiles(args) => cmd_profiles(&ctx, args),
    };
    print_notices(&session.drain_notices());
    result
}

/// Preferences for a state directory that has never remembered any
fn default_state(config: &Config) -> UiState {
    UiState {
        prefs: ViewPrefs {
            grouping: config.view.grouping,
            sort: config.view.sort_spec(),
            hierarchy: config.view.hierarchy,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn load_local_state(ctx: &Context) -> UiState {
    state::read_ui_state(&ctx.state_dir).unwrap_or_else(|| default_state(&ctx.config))
}

async fn load<C: ToolClient>(session: &Session<C>) -> CmdResult {
    session.refresh().await;
    if session.is_loaded() {
        Ok(())
    } else {
        Err("no task data available".into())
    }
}

/// Write back the selection, keeping the remembered view settings
fn persist_selection<C: ToolClient>(session: &Session<C>, ctx: &Context) -> CmdResult {
    let mut stored = load_local_state(ctx);
    stored.selection = session.selection().clone();
    state::write_ui_state(&ctx.state_dir, &stored)?;
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn parse_status(s: &str) -> Result<TaskStatus, Box<dyn Error>> {
    TaskStatus::from_token(s)
        .ok_or_else(|| format!("unknown status '{}' (use pending, in-progress or completed)", s).into())
}

fn parse_priority(s: &str) -> Result<Priority, Box<dyn Error>> {
    Priority::from_token(s)
        .ok_or_else(|| format!("unknown priority '{}' (use high, medium or low)", s).into())
}

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s).into())
}

fn filter_from_args(args: &TreeArgs) -> Result<FilterCriteria, Box<dyn Error>> {
    Ok(FilterCriteria {
        search_text: args.search.clone(),
        status: args.status.as_deref().map(parse_status).transpose()?,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        project_id: args.project.clone(),
        tags: args.tag.clone(),
        overdue: args.overdue,
        due_today: args.due_today,
        due_this_week: args.due_this_week,
        has_any_tag: args.tagged,
        has_dependency: args.has_deps,
    })
}

/// Parse repeated `KEY=VALUE` template fields
fn parse_fields(fields: &[String]) -> Result<IndexMap<String, String>, Box<dyn Error>> {
    fields
        .iter()
        .map(|field| -> Result<(String, String), Box<dyn Error>> {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| format!("template field '{}' must be KEY=VALUE", field))?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Explicit IDs, or the remembered selection when none are given
fn select_targets<C: ToolClient>(session: &Session<C>, ids: Vec<String>, ctx: &Context) -> CmdResult {
    if ids.is_empty() {
        return Ok(());
    }
    session.clear_selection();
    for id in &ids {
        session.select(id, ClickMods { additive: true, range: false }, ctx.today)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Local commands
// ---------------------------------------------------------------------------

fn cmd_profiles(ctx: &Context, args: ProfilesArgs) -> CmdResult {
    let mut stored = load_local_state(ctx);

    if let Some(name) = args.remove {
        if stored.profiles.shift_remove(name.trim()).is_none() {
            return Err(format!("no saved filter named \"{}\"", name).into());
        }
        state::write_ui_state(&ctx.state_dir, &stored)?;
        println!("Removed filter \"{}\".", name.trim());
        return Ok(());
    }

    if ctx.json {
        let profiles: Vec<ProfileJson> = stored
            .profiles
            .iter()
            .map(|(name, filter)| ProfileJson { name, filter })
            .collect();
        return print_json(&profiles);
    }
    if stored.profiles.is_empty() {
        println!("No saved filters.");
    }
    for (name, filter) in &stored.profiles {
        println!("{}", format_profile(name, filter));
    }
    Ok(())
}

fn cmd_clear_selection(ctx: &Context) -> CmdResult {
    let mut stored = load_local_state(ctx);
    stored.selection.clear();
    state::write_ui_state(&ctx.state_dir, &stored)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

async fn cmd_tree<C: ToolClient>(session: &Session<C>, args: TreeArgs, ctx: &mut Context) -> CmdResult {
    if let Some(name) = &args.profile {
        session.apply_profile(name);
    }
    let filter = filter_from_args(&args)?;
    let grouping = match &args.group {
        Some(name) => Some(
            GroupStrategy::from_name(name).ok_or_else(|| format!("unknown grouping '{}'", name))?,
        ),
        None => None,
    };
    let sort = match &args.sort {
        Some(name) => Some(SortField::from_name(name).ok_or_else(|| format!("unknown sort '{}'", name))?),
        None => None,
    };
    let hierarchy = if args.flat {
        Some(HierarchyMode::Flat)
    } else {
        match &args.hierarchy {
            Some(name) => Some(
                HierarchyMode::from_name(name)
                    .ok_or_else(|| format!("unknown hierarchy mode '{}'", name))?,
            ),
            None => None,
        }
    };

    session.update_prefs(|prefs| {
        prefs.filter.merge(filter);
        if let Some(grouping) = grouping {
            prefs.set_grouping(grouping);
        }
        if let Some(field) = sort {
            prefs.sort.field = field;
            prefs.sort.ascending = true;
        }
        if args.desc {
            prefs.sort.ascending = false;
        }
        if let Some(mode) = hierarchy {
            prefs.hierarchy = mode;
        }
        if args.hide_completed {
            prefs.hide_completed = true;
        }
        for key in &args.toggle_group {
            prefs.toggle_group(key);
        }
        for id in &args.toggle_task {
            prefs.toggle_task(id);
        }
    });

    if let Some(name) = &args.save_profile {
        session.save_profile(name);
    }
    if args.remember {
        state::write_ui_state(&ctx.state_dir, &session.to_state())?;
    } else if args.save_profile.is_some() {
        let mut stored = load_local_state(ctx);
        stored.profiles = session.to_state().profiles;
        state::write_ui_state(&ctx.state_dir, &stored)?;
    }
    if args.save_default {
        set_view_defaults(&mut ctx.doc, &session.prefs());
        config_io::write_config(&ctx.state_dir, &ctx.doc)?;
    }

    load(session).await?;
    let view = session.render(ctx.today);
    if ctx.json {
        return print_json(&view);
    }
    print_lines(&format_view(&view));
    Ok(())
}

async fn cmd_show<C: ToolClient>(session: &Session<C>, args: ShowArgs, ctx: &Context) -> CmdResult {
    let task = session
        .store()
        .task_detail(&args.id)
        .await?
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    // Tasks without subtasks may have no hierarchy page
    let progress = match session.store().hierarchy(&args.id).await {
        Ok(progress) => Some(progress),
        Err(e) => {
            debug!(id = %args.id, error = %e, "no hierarchy progress");
            None
        }
    };

    if ctx.json {
        return print_json(&TaskDetailJson {
            task: &task,
            progress: progress.as_ref(),
        });
    }
    print_lines(&format_task_detail(&task, progress.as_ref()));
    Ok(())
}

async fn cmd_projects<C: ToolClient>(session: &Session<C>, args: ProjectsArgs, ctx: &Context) -> CmdResult {
    if let Some(id) = &args.activate {
        session.store().set_active_project(id).await?;
    }
    let projects = session.store().projects().await?;
    if ctx.json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects.");
    }
    for project in &projects {
        println!("{}", format_project_line(project));
    }
    Ok(())
}

async fn cmd_templates<C: ToolClient>(session: &Session<C>, args: TemplatesArgs, ctx: &Context) -> CmdResult {
    let templates = session.store().templates(args.category.as_deref()).await?;
    if ctx.json {
        return print_json(&templates);
    }
    if templates.is_empty() {
        println!("No templates.");
    }
    print_lines(&format_templates(&templates));
    Ok(())
}

async fn cmd_summary<C: ToolClient>(session: &Session<C>, ctx: &Context) -> CmdResult {
    let summary = session.store().summary().await?;
    if ctx.json {
        return print_json(&summary);
    }
    print_lines(&format_summary(&summary));
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

async fn cmd_add<C: ToolClient>(session: &Session<C>, args: AddArgs, ctx: &Context) -> CmdResult {
    let message = if let Some(template) = &args.template {
        let values = parse_fields(&args.fields)?;
        session.store().create_from_template(template, &values).await?
    } else {
        let title = args.title.ok_or("a title or --template is required")?;
        let mut task = NewTask::new(title);
        task.description = args.description.unwrap_or_default();
        task.priority = args.priority.as_deref().map(parse_priority).transpose()?;
        task.project_id = args.project;
        task.due_date = args.due.as_deref().map(parse_date).transpose()?;
        task.tags = args.tag;
        match &args.parent {
            Some(parent) => session.store().create_subtask(parent, &task).await?,
            None => session.store().create_task(&task).await?,
        }
    };

    if ctx.json {
        return print_json(&serde_json::json!({ "message": message.trim() }));
    }
    println!("{}", message.trim());
    Ok(())
}

async fn cmd_edit<C: ToolClient>(session: &Session<C>, args: EditArgs) -> CmdResult {
    let edit = TaskEdit {
        title: args.title,
        description: args.description,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        project_id: args.project,
        due_date: args.due.as_deref().map(parse_date).transpose()?,
    };
    if edit.is_empty() {
        return Err("nothing to change (pass --title, --description, --priority, --project or --due)".into());
    }
    session.store().edit_task(&args.id, &edit).await?;
    println!("Updated {}", args.id);
    Ok(())
}

async fn cmd_dep<C: ToolClient>(session: &Session<C>, args: DepArgs) -> CmdResult {
    match args.action.as_str() {
        "add" => {
            session.store().add_dependency(&args.id, &args.dep_id, &args.kind).await?;
            println!("{} {} {}", args.id, args.kind, args.dep_id);
        }
        "rm" | "remove" => {
            session.store().remove_dependency(&args.id, &args.dep_id).await?;
            println!("Removed dependency {} -> {}", args.id, args.dep_id);
        }
        other => return Err(format!("unknown dep action '{}' (use add or rm)", other).into()),
    }
    Ok(())
}

async fn cmd_move<C: ToolClient>(session: &Session<C>, args: MoveArgs, ctx: &Context) -> CmdResult {
    load(session).await?;
    let ids: Vec<String> = if args.ids.is_empty() {
        session.selection().ids().map(str::to_string).collect()
    } else {
        args.ids
    };
    let target = match (args.onto, args.to_group) {
        (Some(parent), _) => DropTarget::Task(parent),
        (None, Some(key)) => DropTarget::Group {
            strategy: session.prefs().grouping,
            key,
        },
        (None, None) => DropTarget::Canvas,
    };

    let state = session.move_tasks(&ids, target).await?;
    persist_selection(session, ctx)?;
    if ctx.json {
        return print_json(&drag_to_json(&state));
    }
    print_lines(&format_drag(&state));
    Ok(())
}

async fn cmd_status<C: ToolClient>(session: &Session<C>, args: StatusArgs, ctx: &Context) -> CmdResult {
    let status = parse_status(&args.status)?;
    load(session).await?;
    select_targets(session, args.ids, ctx)?;

    let outcome = session.bulk_set_status(status).await?;
    persist_selection(session, ctx)?;
    if ctx.json {
        return print_json(&bulk_to_json(&outcome));
    }
    print_lines(&format_bulk(&outcome));
    Ok(())
}

async fn cmd_delete<C: ToolClient>(session: &Session<C>, args: DeleteArgs, ctx: &Context) -> CmdResult {
    load(session).await?;
    select_targets(session, args.ids, ctx)?;

    let outcome = session.bulk_delete().await?;
    persist_selection(session, ctx)?;
    if ctx.json {
        return print_json(&bulk_to_json(&outcome));
    }
    print_lines(&format_bulk(&outcome));
    Ok(())
}

async fn cmd_select<C: ToolClient>(session: &Session<C>, args: SelectArgs, ctx: &Context) -> CmdResult {
    let id = args.id.ok_or("a task ID is required")?;
    load(session).await?;
    session.select(
        &id,
        ClickMods {
            additive: args.add,
            range: args.range,
        },
        ctx.today,
    )?;
    persist_selection(session, ctx)?;

    let selected: Vec<String> = session.selection().ids().map(str::to_string).collect();
    if ctx.json {
        return print_json(&selected);
    }
    println!("{} selected: {}", selected.len(), selected.join(", "));
    Ok(())
}
