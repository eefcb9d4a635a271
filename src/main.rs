use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use workbox::graphql::HttpQueryClient;
use workbox::storage::FileKeyValueStore;
use workbox::structured_logger::StructuredLogger;
use workbox::{
    paths, CommandId, ExecutionPhase, FilterCriteria, ItemUri, SortDirection, SortField,
    SortSpec, StateId, ViewQuery, WorkboxConfig, WorkboxController, WorkboxDeps,
    WorkboxSettings, WorkflowCatalog,
};

#[derive(Parser)]
#[command(name = "workbox")]
#[command(about = "Browse items awaiting workflow action and run workflow commands in bulk")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WORKBOX_GIT_SHA"), ")"))]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Config file (defaults to ~/.workbox/workbox.yaml, then the built-in config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the configured workflows with their states and commands
    Workflows,
    /// Show one page of items in a workflow state
    List(ViewArgs),
    /// Add items from the shown page to the selection
    Select {
        #[arg(required = true)]
        uris: Vec<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Remove items from the selection
    Deselect {
        #[arg(required = true)]
        uris: Vec<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Select every item on the page that is still in the browsed state
    SelectPage(ViewArgs),
    /// Show the selected items of a state
    Selection(ViewArgs),
    /// Run a workflow command for the selected items of a state
    Execute {
        /// Command id or display name
        #[arg(long = "command")]
        command_id: String,
        /// Comments recorded with the workflow history entry
        #[arg(long, default_value = "")]
        comments: String,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// Workflow state id (defaults to the first state of the first workflow)
    #[arg(long)]
    state: Option<String>,

    /// Zero-based page index
    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    page_size: Option<u32>,

    /// Path substring
    #[arg(long)]
    path: Option<String>,

    /// Name wildcard, e.g. "home*"
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    template: Option<String>,

    #[arg(long)]
    updated_by: Option<String>,

    /// Sort column: path, name, template-name, updated, updated-by or version
    #[arg(long)]
    sort: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long)]
    ascending: bool,
}

impl ViewArgs {
    fn view_query(&self) -> Result<ViewQuery> {
        let state = self
            .state
            .as_deref()
            .map(StateId::parse)
            .transpose()
            .context("--state must be a workflow state id")?;

        Ok(ViewQuery {
            state,
            page_index: self.page,
            page_size: self.page_size,
            filters: FilterCriteria {
                path: self.path.clone(),
                name: self.name.clone(),
                language: self.language.clone(),
                template_name: self.template.clone(),
                updated_by: self.updated_by.clone(),
                ..FilterCriteria::default()
            },
            sort: self.sort()?,
        })
    }

    fn sort(&self) -> Result<Option<SortSpec>> {
        let Some(column) = self.sort.as_deref() else {
            return Ok(None);
        };
        let field = SortField::parse(column)
            .with_context(|| format!("Unknown sort column: {}", column))?;
        let direction = if self.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        Ok(Some(SortSpec::new(field, direction)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let deps = build_deps(&config)?;

    match cli.command {
        Command::Workflows => print_workflows(&deps, &config).await,
        Command::List(view) => {
            let controller = open(deps, &config, &view).await?;
            print_page(&controller);
            Ok(())
        }
        Command::Select { uris, view } => {
            let mut controller = open(deps, &config, &view).await?;
            for uri in &uris {
                controller
                    .set_item_selected(&ItemUri::from(uri.as_str()), true)
                    .with_context(|| format!("Failed to select {}", uri))?;
            }
            print_counts(&controller);
            Ok(())
        }
        Command::Deselect { uris, view } => {
            let mut controller = open(deps, &config, &view).await?;
            for uri in &uris {
                controller.set_item_selected(&ItemUri::from(uri.as_str()), false)?;
            }
            print_counts(&controller);
            Ok(())
        }
        Command::SelectPage(view) => {
            let mut controller = open(deps, &config, &view).await?;
            controller.select_all_visible()?;
            print_counts(&controller);
            Ok(())
        }
        Command::Selection(view) => {
            let mut controller = open(deps, &config, &view).await?;
            controller.set_show_only_selected(true).await;
            print_page(&controller);
            Ok(())
        }
        Command::Execute {
            command_id,
            comments,
            view,
        } => {
            let mut controller = open(deps, &config, &view).await?;
            execute(&mut controller, &command_id, &comments).await
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<WorkboxConfig> {
    if let Some(path) = explicit {
        return WorkboxConfig::load(path);
    }
    let user_config = paths::config_path()?;
    if user_config.exists() {
        WorkboxConfig::load(&user_config)
    } else {
        WorkboxConfig::default_config()
    }
}

fn build_deps(config: &WorkboxConfig) -> Result<WorkboxDeps> {
    let endpoint = config.endpoint();
    let client = HttpQueryClient::new(
        endpoint.clone(),
        config.access_token(),
        config.request_timeout(),
    );
    let store = FileKeyValueStore::open(paths::state_dir(&endpoint)?)
        .context("Failed to open selection store")?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let logger = match paths::logs_dir(&endpoint)
        .and_then(|dir| StructuredLogger::new(&session_id, &dir))
    {
        Ok(logger) => Some(Arc::new(logger)),
        Err(e) => {
            eprintln!("[workbox] Warning: event log disabled: {:#}", e);
            None
        }
    };

    Ok(WorkboxDeps {
        client: Arc::new(client),
        store: Arc::new(store),
        logger,
    })
}

async fn open(
    deps: WorkboxDeps,
    config: &WorkboxConfig,
    view: &ViewArgs,
) -> Result<WorkboxController> {
    let controller = WorkboxController::initialize(
        deps,
        WorkboxSettings::from(config),
        &config.workflows,
        view.view_query()?,
    )
    .await
    .context("Failed to open the workbox")?;

    if let Some(err) = controller.last_refresh_error() {
        eprintln!("[workbox] Warning: {}", err);
    }
    Ok(controller)
}

async fn print_workflows(deps: &WorkboxDeps, config: &WorkboxConfig) -> Result<()> {
    let catalog = WorkflowCatalog::load(deps.client.as_ref(), &config.workflows)
        .await
        .context("Failed to load workflows")?;

    for workflow in catalog.workflows() {
        println!("{}  {}", workflow.display_name, workflow.id);
        for state in &workflow.states {
            println!("  {}  {}", state.display_name, state.id);
            for command in catalog.commands_for(state.id).unwrap_or_default() {
                println!("    -> {}  {}", command.display_name, command.id);
            }
        }
    }
    Ok(())
}

fn print_page(controller: &WorkboxController) {
    let state_name = controller.state_display_name().unwrap_or("?");
    let page_size = u64::from(controller.page_size().max(1));
    let pages = controller.total_count().div_ceil(page_size).max(1);

    if controller.show_only_selected() {
        println!("{}: {} selected", state_name, controller.total_count());
    } else {
        println!(
            "{}: page {} of {}, {} items",
            state_name,
            controller.page_index() + 1,
            pages,
            controller.total_count()
        );
    }

    for item in controller.visible_items() {
        let mark = if controller.selection().contains(&item.uri) {
            "[x]"
        } else if item.is_current_for_selected_state {
            "[ ]"
        } else {
            " ~ "
        };
        println!(
            "{} {}  v{} {}  {}  {}  {}",
            mark,
            item.path,
            item.version,
            item.language,
            item.template_name,
            item.updated_by,
            item.updated_at.format("%Y-%m-%d %H:%M")
        );
        println!("      {}", item.uri);
    }
    print_counts(controller);
}

fn print_counts(controller: &WorkboxController) {
    println!(
        "selected: {} in this state, {} overall",
        controller.selected_count(),
        controller.selection().len()
    );
}

async fn execute(controller: &mut WorkboxController, command: &str, comments: &str) -> Result<()> {
    let command_id = resolve_command(controller, command)?;
    let mut phase_rx = controller.prepare_command(command_id)?;

    let progress = tokio::spawn(async move {
        while phase_rx.changed().await.is_ok() {
            let phase = *phase_rx.borrow_and_update();
            match phase {
                ExecutionPhase::Submitting { processed, total } => {
                    eprintln!("[workbox] {}/{}", processed, total);
                }
                ExecutionPhase::Submitted | ExecutionPhase::Cancelled => break,
                ExecutionPhase::Ready => {}
            }
        }
    });

    let outcome = controller.submit_command(comments).await?;
    let _ = progress.await;

    for item in outcome.outcomes() {
        match &item.error {
            None if item.successful => println!("ok      {}", item.path),
            error => println!(
                "FAILED  {}: {}",
                item.path,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    if let Err(e) = controller.complete_command(&outcome).await {
        eprintln!("[workbox] Warning: selection not updated: {}", e);
    }

    let failed = outcome.failed().len();
    if failed > 0 {
        anyhow::bail!("{} of {} items failed", failed, outcome.len());
    }
    Ok(())
}

/// Accepts a command id or its display name (case-insensitive).
fn resolve_command(controller: &WorkboxController, command: &str) -> Result<CommandId> {
    if let Ok(id) = CommandId::parse(command) {
        return Ok(id);
    }
    controller
        .commands()
        .iter()
        .find(|c| c.display_name.eq_ignore_ascii_case(command.trim()))
        .map(|c| c.id)
        .with_context(|| {
            let offered: Vec<&str> = controller
                .commands()
                .iter()
                .map(|c| c.display_name.as_str())
                .collect();
            format!(
                "Command '{}' is not offered in this state (available: {})",
                command,
                offered.join(", ")
            )
        })
}
