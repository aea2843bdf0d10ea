//! `TechFlow` command-line client.
//!
//! Talks to the `TechFlow` REST API. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/techflow/config.toml`).
//!
//! ```bash
//! # Log in and keep the token for later commands
//! export TECHFLOW_TOKEN=$(techflow login --email ana@example.com --password secret)
//!
//! # Kanban board that refreshes every 5 seconds
//! techflow watch --view kanban
//!
//! # Against a local mock server
//! techflow --base-url http://127.0.0.1:8080/v1 dashboard
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use parking_lot::Mutex;
use techflow_proto::Id;
use techflow_proto::auth::{Credentials, LoginResponse, Registration};
use techflow_proto::project::{ProjectDraft, ProjectQuery};
use techflow_proto::task::TaskFilter;
use tracing_appender::non_blocking::WorkerGuard;

use techflow::api::http::HttpClient;
use techflow::api::{self, ApiError, AuthService, ProjectService, TaskService, TeamService};
use techflow::cli::{Cli, Command, FilterArgs, ProjectCommand, TaskCommand, TeamCommand};
use techflow::config::{ClientConfig, ViewMode};
use techflow::dashboard::{self, DASHBOARD_TASK_LIMIT, DashboardOptions};
use techflow::export::{self, ExportError};
use techflow::pagination::render_window;
use techflow::session::{Session, SessionError};
use techflow::tasks::{BoardError, BoardSnapshot, MoveOutcome, PollOutcome, TaskBoard};
use techflow::{poller, render, search};

/// Errors that end a command.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Board(#[from] BoardError),
    #[error("{0}")]
    Export(#[from] ExportError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so stdout stays clean for command output.
    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());
    tracing::info!(base_url = %config.base_url, "techflow starting");

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("techflow.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let client = HttpClient::new(config)?;

    // Commands that work without a token.
    match &cli.command {
        Command::Login { email, password } => {
            let response = client
                .login(&Credentials {
                    email: email.clone(),
                    password: password.clone(),
                })
                .await?;
            return print_login(response);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let registration = Registration {
                email: email.clone(),
                password: password.clone(),
                name: name.clone(),
            };
            let response = api::register_and_login(&client, &registration).await?;
            return print_login(response);
        }
        _ => {}
    }

    let session = Session::from_token(cli.args.token.as_deref())?;
    let client = client.with_session(&session);

    match cli.command {
        Command::Login { .. } | Command::Register { .. } => Ok(()),
        Command::Profile => {
            let user = client.profile().await?;
            println!("{}", render::user_line(&user));
            Ok(())
        }
        Command::Tasks(cmd) => run_tasks(client, cmd, config).await,
        Command::Projects(cmd) => run_projects(&client, cmd).await,
        Command::Team(cmd) => run_team(&client, cmd).await,
        Command::Dashboard => {
            let loaded =
                dashboard::load_dashboard(&client, &client, DashboardOptions::from(config)).await?;
            println!("{}", render::dashboard(&loaded));
            Ok(())
        }
        Command::Search { query } => {
            let results = search::search(&client, &client, &query).await?;
            println!("{}", render::search_results(&results));
            Ok(())
        }
        Command::Export { output, filter } => {
            let filter = TaskFilter {
                limit: Some(DASHBOARD_TASK_LIMIT),
                ..filter.to_filter()
            };
            let tasks = api::list_all_tasks(&client, &filter).await?;
            let csv = export::tasks_to_csv(&tasks)?;
            let path = output.unwrap_or_else(|| {
                export::default_file_name(Utc::now().date_naive()).into()
            });
            std::fs::write(&path, csv)?;
            tracing::info!(path = %path.display(), tasks = tasks.len(), "exported tasks");
            println!("Exported {} task(s) to {}", tasks.len(), path.display());
            Ok(())
        }
        Command::Watch { filter } => watch(client, &filter, config).await,
    }
}

fn print_login(response: LoginResponse) -> Result<(), CliError> {
    let session = Session::try_from(response)?;
    if let Some(user) = session.user() {
        eprintln!("Logged in as {}", render::user_line(user));
    }
    println!("{}", session.token());
    Ok(())
}

async fn run_tasks(
    client: HttpClient,
    cmd: TaskCommand,
    config: &ClientConfig,
) -> Result<(), CliError> {
    if let Some(draft) = cmd.draft() {
        let task = client.create_task(&draft).await?;
        println!("Created {}", render::task_line(&task));
        return Ok(());
    }
    if let Some(update) = cmd.update() {
        let TaskCommand::Update { id, .. } = &cmd else {
            return Ok(());
        };
        let task = client.update_task(&Id::from(id.as_str()), &update).await?;
        println!("Updated {}", render::task_line(&task));
        return Ok(());
    }

    match cmd {
        TaskCommand::List { filter, page } => {
            let query = TaskFilter {
                page: Some(page.max(1)),
                limit: Some(config.page_size),
                ..filter.to_filter()
            };
            let page = client.list_tasks(&query).await?;
            let snapshot = BoardSnapshot {
                current_page: page.current_page.unwrap_or(1),
                total_pages: page.total_pages,
                tasks: page.tasks,
                filter: query,
            };
            println!("{}", render::board(&snapshot, config.view));
        }
        TaskCommand::Show { id } => {
            let task = client.get_task(&Id::from(id)).await?;
            println!("{}", render::task_detail(&task));
        }
        TaskCommand::Status { id, status } => {
            let id = Id::from(id);
            let board = load_board(client, &FilterArgs::default(), config).await?;
            let task = match board.set_status(&id, status).await {
                Ok(task) => task,
                Err(BoardError::UnknownTask(_)) => {
                    tracing::debug!(task_id = %id, "task not on the first page, updating directly");
                    board.service().update_task_status(&id, status).await?
                }
                Err(e) => return Err(e.into()),
            };
            println!("Updated {}", render::task_line(&task));
        }
        TaskCommand::Move { id, column } => {
            let id = Id::from(id);
            let board = load_board(client, &FilterArgs::default(), config).await?;
            match board.move_card(&id, column).await? {
                MoveOutcome::Moved(task) => println!("Moved {}", render::task_line(&task)),
                MoveOutcome::Unchanged => println!("Nothing to move"),
            }
        }
        TaskCommand::Delete { id } => {
            client.delete_task(&Id::from(id.as_str())).await?;
            println!("Deleted task #{id}");
        }
        TaskCommand::Board { filter } => {
            let board = load_board(client, &filter, config).await?;
            println!("{}", render::board(&board.snapshot(), ViewMode::Kanban));
        }
        TaskCommand::Create { .. } | TaskCommand::Update { .. } => {}
    }
    Ok(())
}

async fn load_board(
    client: HttpClient,
    filter: &FilterArgs,
    config: &ClientConfig,
) -> Result<TaskBoard<HttpClient>, CliError> {
    let board = TaskBoard::new(Arc::new(client), config.page_size);
    board.set_filter(filter.to_filter()).await?;
    Ok(board)
}

async fn run_projects(client: &HttpClient, cmd: ProjectCommand) -> Result<(), CliError> {
    match cmd {
        ProjectCommand::List {
            page,
            limit,
            search,
        } => {
            let result = client
                .list_projects(&ProjectQuery {
                    page: page.max(1),
                    limit: limit.max(1),
                    search,
                })
                .await?;
            if result.projects.is_empty() {
                println!("No projects.");
            }
            for project in &result.projects {
                println!("{}", render::project_line(project));
            }
            let pages = render_window(result.current_page, result.total_pages);
            if !pages.is_empty() {
                println!("\nPage {pages}");
            }
        }
        ProjectCommand::Show { id } => {
            let project = client.get_project(&Id::from(id)).await?;
            println!("{}", render::project_line(&project));
            if let Some(description) = &project.description {
                println!("{description}");
            }
            if let Some(tasks) = &project.tasks {
                println!("\n{}", render::grid(tasks));
            }
        }
        ProjectCommand::Create { fields } => {
            let project = client.create_project(&ProjectDraft::from(&fields)).await?;
            println!("Created {}", render::project_line(&project));
        }
        ProjectCommand::Update { id, fields } => {
            let project = client
                .update_project(&Id::from(id), &ProjectDraft::from(&fields))
                .await?;
            println!("Updated {}", render::project_line(&project));
        }
        ProjectCommand::Delete { id } => {
            client.delete_project(&Id::from(id.as_str())).await?;
            println!("Deleted project #{id}");
        }
    }
    Ok(())
}

async fn run_team(client: &HttpClient, cmd: TeamCommand) -> Result<(), CliError> {
    match cmd {
        TeamCommand::Members => {
            let members = client.list_members().await?;
            if members.is_empty() {
                println!("No team members.");
            }
            for member in &members {
                println!("{}", render::member_line(member));
            }
        }
        TeamCommand::Tasks { id } => {
            let tasks = client.member_tasks(&Id::from(id)).await?;
            println!("{}", render::grid(&tasks));
        }
    }
    Ok(())
}

/// Prints the board on every applied poll until Ctrl-C.
async fn watch(
    client: HttpClient,
    filter: &FilterArgs,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let board = Arc::new(load_board(client, filter, config).await?);
    let view = config.view;
    println!("{}", render::board(&board.snapshot(), view));

    let last = Arc::new(Mutex::new(board.snapshot()));
    let handle = poller::spawn(config.poll_interval, move || {
        let board = Arc::clone(&board);
        let last = Arc::clone(&last);
        async move {
            match board.poll_refresh().await {
                Ok(PollOutcome::Applied) => {
                    let now = board.snapshot();
                    let mut last = last.lock();
                    if *last != now {
                        println!("\n{}", render::board(&now, view));
                        *last = now;
                    }
                }
                Ok(outcome) => tracing::debug!(?outcome, "poll result not applied"),
                Err(e) => tracing::warn!(error = %e, "poll refresh failed"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted, stopping poller");
    handle.stop().await;
    Ok(())
}
