//! fogsync
//!
//! Terminal client for a fog daemon: watch the session directory, follow a
//! run's events live, start sessions and follow-up runs.

mod cmd_follow;
mod cmd_sessions;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use fogsync::{paths, AppState, HttpApi, LinkKind, SyncConfig, SyncHandle, SystemHost};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fogsync", version, about = "Sync client for the fog daemon")]
struct Cli {
    /// Daemon address, without the /api suffix
    #[arg(long, env = "FOG_API_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Bearer token for the daemon API
    #[arg(long, env = "FOG_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Directory for logs
    #[arg(long, env = "FOGSYNC_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 4000, global = true)]
    poll_interval_ms: u64,

    /// Events fetched per run backlog
    #[arg(long, default_value_t = 200, global = true)]
    event_limit: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print directory changes as they happen
    Watch,
    /// List running and completed sessions
    Sessions,
    /// Print a run's events, following it live while it is active
    Follow {
        session: String,
        /// Pin a run instead of following the latest one
        #[arg(long)]
        run: Option<String>,
    },
    /// Start a new session
    Create {
        #[arg(long)]
        repo: String,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        model: String,
        #[arg(long, default_value = "")]
        branch: String,
        #[arg(long)]
        autopr: bool,
        #[arg(long)]
        tool: Option<String>,
    },
    /// Start a follow-up run in an existing session
    Followup {
        session: String,
        #[arg(long)]
        prompt: String,
    },
    /// Open a session link in the browser
    Open {
        session: String,
        #[arg(long, value_enum, default_value_t = LinkTarget::Pr)]
        target: LinkTarget,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LinkTarget {
    Pr,
    Branch,
    Compare,
}

impl From<LinkTarget> for LinkKind {
    fn from(target: LinkTarget) -> Self {
        match target {
            LinkTarget::Pr => LinkKind::PullRequest,
            LinkTarget::Branch => LinkKind::Branch,
            LinkTarget::Compare => LinkKind::Compare,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref());
    paths::ensure_dirs(&data_dir)?;
    let _logging = fogsync::logging::init_logging(&data_dir)?;

    let config = SyncConfig::default()
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .with_event_page_limit(cli.event_limit);

    let api = Arc::new(HttpApi::new(config.request_timeout)?);
    let host = Arc::new(SystemHost {
        base_url: cli.base_url.clone(),
        token: cli.token.clone(),
        version: Some(fogsync::VERSION.to_string()),
    });
    let (state, signals) = AppState::new(api, host, config);
    let handle = SyncHandle::spawn(state, signals);

    info!(
        component = "main",
        event = "cli.start",
        command = ?cli.command,
        data_dir = %data_dir.display(),
        "fogsync starting"
    );

    let result = run(&handle, cli.command).await;
    handle.destroy().await;
    result
}

async fn run(handle: &SyncHandle, command: Command) -> anyhow::Result<()> {
    handle.bootstrap().await?;
    match command {
        Command::Watch => cmd_sessions::watch(handle).await,
        Command::Sessions => cmd_sessions::list(handle),
        Command::Follow { session, run } => cmd_follow::run(handle, &session, run).await,
        Command::Create {
            repo,
            prompt,
            model,
            branch,
            autopr,
            tool,
        } => {
            cmd_sessions::create(
                handle,
                fogsync_protocol::CreateSessionRequest {
                    repo,
                    prompt,
                    model,
                    branch_name: branch,
                    autopr,
                    tool,
                    run_async: true,
                },
            )
            .await
        }
        Command::Followup { session, prompt } => {
            cmd_sessions::followup(handle, &session, &prompt).await
        }
        Command::Open { session, target } => {
            cmd_sessions::open(handle, &session, target.into()).await
        }
    }
}
