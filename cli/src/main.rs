use clap::{Parser, Subcommand};
use loopmod_cli::app_state::{self, AppState};
use loopmod_cli::commands;
use loopmod_cli::dir_watcher;
use loopmod_cli::{init_logging, readline};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Startup options
#[derive(Parser)]
#[command(version, about = "Interactive LoopMod host")]
struct Args {
    /// Config file (default: <config dir>/loopmod/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured mods root
    #[arg(short, long)]
    mods_root: Option<PathBuf>,

    /// Do not reload on file changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_logging();

    let args = Args::parse();
    let mut config = app_state::load_config(args.config.as_deref());
    if let Some(root) = args.mods_root {
        config.mods_root = root;
    }
    if args.no_watch {
        config.watch = false;
    }

    let state = Arc::new(RwLock::new(AppState::new(config)));

    if let Some(handle) = dir_watcher::init_watcher(Arc::clone(&state)).await {
        state.write().await.watcher_task = Some(handle);
    }

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, Arc::clone(&state)).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "cli")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Raise an event
    Event {
        #[arg(short, long)]
        name: String,
        /// Runtime arguments as JSON
        #[arg(short, long)]
        args: Option<String>,
    },
    /// Trigger an action
    Action {
        #[arg(short, long)]
        id: String,
        /// Payload as JSON
        #[arg(short, long)]
        payload: Option<String>,
    },
    Unlock {
        #[arg(short, long)]
        id: String,
    },
    Lock {
        #[arg(short, long)]
        id: String,
    },
    Reload,
    Actions,
    Events,
    Params,
    Press {
        #[arg(short, long)]
        key: String,
    },
    Release {
        #[arg(short, long)]
        key: String,
    },
    Output,
    Diagnostics,
    Config,
    Exit,
}

async fn respond(line: &str, state: Arc<RwLock<AppState>>) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "loopmod".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Event { name, args }) => {
            commands::raise_event(name, args.as_deref(), Arc::clone(&state)).await?
        }
        Some(Commands::Action { id, payload }) => {
            commands::trigger_action(id, payload.as_deref(), Arc::clone(&state)).await?
        }
        Some(Commands::Unlock { id }) => commands::unlock(id, Arc::clone(&state)).await,
        Some(Commands::Lock { id }) => commands::lock(id, Arc::clone(&state)).await,
        Some(Commands::Reload) => commands::reload(Arc::clone(&state)).await,
        Some(Commands::Actions) => commands::list_actions(Arc::clone(&state)).await,
        Some(Commands::Events) => commands::list_events(Arc::clone(&state)).await,
        Some(Commands::Params) => commands::list_params(Arc::clone(&state)).await,
        Some(Commands::Press { key }) => commands::press(key, Arc::clone(&state)).await?,
        Some(Commands::Release { key }) => commands::release(key, Arc::clone(&state)).await?,
        Some(Commands::Output) => commands::show_output(Arc::clone(&state)).await,
        Some(Commands::Diagnostics) => commands::show_diagnostics(Arc::clone(&state)).await,
        Some(Commands::Config) => commands::show_settings(Arc::clone(&state)).await,
        Some(Commands::Exit) => {
            commands::exit(state).await;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
