use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use fuzzy_control::catalog::PatternCatalog;
use fuzzy_control::config::{FieldKey, GlobalKey, ProfileStore};
use fuzzy_control::constants::run_state::DISPLAY_POLL_INTERVAL_MS;
use fuzzy_control::context::ControllerContext;
use fuzzy_control::persistence::{StoreLayout, atomic_write};
use fuzzy_control::run_state::RunStateWatcher;
use fuzzy_control::validation::Outcome;

/// Profile and settings manager for the gathering automation
#[derive(Parser, Debug)]
#[command(name = "fuzzy-control", version, long_about = None)]
struct Cli {
    /// Data directory (also FUZZY_CONTROL_DIR; default: <config dir>/fuzzy-control)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Pattern directory (default: <data dir>/patterns)
    #[arg(long, global = true)]
    patterns_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, switch and share profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Per-slot gathering settings
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Settings shared by every slot
    Global {
        #[command(subcommand)]
        command: GlobalCommands,
    },

    /// Request run-state changes from the worker
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// List available movement patterns
    Patterns,
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// List profiles, marking the active one
    List,
    Create { name: String },
    /// Make a profile the active one
    Switch { name: String },
    Duplicate { source: String, name: String },
    Rename { old: String, new: String },
    Delete { name: String },
    /// Write a profile as canonical JSON
    Export {
        name: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add a profile from exported JSON ("-" reads stdin)
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum FieldCommands {
    /// Show one setting, or every setting of the slot
    Get {
        slot: usize,
        key: Option<FieldKey>,
        #[arg(short, long)]
        profile: Option<String>,
    },
    Set {
        slot: usize,
        key: FieldKey,
        value: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Restore a slot to default settings
    Reset {
        slot: usize,
        #[arg(short, long)]
        profile: Option<String>,
    },
    Export {
        slot: usize,
        #[arg(short, long)]
        profile: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace a slot from exported JSON ("-" reads stdin)
    Import {
        slot: usize,
        file: PathBuf,
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GlobalCommands {
    Get {
        key: Option<GlobalKey>,
        #[arg(short, long)]
        profile: Option<String>,
    },
    Set {
        key: GlobalKey,
        value: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum RunCommands {
    Start,
    Stop,
    Pause,
    Resume,
    /// Print the last requested state
    Status,
    /// Print state changes until interrupted
    Watch,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let layout = StoreLayout::resolve(cli.config_dir);
    let patterns_dir = cli.patterns_dir.unwrap_or_else(|| layout.patterns_dir());
    let catalog = PatternCatalog::from_dir(&patterns_dir)?;
    let ctx = ControllerContext::open(layout, catalog)
        .context("Failed to load saved profiles")?;

    match cli.command {
        Commands::Profile { command } => profile_command(&ctx, command),
        Commands::Field { command } => field_command(&ctx, command),
        Commands::Global { command } => global_command(&ctx, command),
        Commands::Run { command } => run_command(&ctx, command),
        Commands::Patterns => {
            for pattern in ctx.catalog().iter() {
                println!("{pattern}");
            }
            let unresolved = ctx.read(|store| store.unresolved_patterns(store.active_name(), ctx.catalog()))?;
            for (slot, pattern) in unresolved {
                eprintln!("warning: slot {slot} uses unknown pattern '{pattern}'");
            }
            Ok(())
        }
    }
}

fn profile_command(ctx: &ControllerContext, command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::List => ctx.read(|store| {
            for name in store.list() {
                let marker = if name == store.active_name() { "*" } else { " " };
                println!("{marker} {name}");
            }
        }),
        ProfileCommands::Create { name } => ctx.update(|store| store.create(&name))?,
        ProfileCommands::Switch { name } => ctx.update(|store| store.switch(&name))?,
        ProfileCommands::Duplicate { source, name } => ctx.update(|store| store.duplicate(&source, &name))?,
        ProfileCommands::Rename { old, new } => ctx.update(|store| store.rename(&old, &new))?,
        ProfileCommands::Delete { name } => ctx.update(|store| store.delete(&name))?,
        ProfileCommands::Export { name, output } => {
            let text = ctx.read(|store| store.export_profile(&name))?;
            write_output(output.as_deref(), &text)?;
        }
        ProfileCommands::Import { file } => {
            let text = read_input(&file)?;
            let name = ctx.update(|store| store.import_profile(&text))?;
            println!("{name}");
        }
    }
    Ok(())
}

fn field_command(ctx: &ControllerContext, command: FieldCommands) -> Result<()> {
    match command {
        FieldCommands::Get { slot, key, profile } => {
            let lines = ctx.read(|store| -> Result<Vec<String>> {
                let name = target(store, profile.as_deref());
                let field = store.profile(&name)?.field(slot)?;
                let keys = key.map_or(FieldKey::ALL.to_vec(), |key| vec![key]);
                Ok(keys.iter().map(|key| format!("{key} = {}", field.get(*key))).collect())
            })?;
            lines.iter().for_each(|line| println!("{line}"));
        }
        FieldCommands::Set { slot, key, value, profile } => {
            let outcome = ctx.update(|store| {
                let name = target(store, profile.as_deref());
                store.set_field(&name, slot, key, &value)
            })?;
            report(key.as_str(), outcome)?;
        }
        FieldCommands::Reset { slot, profile } => {
            ctx.update(|store| {
                let name = target(store, profile.as_deref());
                store.reset_field(&name, slot)
            })?;
        }
        FieldCommands::Export { slot, profile, output } => {
            let text = ctx.read(|store| {
                let name = target(store, profile.as_deref());
                store.export_field(&name, slot)
            })?;
            write_output(output.as_deref(), &text)?;
        }
        FieldCommands::Import { slot, file, profile } => {
            let text = read_input(&file)?;
            ctx.update(|store| {
                let name = target(store, profile.as_deref());
                store.import_field(&name, slot, &text)
            })?;
        }
    }
    Ok(())
}

fn global_command(ctx: &ControllerContext, command: GlobalCommands) -> Result<()> {
    match command {
        GlobalCommands::Get { key, profile } => {
            let lines = ctx.read(|store| -> Result<Vec<String>> {
                let name = target(store, profile.as_deref());
                let global = store.profile(&name)?.global();
                Ok(match key {
                    Some(key) => vec![format!("{key} = {}", global.get(key))],
                    None => global.iter().map(|(key, value)| format!("{key} = {value}")).collect(),
                })
            })?;
            lines.iter().for_each(|line| println!("{line}"));
        }
        GlobalCommands::Set { key, value, profile } => {
            let outcome = ctx.update(|store| {
                let name = target(store, profile.as_deref());
                store.set_global(&name, key, &value)
            })?;
            report(key.as_str(), outcome)?;
        }
    }
    Ok(())
}

fn run_command(ctx: &ControllerContext, command: RunCommands) -> Result<()> {
    let writer = ctx.run_state();
    let path = ctx.layout().run_state_path();
    let context = || format!("Failed to write run state to {}", path.display());
    match command {
        RunCommands::Start => writer.request_start().with_context(context)?,
        RunCommands::Stop => writer.request_stop().with_context(context)?,
        RunCommands::Pause => writer.request_pause().with_context(context)?,
        RunCommands::Resume => writer.request_resume().with_context(context)?,
        RunCommands::Status => match writer.reader().current() {
            Some(state) => println!("{state}"),
            None => println!("unknown"),
        },
        RunCommands::Watch => watch(ctx)?,
    }
    Ok(())
}

/// Poll the run-state word once per display interval until SIGINT/SIGTERM
fn watch(ctx: &ControllerContext) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))
            .context("Failed to register SIGINT handler")?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))
            .context("Failed to register SIGTERM handler")?;
    }

    info!(interval_ms = DISPLAY_POLL_INTERVAL_MS, "Watching run state");
    let mut watcher = RunStateWatcher::new(ctx.run_state().reader());
    while !shutdown.load(Ordering::Relaxed) {
        if let Some(state) = watcher.poll() {
            println!("{state}");
        }
        thread::sleep(Duration::from_millis(DISPLAY_POLL_INTERVAL_MS));
    }
    info!("Stopped watching run state");
    Ok(())
}

/// Explicit profile name, else the active one
fn target(store: &ProfileStore, profile: Option<&str>) -> String {
    profile.unwrap_or(store.active_name()).to_string()
}

fn report(key: &str, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Accepted(value) => println!("{key} = {value}"),
        Outcome::Clamped { value, requested } => {
            println!("{key} = {value} (adjusted from '{requested}')")
        }
        Outcome::Rejected(reason) => bail!("Rejected value for {key}: {reason}"),
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            atomic_write(path, text.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Exported settings");
        }
        None => print!("{text}"),
    }
    Ok(())
}
