//! Binary entrypoint for the Undercroft CLI.
//!
//! Commands:
//! - `start [--bind <addr>] [--daemon]` - run the dungeon server
//! - `init [--rooms <n>]` - create a starter `config.toml` and generate world files
//! - `status` - print world, storage, and configuration summaries
//!
//! See the library crate docs for module-level details: `undercroft::`.
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use undercroft::config::Config;
use undercroft::game::{start_game_server, start_ghost_ticker};
use undercroft::storage::{start_persistence_worker, SnapshotStore};
use undercroft::world::{self, GenOptions};
use undercroft::{metrics, net};

#[derive(Parser)]
#[command(name = "undercroft")]
#[command(about = "A multiplayer text dungeon server with a shared persistent world")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dungeon server
    Start {
        /// Listen address override (e.g., 0.0.0.0:4000)
        #[arg(short, long)]
        bind: Option<String>,

        /// Run as a background daemon (Unix only)
        #[arg(short, long)]
        daemon: bool,

        /// PID file location (for daemon mode)
        #[arg(long, default_value = "/tmp/undercroft.pid")]
        pid_file: String,
    },
    /// Initialize configuration and generate world files
    Init {
        /// Rooms to generate when no world.json exists yet
        #[arg(long)]
        rooms: Option<usize>,
    },
    /// Show world and storage status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The log level lives in the config, so load it before logging starts.
    // Init is the exception: it writes the default config itself.
    let pre_config = match cli.command {
        Commands::Init { .. } => None,
        _ => Config::load(&cli.config).await.ok(),
    };

    match &cli.command {
        Commands::Start { daemon, .. } if *daemon => {
            // Deferred until after the respawn.
        }
        Commands::Init { .. } => {
            // Deferred until the default config exists.
        }
        _ => {
            init_logging(&pre_config, cli.verbose);
        }
    }

    match cli.command {
        Commands::Start {
            bind,
            daemon,
            pid_file,
        } => {
            // Daemon mode comes first, before anything writes to stdout.
            #[cfg(all(unix, feature = "daemon"))]
            if daemon {
                let config = match pre_config {
                    Some(config) => config,
                    None => Config::load(&cli.config).await?,
                };
                daemonize_process(&config, &pid_file)?;
                // Child side: logging starts here.
                init_logging(&Some(config.clone()), cli.verbose);
                info!("Starting Undercroft v{}", env!("CARGO_PKG_VERSION"));
                return run_server(config, bind).await;
            }

            #[cfg(not(all(unix, feature = "daemon")))]
            if daemon {
                let _ = pid_file; // only read by the daemon build
                eprintln!("Error: Daemon mode requires Unix platform and 'daemon' feature.");
                eprintln!("Compile with: cargo build --features daemon");
                std::process::exit(1);
            }

            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Undercroft v{}", env!("CARGO_PKG_VERSION"));
            run_server(config, bind).await?;
        }
        Commands::Init { rooms } => {
            // Init command: no config to read a log level from yet
            init_logging(&None, cli.verbose);
            info!("Initializing a new Undercroft setup");

            if tokio::fs::try_exists(&cli.config).await? {
                info!("Config file {} already exists; leaving it alone", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                info!("Configuration file created at {}", cli.config);
            }

            let config = Config::load(&cli.config).await?;
            let mut options = GenOptions::default();
            if let Some(rooms) = rooms {
                options.room_count = rooms.max(1);
            }
            let wrote = world::seed_world_dir(Path::new(&config.world.data_dir), &options).await?;
            if wrote {
                info!("World files ready in {}", config.world.data_dir);
            } else {
                info!(
                    "World files already present in {}; nothing generated",
                    config.world.data_dir
                );
            }
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            show_status(&config).await;
        }
    }

    Ok(())
}

/// Full server lifecycle: load, restore, serve, drain, summarize.
async fn run_server(mut config: Config, bind_override: Option<String>) -> Result<()> {
    if let Some(bind) = bind_override {
        config.server.bind = bind;
    }

    let def = world::load_world_dir(Path::new(&config.world.data_dir))
        .await
        .with_context(|| {
            format!(
                "No usable world in {}; run `undercroft init` first",
                config.world.data_dir
            )
        })?;
    let has_ghosts = !def.ghosts.is_empty();

    let store = SnapshotStore::open(SnapshotStore::path_of(Path::new(&config.storage.data_dir)))?;
    let prior = store.get_snapshot()?;
    match &prior {
        Some(snapshot) => info!("restoring world snapshot from {}", snapshot.saved_at),
        None => info!("no prior snapshot; world starts from its definition"),
    }

    let (save_tx, save_worker) = start_persistence_worker(store);
    let handle = start_game_server(def, prior, Some(save_tx.clone()));

    if config.ghosts.enabled && has_ghosts {
        let (min_secs, max_secs) = config.ghosts.interval_bounds();
        start_ghost_ticker(handle.clone(), min_secs, max_secs);
    } else {
        info!("no ghost wandering for this run");
    }

    let server_config = config.server.clone();
    let net_handle = handle.clone();
    let mut server = tokio::spawn(async move { net::serve(&server_config, net_handle).await });

    tokio::select! {
        result = &mut server => {
            match result {
                Ok(Ok(())) => warn!("listener stopped unexpectedly"),
                Ok(Err(err)) => error!("listener failed: {:#}", err),
                Err(err) => error!("listener task failed: {}", err),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            server.abort();
        }
    }

    // Collect the final state, then let the worker drain its queue.
    if let Some(snapshot) = handle.shutdown().await {
        if save_tx.send(snapshot).is_err() {
            warn!("persistence worker already gone; final snapshot dropped");
        }
    }
    drop(save_tx);
    if let Err(err) = save_worker.await {
        warn!("persistence worker did not stop cleanly: {}", err);
    }

    let totals = metrics::snapshot();
    info!(
        "session totals: {} logins, {} logouts, {} commands ({} rejected), {} snapshots saved, peak {} online",
        totals.logins,
        totals.logouts,
        totals.commands,
        totals.command_failures,
        totals.snapshots_saved,
        totals.online_peak
    );
    Ok(())
}

async fn show_status(config: &Config) {
    println!("Undercroft v{}", env!("CARGO_PKG_VERSION"));
    println!("Bind: {}", config.server.bind);
    println!("World dir: {}", config.world.data_dir);
    println!("Storage dir: {}", config.storage.data_dir);

    match world::load_world_dir(Path::new(&config.world.data_dir)).await {
        Ok(def) => println!(
            "World: {} ({} rooms, {} characters, {} ghosts)",
            def.world_name,
            def.rooms.len(),
            def.characters.len(),
            def.ghosts.len()
        ),
        Err(err) => println!("World: not loadable ({:#})", err),
    }

    // Fails while a server holds the sled lock; that is itself useful signal.
    match SnapshotStore::open(SnapshotStore::path_of(Path::new(&config.storage.data_dir))) {
        Ok(store) => match store.get_snapshot() {
            Ok(Some(snapshot)) => println!(
                "Snapshot: saved {} ({} rooms, {} characters tracked)",
                snapshot.saved_at,
                snapshot.rooms.len(),
                snapshot.characters.len()
            ),
            Ok(None) => println!("Snapshot: none yet"),
            Err(err) => println!("Snapshot: unreadable ({})", err),
        },
        Err(err) => println!("Storage: unavailable ({})", err),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;

    // -v/-vv override the configured level
    let level = match verbosity {
        0 => config
            .as_ref()
            .map(|cfg| cfg.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(file) => {
            let file = std::sync::Arc::new(std::sync::Mutex::new(file));
            // Under --daemon stdout already points at the log file; echo
            // only when it is a real terminal.
            let echo = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let line = render_log_line(record);
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if echo {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| writeln!(fmt, "{}", render_log_line(record)));
        }
    }
    let _ = builder.try_init();
}

fn render_log_line(record: &log::Record) -> String {
    format!(
        "{} [{}] {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        record.level(),
        record.args()
    )
}

/// Daemonize the process (Unix only)
///
/// Re-spawns the binary detached from the terminal, writes the PID file,
/// and redirects stdout/stderr into the configured log file.
#[cfg(all(unix, feature = "daemon"))]
fn daemonize_process(config: &Config, pid_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::process::Command;

    let log_path = config
        .logging
        .file
        .as_ref()
        .map(|s| s.as_str())
        .unwrap_or("undercroft.log");

    let current_exe = std::env::current_exe()?;
    let mut args: Vec<String> = std::env::args().collect();

    // The child must not inherit --daemon or it would respawn forever.
    if let Some(pos) = args.iter().position(|arg| arg == "--daemon" || arg == "-d") {
        args.remove(pos);
    }
    let child_args = &args[1..];

    let log_file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let child = Command::new(&current_exe)
        .args(child_args)
        .stdin(std::process::Stdio::null())
        .stdout(log_file.try_clone()?)
        .stderr(log_file)
        .spawn()?;

    std::fs::write(pid_file, format!("{}", child.id()))?;

    // The parent's job ends here; the child carries on detached.
    std::process::exit(0);
}
