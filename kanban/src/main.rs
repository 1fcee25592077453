//! `kanban`: interactive kanban board over a mock or HTTP task store.

use std::io::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use kanban::board::{Sleeper, TaskBoard};
use kanban::config::{CliArgs, ClientConfig, StoreBackend};
use kanban::shell::{Outcome, Shell, parse_command};
use kanban::store::TaskStore;
use kanban::store::http::HttpStore;
use kanban::store::memory::MemoryStore;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // CLI args > env > config file > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file so they never interleave with the shell.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(backend = ?config.backend, "kanban starting");

    match config.backend {
        StoreBackend::Memory => {
            let store = if config.seed {
                MemoryStore::seeded(config.faults.clone())
            } else {
                MemoryStore::new(config.faults.clone())
            };
            run(TaskBoard::with_config(Arc::new(store), config.board)).await
        }
        StoreBackend::Http => {
            let store = HttpStore::new(&config.server_url, config.request_timeout)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            run(TaskBoard::with_config(Arc::new(store), config.board)).await
        }
    }
}

/// Initialize file-based logging via `tracing-appender`.
///
/// Returns a guard that must be held for the lifetime of the program to
/// ensure buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("kanban.log");
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

/// Loads the board, then reads commands from stdin until `quit` or EOF.
async fn run<S: TaskStore, Z: Sleeper>(board: TaskBoard<S, Z>) -> io::Result<()> {
    let mut shell = Shell::new(board);

    println!("loading tasks...");
    shell.board().load().await;
    println!("{}\n", shell.render());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("kanban> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(kanban::shell::ParseError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match shell.execute(command).await {
            Outcome::Print(text) => println!("{text}"),
            Outcome::Quit => break,
        }
    }

    tracing::info!("kanban exiting");
    Ok(())
}
