mod app;
mod config;
mod input;
mod model;
mod render;
mod scheduler;
mod session;
mod sim;
mod snake;
mod storage;

use anyhow::{Context, Result};
use std::{fs::OpenOptions, path::Path};

fn main() -> Result<()> {
    let paths = config::project_paths()?;
    init_logging(&paths.log_path)?;
    app::run(paths)
}

// The terminal is in raw mode while running, so log lines go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
