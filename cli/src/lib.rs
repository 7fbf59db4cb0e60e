//! Command line shared by the example programs
//!
//! ```text
//! <program> <properties-file> [drop]
//! ```
//!
//! Without `drop` the program runs its full create/read/update/delete script;
//! with it the graph's data and storage are removed.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use graphapp::{AppRunner, GraphApp};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "GraphApp example program")]
pub struct Cli {
    /// Path to the graph's properties file
    pub properties: PathBuf,

    /// Tear the graph down instead of running the example
    #[arg(value_enum, ignore_case = true)]
    pub action: Option<Action>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Delete all data and on-disk storage
    Drop,
}

/// Entry point for the example binaries
pub fn run<A: GraphApp>(app: A) -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    execute(app, &cli)
}

/// Run the script, or the drop, selected by `cli`
pub fn execute<A: GraphApp>(app: A, cli: &Cli) -> anyhow::Result<()> {
    let name = app.name().to_string();
    let mut runner = AppRunner::new(app, &cli.properties);
    let path = cli.properties.display();
    match cli.action {
        Some(Action::Drop) => runner
            .run_drop()
            .with_context(|| format!("{}: cannot drop graph from {}", name, path))?,
        None => runner
            .run()
            .with_context(|| format!("{}: cannot run against {}", name, path))?,
    }
    info!("{} finished", name);
    Ok(())
}
