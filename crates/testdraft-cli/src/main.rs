mod cmd_edit;
mod cmd_flatten;
mod cmd_session;
mod cmd_store;
mod logging;
mod session_file;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "testdraft")]
#[command(about = "Compose, edit, and persist unit-test fixture drafts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log engine activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flatten an analyzed function's parameters into argument names
    Flatten {
        /// Function descriptor JSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Create, inspect, and edit draft sessions
    Session {
        #[command(subcommand)]
        op: cmd_session::SessionOp,
    },
    /// Drive nested editors for object and array values
    Edit {
        #[command(subcommand)]
        op: cmd_edit::EditOp,
    },
    /// Save, list, and delete persisted tests
    Store {
        #[command(subcommand)]
        op: cmd_store::StoreOp,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Flatten { input } => cmd_flatten::run(input, cli.pretty),
        Commands::Session { op } => cmd_session::run(op, cli.pretty),
        Commands::Edit { op } => cmd_edit::run(op, cli.pretty),
        Commands::Store { op } => cmd_store::run(op, cli.pretty),
    }
}
