//! Shoal CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shoal_cli::cli::{Cli, Commands};
use shoal_cli::commands::PostgresCommand;

fn main() -> ExitCode {
    // Logs go to stderr; stdout belongs to the interactive session.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), shoal_cli::CliError> {
    match cli.command {
        Commands::Postgres { command } => {
            let cmd = PostgresCommand::new(&cli.api_url, cli.agent_socket.clone(), &cli.org);
            cmd.execute(&command).await?;
        }
    }
    Ok(())
}
