pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "amlbot",
    about = "Amlbot operator CLI",
    long_about = "Operate the AML check bot: migrations, demo catalog, config inspection, and offline report rendering.",
    after_help = "Examples:\n  amlbot migrate\n  amlbot config\n  amlbot render saved-response.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo token catalog and commissions (idempotent)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Format a saved provider response offline without sending anything")]
    Render {
        #[arg(help = "Path to a provider response or bare report payload (JSON)")]
        payload: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Render { payload } => commands::render::run(&payload),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
