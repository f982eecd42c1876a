pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "kirana",
    about = "Kirana demo and operator CLI",
    long_about = "Chat with a merchant's ordering agent as a simulated WhatsApp customer, \
                  inspect demo merchant catalogs, and run gateway readiness checks.",
    after_help = "Examples:\n  kirana merchants\n  kirana doctor --json\n  kirana chat --merchant merchant_001 --api-key sk-demo"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Interactive chat with a merchant's agent, simulating a WhatsApp customer")]
    Chat(commands::chat::ChatArgs),
    #[command(about = "List demo merchants and their catalogs for operator reference")]
    Merchants,
    #[command(about = "Validate config and check that the chat gateway is reachable")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat(args) => commands::chat::run(args),
        Command::Merchants => {
            commands::CommandResult { exit_code: 0, output: commands::merchants::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
