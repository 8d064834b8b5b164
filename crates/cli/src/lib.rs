pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "ecosim",
    about = "Ecosim operator CLI",
    long_about = "Operate the ecosim runtime: migrations, default-record bootstrap, config inspection, readiness checks, and one-off engine runs.",
    after_help = "Examples:\n  ecosim doctor --json\n  ecosim seed\n  ecosim simulate mobility '{\"mode\":\"ev\",\"start\":\"Central Station\",\"end\":\"Tech Park\"}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Create the default canonical record unless a usable record exists")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, engine availability, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one scenario through the engine and print the normalized result")]
    Simulate {
        #[arg(help = "Scenario domain: energy, mobility or carbon")]
        domain: String,
        #[arg(default_value = "{}", help = "Scenario parameters as a JSON object")]
        scenario: String,
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
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Simulate { domain, scenario } => commands::simulate::run(&domain, &scenario),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
