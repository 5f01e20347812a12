pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use courtside_core::config::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "courtside",
    about = "Courtside operator CLI",
    long_about = "Route natural-language requests across the Courtside agents, inspect the \
                  registry, view effective configuration, and run readiness checks.",
    after_help = "Examples:\n  courtside ask \"What's the price of the Elite Basketball?\" \\\n      --user avery@example.com --group ProGear-Sales\n  courtside agents --json\n  courtside doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Route a request to the agents and print content, flow, and exchanges")]
    Ask {
        #[arg(help = "Natural-language request to route")]
        message: String,
        #[arg(long, help = "Acting subject (email); omit to run anonymously")]
        user: Option<String>,
        #[arg(long = "group", help = "Group membership for the acting user; repeatable")]
        groups: Vec<String>,
        #[arg(
            long,
            help = "Bearer assertion forwarded to the identity provider; only needed when agent credentials are configured"
        )]
        assertion: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List registered agents with their scopes, colors, and credential mode")]
    Agents {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, identity-provider readiness, and access rules")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn init_logging(config: &AppConfig) {
    use courtside_core::config::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().try_init()
        }
    };
    // A second init inside the same process is harmless.
    let _ = result;
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ask { message, user, groups, assertion, json } => {
            commands::ask::run(&message, user.as_deref(), &groups, assertion.as_deref(), json)
        }
        Command::Agents { json } => commands::agents::run(json),
        Command::Config => commands::CommandResult::ok(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::ok(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
