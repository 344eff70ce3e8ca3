pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use ordercopilot_core::config::{AppConfig, LogFormat};

use commands::{match_query::MatchArgs, CommandResult, GlobalArgs, EXIT_FAILURE};

#[derive(Debug, Parser)]
#[command(
    name = "ordercopilot",
    about = "Order copilot operator CLI",
    long_about = "Parse buyer messages, match them against the catalog, price draft orders, and run the order conversation from a terminal.",
    after_help = "Examples:\n  ordercopilot parse \"need 10 acorn fans to bedok\"\n  ordercopilot --catalog catalog.json quote \"need 10 acorn fans\" --discount 5\n  ordercopilot --catalog catalog.json chat --session +6591234567\n  ordercopilot config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Extract a structured intent from one buyer message")]
    Parse { message: String },
    #[command(about = "Rank catalog records against a product query")]
    Match(MatchArgs),
    #[command(about = "Assemble and price a draft order from one buyer message")]
    Quote {
        message: String,
        #[arg(long, help = "Discount percentage applied to the subtotal")]
        discount: Option<Decimal>,
    },
    #[command(about = "Run the order conversation over stdin/stdout, one JSON reply per line")]
    Chat {
        #[arg(long, default_value = "local", help = "Session key for the conversation")]
        session: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Match(_) => "match",
            Self::Quote { .. } => "quote",
            Self::Chat { .. } => "chat",
            Self::Config => "config",
        }
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = dispatch(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(cli: Cli) -> CommandResult {
    let command_name = cli.command.name();
    let config = match commands::load_config(command_name, &cli.global) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    init_logging(&config);

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(command_name, "runtime", error.to_string(), EXIT_FAILURE);
        }
    };

    match cli.command {
        Command::Parse { message } => runtime.block_on(commands::parse::run(&config, &message)),
        Command::Match(args) => commands::match_query::run(&config, &args),
        Command::Quote { message, discount } => {
            runtime.block_on(commands::quote::run(&config, &message, discount))
        }
        Command::Chat { session } => runtime.block_on(commands::chat::run(&config, &session)),
        Command::Config => {
            CommandResult { exit_code: 0, output: commands::config::run(&config, &cli.global) }
        }
    }
}
