pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use homequote_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "homequote",
    about = "Homequote operator CLI",
    long_about = "Operate the Homequote conversational quote engine: interactive chat, smoke \
                  validation, config inspection, and migrations.",
    after_help = "Examples:\n  homequote chat\n  homequote smoke\n  homequote config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive quote-building chat against the demo catalog")]
    Chat {
        #[arg(long, help = "Persist sessions to the configured sqlite database")]
        durable: bool,
    },
    #[command(about = "Run a scripted end-to-end conversation with per-turn timing details")]
    Smoke,
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
    #[command(about = "Apply pending database migrations")]
    Migrate,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { durable } => match commands::chat::run(durable).await {
            Ok(()) => return ExitCode::SUCCESS,
            Err(error) => commands::CommandResult::failure("chat", "runtime", error.to_string(), 1),
        },
        Command::Smoke => commands::smoke::run().await,
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run().await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
