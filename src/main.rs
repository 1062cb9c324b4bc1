use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use botwatch::config::{Config, CONFIG_PATH_ENV};

#[derive(Parser)]
#[command(
    name = "botwatch",
    about = "Liveness monitor for remote bot services with Telegram reporting",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (status endpoint + scheduler + command listener)
    Serve {
        /// Override the status endpoint port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Check every target once and print the full report
    Check {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Preview when the triggers will fire
    Schedule {
        /// Hours to preview
        #[arg(long, default_value = "24")]
        hours: u64,
    },

    /// Reply to incoming bot messages with their chat id (setup helper)
    ChatId,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::resolve(cli.config.as_deref()).context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.service.port = port;
            }
            botwatch::serve(config).await?;
        }
        Commands::Check { json } => {
            let zone = config.zone()?;
            let monitor = botwatch::build_monitor(&config)?;
            let summary = monitor.run_cycle("cli").await;

            if json {
                let output = serde_json::json!({
                    "timestamp": summary.timestamp.to_rfc3339(),
                    "counts": summary.counts(),
                    "outcomes": summary.outcomes,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let text = botwatch::report::full_report(&summary, &zone);
                println!("\n{}\n", botwatch::report::strip_markup(&text));
            }

            if summary.has_incidents() {
                std::process::exit(1);
            }
        }
        Commands::Schedule { hours } => {
            let spec = config.schedule_spec()?;
            let description = spec.describe();
            println!("Incident check: {}", description.incident_check);
            println!("Full report:    {}", description.full_report);
            println!("Time zone:      {}", description.timezone);

            let preview = spec.preview(&chrono::Utc::now(), hours);
            if preview.is_empty() {
                println!("No runs scheduled in next {} hours.", hours);
            } else {
                println!("\nUpcoming runs (next {} hours):", hours);
                for (time, kind) in preview {
                    println!("{} : {}", time.format("%d.%m.%Y %H:%M:%S"), kind);
                }
            }
        }
        Commands::ChatId => {
            let token = config
                .telegram
                .bot_token
                .as_deref()
                .context("TELEGRAM_BOT_TOKEN must be set to discover chat ids")?;
            let poll_timeout = config.telegram.poll_timeout_sec;
            let client = botwatch::notify::TelegramClient::with_api_base(
                &config.telegram.api_base,
                token,
                Duration::from_secs(poll_timeout),
            )?;

            println!("Send any message to the bot; its chat id will be printed here.");
            println!("Press Ctrl+C to stop.");
            tokio::select! {
                _ = botwatch::commands::echo_chat_ids(&client, poll_timeout) => {}
                _ = tokio::signal::ctrl_c() => println!("\nStopped."),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
