use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use syncwatch::channel::ChannelConfig;
use syncwatch::registry::{DEFAULT_INACTIVITY_SECS, Registry};
use syncwatch::supervisor::Supervisor;
use syncwatch::{Result, paths};

#[derive(Parser)]
#[command(name = "syncwatch")]
#[command(about = "Sync-completion notifications for watched folders")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitor service and block until terminated
    Start,

    /// Add a folder to monitor
    Add {
        /// Name for the monitored folder
        name: String,

        /// Path to the folder
        path: PathBuf,

        #[command(subcommand)]
        channel: ChannelArgs,
    },

    /// Remove a monitored folder
    Remove {
        /// Name of the monitored folder
        name: String,
    },

    /// Show the configured folders
    Status,
}

/// Options shared by every notification provider.
#[derive(Args)]
struct CommonChannelArgs {
    /// Custom notification message; use {folder} as a placeholder
    #[arg(long)]
    message: Option<String>,

    /// Inactivity period in seconds before sending a notification
    #[arg(long, default_value_t = DEFAULT_INACTIVITY_SECS)]
    inactivity: u64,
}

#[derive(Subcommand)]
enum ChannelArgs {
    /// Use ntfy for notifications
    Ntfy {
        /// ntfy topic
        topic: String,

        /// ntfy server URL
        #[arg(long, default_value = "https://ntfy.sh")]
        server: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },

    /// Use Pushover for notifications
    Pushover {
        /// Pushover API token
        api_token: String,

        /// Pushover user key
        user_key: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },

    /// Use a Discord webhook for notifications
    Discord {
        /// Discord webhook URL
        webhook_url: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },

    /// Use a Telegram bot for notifications
    Telegram {
        /// Telegram bot token
        bot_token: String,

        /// Telegram chat ID
        chat_id: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },

    /// Use Gotify for notifications
    Gotify {
        /// Gotify server URL
        server: String,

        /// Gotify application token
        token: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },

    /// Use a Matrix room for notifications
    Matrix {
        /// Matrix homeserver URL
        homeserver: String,

        /// Matrix access token
        access_token: String,

        /// Matrix room ID
        room_id: String,

        #[command(flatten)]
        common: CommonChannelArgs,
    },
}

impl ChannelArgs {
    fn into_parts(self) -> (ChannelConfig, CommonChannelArgs) {
        match self {
            ChannelArgs::Ntfy {
                topic,
                server,
                common,
            } => (
                ChannelConfig {
                    kind: "ntfy".to_string(),
                    config: json!({ "topic": topic, "server": server }),
                },
                common,
            ),
            ChannelArgs::Pushover {
                api_token,
                user_key,
                common,
            } => (
                ChannelConfig {
                    kind: "pushover".to_string(),
                    config: json!({ "api_token": api_token, "user_key": user_key }),
                },
                common,
            ),
            ChannelArgs::Discord {
                webhook_url,
                common,
            } => (
                ChannelConfig {
                    kind: "discord".to_string(),
                    config: json!({ "webhook_url": webhook_url }),
                },
                common,
            ),
            ChannelArgs::Telegram {
                bot_token,
                chat_id,
                common,
            } => (
                ChannelConfig {
                    kind: "telegram".to_string(),
                    config: json!({ "bot_token": bot_token, "chat_id": chat_id }),
                },
                common,
            ),
            ChannelArgs::Gotify {
                server,
                token,
                common,
            } => (
                ChannelConfig {
                    kind: "gotify".to_string(),
                    config: json!({ "server": server, "token": token }),
                },
                common,
            ),
            ChannelArgs::Matrix {
                homeserver,
                access_token,
                room_id,
                common,
            } => (
                ChannelConfig {
                    kind: "matrix".to_string(),
                    config: json!({
                        "homeserver": homeserver,
                        "access_token": access_token,
                        "room_id": room_id,
                    }),
                },
                common,
            ),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The daemon logs to monitor.log as well as stderr; one-shot commands
    // log to stderr only. The guard must outlive all logging.
    let _guard = init_tracing(matches!(cli.command, Commands::Start));

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_to_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_to_file && std::fs::create_dir_all(paths::config_dir()).is_ok() {
        let appender = tracing_appender::rolling::never(paths::config_dir(), "monitor.log");
        let (file_writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file_writer.and(std::io::stderr))
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Start => {
            let supervisor = Supervisor::new(paths::registry_path())?;
            let started = supervisor.start_all().await;
            tracing::info!("service started with {started} watch(es); press Ctrl+C to stop");

            wait_for_shutdown().await?;

            tracing::info!("stopping service...");
            supervisor.shutdown().await;
            Ok(())
        }

        Commands::Add {
            name,
            path,
            channel,
        } => {
            let (config, common) = channel.into_parts();
            let supervisor = Supervisor::new(paths::registry_path())?;
            supervisor
                .add_folder(
                    &name,
                    &path,
                    config,
                    Duration::from_secs(common.inactivity),
                    common.message,
                )
                .await?;
            supervisor.shutdown().await;
            println!("Monitoring '{name}' at '{}'", path.display());
            Ok(())
        }

        Commands::Remove { name } => {
            let supervisor = Supervisor::new(paths::registry_path())?;
            supervisor.remove_folder(&name).await?;
            println!("Removed '{name}'");
            Ok(())
        }

        Commands::Status => {
            // Live state (last activity, monitoring/idle) only exists inside
            // the running `start` process; here we show the durable registry.
            let registry = Registry::load(&paths::registry_path())?;
            let snapshot: BTreeMap<_, _> = registry
                .folders
                .iter()
                .map(|(name, entry)| {
                    (
                        name.clone(),
                        json!({
                            "path": entry.path,
                            "channel": entry.notification.summary(),
                            "inactivity_period": entry.inactivity_period,
                            "message_template": entry.message_template,
                        }),
                    )
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
