use anyhow::{Context, Result};
use atrium_core::config::{ServiceBackend, ServiceConfig};
use atrium_infrastructure::{ConfigLoader, build_service};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "atrium")]
#[command(about = "Atrium CLI - browse and edit agents, tasks and chats", long_about = None)]
struct Cli {
    /// Config file (defaults to $ATRIUM_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every entity of a kind
    List {
        kind: String,
        /// list, short-list or table
        #[arg(long, default_value = "list")]
        mode: String,
    },
    /// Show one entity
    Show {
        kind: String,
        id: String,
        /// card or view
        #[arg(long, default_value = "view")]
        mode: String,
    },
    /// Create an entity from its default form
    New {
        kind: String,
        /// Field assignment, `key=value`; values are parsed as JSON when possible
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Update fields of an entity
    Edit {
        kind: String,
        id: String,
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Work with a chat
    Chat {
        chat_id: String,
        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a user message and generate a reply
    Send { text: String },
    /// Drop replies after the last user message and generate again
    Regenerate,
    /// Print the conversation
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new(cli.config.clone())
        .load()
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let service = build_service(&config.service).context("Failed to build data service")?;
    tracing::debug!("[atrium] using {:?} backend", config.service.backend);
    if let Some(notice) = backend_notice(&config.service) {
        eprintln!("{notice}");
    }

    match cli.command {
        Commands::List { kind, mode } => commands::entity::list(service, &kind, &mode).await?,
        Commands::Show { kind, id, mode } => {
            commands::entity::show(service, &kind, &id, &mode).await?
        }
        Commands::New { kind, set } => commands::entity::create(service, &kind, &set).await?,
        Commands::Edit { kind, id, set } => {
            commands::entity::edit(service, &kind, &id, &set).await?
        }
        Commands::Chat { chat_id, action } => match action {
            ChatAction::Send { text } => commands::chat::send(service, &chat_id, &text).await?,
            ChatAction::Regenerate => commands::chat::regenerate(service, &chat_id).await?,
            ChatAction::Show => commands::chat::show(service, &chat_id).await?,
        },
    }

    Ok(())
}

/// Warns that the in-memory store starts empty on every run.
fn backend_notice(service: &ServiceConfig) -> Option<&'static str> {
    match service.backend {
        ServiceBackend::Memory => Some(
            "note: using the in-memory backend; data does not persist between runs. \
             Set `backend = \"http\"` under [service] to use a remote API.",
        ),
        ServiceBackend::Http => None,
    }
}
