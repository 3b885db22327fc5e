mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::handlers::{self, Outcome};
use cli::queue::QueueCommands;
use std::path::PathBuf;

/// Exit code when the operator gave no answer (timeout or skip)
const EXIT_NO_ANSWER: i32 = 2;

#[derive(Parser)]
#[command(name = "chef")]
#[command(version)]
#[command(about = "Ask a human operator questions over Telegram and wait for the answers")]
struct Cli {
    /// Path to configuration file (default: ~/.config/chef/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an informational message (never fails the caller)
    Notify {
        /// Message text
        message: String,
    },

    /// Ask a free-text question
    ///
    /// Examples:
    ///   chef ask "What should the release be called?"
    ///   chef ask "Anything else?" --no-wait
    Ask {
        /// Question text
        prompt: String,

        #[command(flatten)]
        wait: cli::handlers::WaitArgs,
    },

    /// Ask the operator to pick one option
    ///
    /// Examples:
    ///   chef choose "Pick one" Red Green Blue
    ///   chef choose "Which branch?" main develop --freeform
    Choose {
        /// Question text
        prompt: String,

        /// Options (1 to 26)
        #[arg(required = true)]
        options: Vec<String>,

        /// Accept any other typed reply as a free-form answer
        #[arg(long)]
        freeform: bool,

        #[command(flatten)]
        wait: cli::handlers::WaitArgs,
    },

    /// Ask a yes/no question
    Confirm {
        /// Question text
        prompt: String,

        #[command(flatten)]
        wait: cli::handlers::WaitArgs,
    },

    /// Ask the operator for a photo (they may reply "skip")
    Photo {
        /// What to photograph
        prompt: String,

        #[command(flatten)]
        wait: cli::handlers::WaitArgs,
    },

    /// Upload a local image to the chat
    SendPhoto {
        /// Image file path
        path: PathBuf,

        /// Optional caption
        #[arg(short, long)]
        caption: Option<String>,
    },

    /// Inspect and manage queued requests
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = handlers::load_config(cli.config.as_deref())?;
    chef_core::services::logging::init_logging(config.log_level);

    let outcome = match cli.command {
        Commands::Notify { message } => handlers::handle_notify(&config, &message).await,
        Commands::Ask { prompt, wait } => handlers::handle_ask(&config, &prompt, &wait).await,
        Commands::Choose {
            prompt,
            options,
            freeform,
            wait,
        } => handlers::handle_choose(&config, &prompt, &options, freeform, &wait).await,
        Commands::Confirm { prompt, wait } => {
            handlers::handle_confirm(&config, &prompt, &wait).await
        }
        Commands::Photo { prompt, wait } => handlers::handle_photo(&config, &prompt, &wait).await,
        Commands::SendPhoto { path, caption } => {
            handlers::handle_send_photo(&config, &path, caption.as_deref()).await
        }
        Commands::Queue { command } => cli::queue::handle_queue_command(&config, command).await,
    };

    match outcome {
        Ok(Outcome::Done) => Ok(()),
        Ok(Outcome::NoAnswer) => std::process::exit(EXIT_NO_ANSWER),
        Err(e) => {
            chef_core::services::logging::log_error(&format!("{:#}", e), None);
            Err(e)
        }
    }
}
