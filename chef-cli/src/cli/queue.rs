//! Queue subcommands (list, check, cancel, clear)

use anyhow::{Context, Result};
use chef_core::models::{Configuration, PendingRequest};
use chef_core::store::{FileQueue, PendingStore};
use clap::Subcommand;
use uuid::Uuid;

use super::handlers::{build_client, Outcome};

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued requests
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Poll once and show a request; a resolved request is removed after printing
    Check {
        /// Request id printed by --no-wait
        id: Uuid,

        /// Keep a resolved request in the queue
        #[arg(long)]
        keep: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Withdraw an unanswered request
    Cancel {
        /// Request id
        id: Uuid,
    },
    /// Remove every queued request
    Clear,
}

pub async fn handle_queue_command(config: &Configuration, command: QueueCommands) -> Result<Outcome> {
    match command {
        QueueCommands::List { json } => handle_list(config, json).await,
        QueueCommands::Check { id, keep, json } => handle_check(config, id, keep, json).await,
        QueueCommands::Cancel { id } => handle_cancel(config, id).await,
        QueueCommands::Clear => handle_clear(config).await,
    }
}

pub(crate) fn status(request: &PendingRequest) -> &'static str {
    if request.is_resolved() {
        "resolved"
    } else if request.expired {
        "expired"
    } else {
        "open"
    }
}

fn open_queue(config: &Configuration) -> Result<FileQueue> {
    let dir = config.queue_dir();
    FileQueue::open(&dir).with_context(|| format!("Cannot open queue at {}", dir.display()))
}

async fn handle_list(config: &Configuration, json: bool) -> Result<Outcome> {
    let requests = open_queue(config)?.list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&requests)?);
        return Ok(Outcome::Done);
    }
    if requests.is_empty() {
        println!("No queued requests");
        return Ok(Outcome::Done);
    }
    println!("id\tkind\tstatus\tcreated\tprompt");
    for r in &requests {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            r.id,
            r.kind.name(),
            status(r),
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.prompt.lines().next().unwrap_or("")
        );
    }
    Ok(Outcome::Done)
}

async fn handle_check(config: &Configuration, id: Uuid, keep: bool, json: bool) -> Result<Outcome> {
    let client = build_client(config, None)?;
    let request = client.check(id).await.context("Check failed")?;
    if request.is_resolved() && !keep {
        client.take(id).await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&request)?);
    } else {
        let answer = request.describe_result();
        println!("{}\t{}\t{}", request.id, status(&request), answer.unwrap_or_default());
    }
    if request.is_resolved() {
        Ok(Outcome::Done)
    } else {
        Ok(Outcome::NoAnswer)
    }
}

async fn handle_cancel(config: &Configuration, id: Uuid) -> Result<Outcome> {
    let client = build_client(config, None)?;
    client.cancel(id).await.context("Cancel failed")?;
    println!("Cancelled {}", id);
    Ok(Outcome::Done)
}

async fn handle_clear(config: &Configuration) -> Result<Outcome> {
    let removed = open_queue(config)?.clear().await?;
    println!("Removed {} request(s)", removed);
    Ok(Outcome::Done)
}
