//! CLI command handlers

use anyhow::{Context, Result};
use chef_core::models::{ChoiceAnswer, Configuration, Credentials};
use chef_core::providers::TelegramBackend;
use chef_core::store::FileQueue;
use chef_core::{ChefClient, ClientOptions};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type Client = ChefClient<TelegramBackend, FileQueue>;

/// How a command ended when it did not fail
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The operator did not answer (timed out or skipped)
    NoAnswer,
}

/// Options shared by every question command
#[derive(Args, Debug, Default)]
pub struct WaitArgs {
    /// Seconds to wait for an answer (0 = forever; default from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Send the prompt, print the request id and exit; collect later with `chef queue check`
    #[arg(long)]
    pub no_wait: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Load and validate configuration (defaults when the file does not exist)
pub fn load_config(path: Option<&Path>) -> Result<Configuration> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Configuration::default_config_path()?,
    };
    let config = Configuration::load_from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("Invalid config {}: {}", path.display(), errors.join("; ")))?;
    Ok(config)
}

/// Client over Telegram with the shared file queue, so blocking and queued
/// prompts use the same update cursor.
pub fn build_client(config: &Configuration, timeout_override: Option<u64>) -> Result<Client> {
    let credentials = Credentials::load().context("Cannot start without bot credentials")?;
    let backend = TelegramBackend::with_api_base(credentials.token, config.api_base.clone());
    let queue = FileQueue::open(config.queue_dir())?;

    let mut options = ClientOptions::from_config(config);
    if let Some(secs) = timeout_override {
        let limit = (secs > 0).then(|| Duration::from_secs(secs));
        options.ask_timeout = limit;
        options.photo_timeout = limit;
    }
    Ok(ChefClient::new(
        Arc::new(backend),
        queue,
        credentials.chat_id,
        options,
    ))
}

/// Print a received answer (or its absence)
fn emit(json: bool, answer: Option<(serde_json::Value, String)>) -> Result<Outcome> {
    match answer {
        Some((value, text)) => {
            if json {
                let out = serde_json::json!({
                    "answered": true,
                    "answer": value,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", text);
            }
            Ok(Outcome::Done)
        }
        None => {
            if json {
                let out = serde_json::json!({ "answered": false, "answer": null });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                eprintln!("No answer received");
            }
            Ok(Outcome::NoAnswer)
        }
    }
}

fn emit_submitted(json: bool, id: Uuid) -> Result<Outcome> {
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "id": id }))?);
    } else {
        println!("{}", id);
    }
    Ok(Outcome::Done)
}

pub async fn handle_notify(config: &Configuration, message: &str) -> Result<Outcome> {
    let client = build_client(config, None)?;
    client.notify(message).await;
    Ok(Outcome::Done)
}

pub async fn handle_ask(config: &Configuration, prompt: &str, wait: &WaitArgs) -> Result<Outcome> {
    let client = build_client(config, wait.timeout)?;
    if wait.no_wait {
        let id = client.submit_text(prompt).await.context("Failed to send question")?;
        return emit_submitted(wait.json, id);
    }
    let answer = client.ask_text(prompt).await.context("Failed to ask question")?;
    emit(
        wait.json,
        answer.map(|text| (serde_json::Value::String(text.clone()), text)),
    )
}

pub async fn handle_choose(
    config: &Configuration,
    prompt: &str,
    options: &[String],
    freeform: bool,
    wait: &WaitArgs,
) -> Result<Outcome> {
    let client = build_client(config, wait.timeout)?;
    if wait.no_wait {
        let id = client
            .submit_choice(prompt, options, freeform)
            .await
            .context("Failed to send choice")?;
        return emit_submitted(wait.json, id);
    }
    let answer = client
        .ask_choice(prompt, options, freeform)
        .await
        .context("Failed to ask choice")?;
    emit(wait.json, answer.map(|a| describe_choice(&a, options)))
}

fn describe_choice(answer: &ChoiceAnswer, options: &[String]) -> (serde_json::Value, String) {
    match answer {
        ChoiceAnswer::Index(index) => {
            let value = options.get(*index).cloned().unwrap_or_default();
            (
                serde_json::json!({ "index": index, "value": value }),
                value,
            )
        }
        ChoiceAnswer::Freeform(text) => (serde_json::json!({ "freeform": text }), text.clone()),
    }
}

pub async fn handle_confirm(
    config: &Configuration,
    prompt: &str,
    wait: &WaitArgs,
) -> Result<Outcome> {
    let client = build_client(config, wait.timeout)?;
    if wait.no_wait {
        let id = client.submit_confirm(prompt).await.context("Failed to send confirmation")?;
        return emit_submitted(wait.json, id);
    }
    let answer = client.ask_confirm(prompt).await.context("Failed to ask confirmation")?;
    emit(
        wait.json,
        answer.map(|yes| {
            let text = if yes { "yes" } else { "no" };
            (serde_json::Value::Bool(yes), text.to_string())
        }),
    )
}

pub async fn handle_photo(config: &Configuration, prompt: &str, wait: &WaitArgs) -> Result<Outcome> {
    let client = build_client(config, wait.timeout)?;
    if wait.no_wait {
        let id = client.submit_photo(prompt).await.context("Failed to send photo request")?;
        return emit_submitted(wait.json, id);
    }
    let path = client.ask_photo(prompt).await.context("Failed to request photo")?;
    emit(
        wait.json,
        path.map(|p| {
            let text = p.display().to_string();
            (serde_json::Value::String(text.clone()), text)
        }),
    )
}

pub async fn handle_send_photo(
    config: &Configuration,
    path: &Path,
    caption: Option<&str>,
) -> Result<Outcome> {
    let client = build_client(config, None)?;
    let sent = client
        .send_photo(path, caption)
        .await
        .with_context(|| format!("Failed to send {}", path.display()))?;
    tracing::debug!(message_id = sent.message_id, "send-photo complete");
    Ok(Outcome::Done)
}
