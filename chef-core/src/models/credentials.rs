//! Bot credentials from the environment or `.env` files

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ChefError, Result};

pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// Files checked in every directory, most specific first
const ENV_FILES: &[&str] = &[".env.local", ".env"];

/// Access token and target chat. `Debug` redacts the token.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Credentials {
    /// Resolve from process environment, then `.env.local`/`.env` searched
    /// upward from the current directory.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_with(|key| std::env::var(key).ok(), &cwd)
    }

    /// Resolve with an explicit environment lookup (lets tests avoid mutating
    /// the process environment).
    pub fn resolve_with<F>(env_lookup: F, start_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let files = discover_env_files(start_dir);
        let lookup = |var: &'static str| -> Result<String> {
            env_lookup(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| files.iter().find_map(|vars| vars.get(var).cloned()))
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .ok_or(ChefError::MissingCredential { var })
        };

        let token = lookup(TOKEN_VAR)?;
        let chat_id = lookup(CHAT_ID_VAR)?;
        Ok(Self { token, chat_id })
    }
}

/// Parse every env file from `start_dir` up to the filesystem root, nearest first
fn discover_env_files(start_dir: &Path) -> Vec<HashMap<String, String>> {
    let mut found = Vec::new();
    for dir in start_dir.ancestors() {
        for name in ENV_FILES {
            let path: PathBuf = dir.join(name);
            if let Ok(content) = std::fs::read_to_string(&path) {
                tracing::debug!(path = %path.display(), "Loaded env file");
                found.push(parse_env_file(&content));
            }
        }
    }
    found
}

/// Minimal dotenv syntax: `KEY=value`, optional `export`, quotes, `#` comments
pub(crate) fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value.split(" #").next().unwrap_or(value).trim_end()
        };
        vars.insert(key.trim().to_string(), value.to_string());
    }
    vars
}
