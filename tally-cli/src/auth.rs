use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tally_ai::{AiError, AnthropicClient};

use crate::config::Config;
use crate::state::ensure_tally_home;

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub anthropic_api_key: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// `$ANTHROPIC_API_KEY`, else the key saved in auth.json
pub fn anthropic_api_key() -> Result<Option<String>> {
    if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
        return Ok(Some(key));
    }
    Ok(load_auth()?.anthropic_api_key.filter(|k| !k.trim().is_empty()))
}

/// Configured client, or `None` when no API key is available
pub fn anthropic_client(cfg: &Config) -> Result<Option<AnthropicClient>> {
    match anthropic_api_key()? {
        Some(key) => Ok(Some(cfg.client(&key)?)),
        None => Ok(None),
    }
}

pub fn require_anthropic_client(cfg: &Config) -> Result<AnthropicClient> {
    anthropic_client(cfg)?
        .ok_or_else(|| anyhow::Error::new(AiError::MissingApiKey))
        .context("run `tally auth paste-anthropic-key` or set ANTHROPIC_API_KEY")
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn check_anthropic_key(key: &str) -> Result<()> {
    if !key.starts_with("sk-ant-") {
        bail!("key didn't look like an Anthropic API key (expected prefix sk-ant-)");
    }
    Ok(())
}

pub fn anthropic_paste_key() -> Result<()> {
    let key = prompt_secret("Paste Anthropic API key (starts with sk-ant-)")?;
    check_anthropic_key(&key)?;
    let mut auth = load_auth()?;
    auth.anthropic_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Anthropic API key to {}", auth_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefix_check() {
        assert!(check_anthropic_key("sk-ant-abc").is_ok());
        assert!(check_anthropic_key("sk-abc").is_err());
        assert!(check_anthropic_key("").is_err());
    }

    #[test]
    fn test_auth_state_json_shape() {
        let auth: AuthState = serde_json::from_str(r#"{"anthropic_api_key":"sk-ant-1"}"#).unwrap();
        assert_eq!(auth.anthropic_api_key.as_deref(), Some("sk-ant-1"));
        assert_eq!(serde_json::from_str::<AuthState>("{}").unwrap(), AuthState::default());
    }
}
