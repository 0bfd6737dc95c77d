use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tally_ai::{
    AiSettings, AnthropicClient, RuleGenSettings, DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub categorize: CategorizeSection,
    pub rules: RulesSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CategorizeSection {
    /// Transactions per model request
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesSection {
    pub categories_per_batch: usize,
    pub examples_per_category: usize,
    pub rules_per_category: usize,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for CategorizeSection {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for RulesSection {
    fn default() -> Self {
        let d = RuleGenSettings::default();
        Self {
            categories_per_batch: d.categories_per_batch,
            examples_per_category: d.examples_per_category,
            rules_per_category: d.rules_per_category,
        }
    }
}

impl Config {
    pub fn ai_settings(&self) -> AiSettings {
        AiSettings {
            batch_size: self.categorize.batch_size,
            max_tokens: self.llm.max_tokens,
        }
    }

    pub fn rule_gen_settings(&self) -> RuleGenSettings {
        RuleGenSettings {
            categories_per_batch: self.rules.categories_per_batch,
            examples_per_category: self.rules.examples_per_category,
            rules_per_category: self.rules.rules_per_category,
            max_tokens: self.llm.max_tokens,
        }
    }

    /// Anthropic client for `api_key` using the configured model and endpoint
    pub fn client(&self, api_key: &str) -> Result<AnthropicClient> {
        Ok(AnthropicClient::new(api_key)?
            .with_base_url(&self.llm.base_url)
            .with_model(&self.llm.model))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
