use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryProvider {
    #[default]
    Deepseek,
    Openai,
}

impl std::fmt::Display for SummaryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryProvider::Deepseek => write!(f, "deepseek"),
            SummaryProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: SummaryProvider,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SummarizerConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            SummaryProvider::Deepseek => "https://api.deepseek.com/v1",
            SummaryProvider::Openai => "https://api.openai.com/v1",
        }
    }

    /// Model to request; empty config falls back to the provider default.
    pub fn effective_model(&self) -> &str {
        if !self.model.is_empty() {
            return &self.model;
        }
        match self.provider {
            SummaryProvider::Deepseek => "deepseek-chat",
            SummaryProvider::Openai => "gpt-4o-mini",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub summarizer: SummarizerConfig,
    /// Surveillance keywords in priority order.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_registry_config")]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default = "default_health_config")]
    pub health: HealthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// The single fixed recipient of all alerts and digests.
    pub operator_chat_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    /// 6-field cron expression (seconds first). Takes precedence over
    /// `every_hours` when both are set.
    #[serde(default)]
    pub cron: Option<String>,
    /// Fixed digest interval in hours.
    #[serde(default)]
    pub every_hours: Option<u64>,
}

/// How the digest job is registered with the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportSchedule {
    Cron(String),
    Every(Duration),
}

impl ReportConfig {
    pub fn schedule(&self) -> ReportSchedule {
        if let Some(cron) = &self.cron {
            return ReportSchedule::Cron(cron.clone());
        }
        let hours = self.every_hours.unwrap_or(default_report_hours());
        ReportSchedule::Every(Duration::from_secs(hours * 3600))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_health_bind")]
    pub bind_addr: SocketAddr,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_keywords() -> Vec<String> {
    [
        "上车",
        "YouTube",
        "Netflix",
        "合租",
        "机场",
        "油管",
        "拼车",
        "共享",
        "会员",
        "Apple Music",
        "iCloud",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("known_visitors.db")
}

fn default_registry_config() -> RegistryConfig {
    RegistryConfig {
        database_path: default_registry_path(),
    }
}

fn default_report_hours() -> u64 {
    // weekly
    24 * 7
}

fn default_health_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 10000))
}

fn default_health_config() -> HealthConfig {
    HealthConfig {
        bind_addr: default_health_bind(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Missing required credentials are fatal; the process must not start.
    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            bail!("telegram.bot_token must be set");
        }
        if self.telegram.operator_chat_id == 0 {
            bail!("telegram.operator_chat_id must be set");
        }
        if self.summarizer.api_key.is_empty() {
            bail!("summarizer.api_key must be set");
        }
        if self.summarizer.timeout_secs == 0 {
            bail!("summarizer.timeout_secs must be at least 1");
        }
        Ok(())
    }
}
