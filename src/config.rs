//! TOML configuration parsing and validation.
//!
//! All settings are read from one file (default `./config/chm.toml`).
//! Only `[db]` is required; every other section falls back to defaults.
//!
//! ```toml
//! [db]
//! path = "./data/chm.sqlite"
//!
//! [naming]
//! grouping = true
//! group_template = "Chapter {n}"
//! include_subtitle = false
//! extension = "docx"
//!
//! [checklist]
//! policy = "replace"
//!
//! [log]
//! max_entries = 100
//!
//! [queue]
//! yield_ms = 50
//! heartbeat_ms = 1000
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chapter_merge_core::checklist::ChecklistPolicy;
use chapter_merge_core::log::DEFAULT_LOG_CAPACITY;
use chapter_merge_core::naming::{NamingPolicy, GROUP_PLACEHOLDER};
use chapter_merge_core::LibraryOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub checklist: ChecklistConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NamingConfig {
    #[serde(default = "default_grouping")]
    pub grouping: bool,
    #[serde(default = "default_group_template")]
    pub group_template: String,
    #[serde(default)]
    pub include_subtitle: bool,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            grouping: default_grouping(),
            group_template: default_group_template(),
            include_subtitle: false,
            extension: default_extension(),
        }
    }
}

fn default_grouping() -> bool {
    true
}
fn default_group_template() -> String {
    "Chapter {n}".to_string()
}
fn default_extension() -> String {
    "docx".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChecklistConfig {
    /// `replace` (replace-and-flag) or `additive`.
    #[serde(default = "default_policy")]
    pub policy: String,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
        }
    }
}

fn default_policy() -> String {
    "replace".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    DEFAULT_LOG_CAPACITY
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Pause between two merges, yielding to other work.
    #[serde(default = "default_yield_ms")]
    pub yield_ms: u64,
    /// Period of the wake-up tick that drains the queue independently of
    /// new arrivals.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            yield_ms: default_yield_ms(),
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}

impl QueueConfig {
    pub fn yield_delay(&self) -> Duration {
        Duration::from_millis(self.yield_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

fn default_yield_ms() -> u64 {
    50
}
fn default_heartbeat_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// A configuration with defaults and a database under `./data`.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/chm.sqlite"),
            },
            naming: NamingConfig::default(),
            checklist: ChecklistConfig::default(),
            log: LogConfig::default(),
            queue: QueueConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// The checklist policy; `load_config` has already validated it.
    pub fn checklist_policy(&self) -> ChecklistPolicy {
        ChecklistPolicy::parse(&self.checklist.policy).unwrap_or_default()
    }

    /// Options for the core [`Library`](chapter_merge_core::Library).
    pub fn library_options(&self) -> LibraryOptions {
        LibraryOptions {
            naming: NamingPolicy {
                group_template: self.naming.group_template.clone(),
                include_subtitle: self.naming.include_subtitle,
                extension: self.naming.extension.clone(),
            },
            checklist_policy: self.checklist_policy(),
            log_capacity: self.log.max_entries,
            default_grouping: self.naming.grouping,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !config.naming.group_template.contains(GROUP_PLACEHOLDER) {
        anyhow::bail!(
            "naming.group_template must contain '{}' (got '{}')",
            GROUP_PLACEHOLDER,
            config.naming.group_template
        );
    }

    let ext = config.naming.extension.as_str();
    if ext.is_empty() || ext.contains('.') || ext.contains('/') {
        anyhow::bail!("naming.extension must be a bare extension such as 'docx'");
    }

    if ChecklistPolicy::parse(&config.checklist.policy).is_none() {
        anyhow::bail!(
            "Unknown checklist policy: '{}'. Must be replace or additive.",
            config.checklist.policy
        );
    }

    if config.log.max_entries == 0 {
        anyhow::bail!("log.max_entries must be >= 1");
    }

    if config.queue.heartbeat_ms == 0 {
        anyhow::bail!("queue.heartbeat_ms must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let cfg = parse("[db]\npath = \"/tmp/x.sqlite\"\n").unwrap();
        assert!(cfg.naming.grouping);
        assert_eq!(cfg.naming.group_template, "Chapter {n}");
        assert_eq!(cfg.log.max_entries, 100);
        assert_eq!(cfg.queue.yield_ms, 50);
        assert_eq!(cfg.checklist_policy(), ChecklistPolicy::ReplaceAndFlag);
    }

    #[test]
    fn test_minimal_matches_file_defaults() {
        let built = Config::minimal();
        validate(&built).unwrap();
        let parsed = parse("[db]\npath = \"./data/chm.sqlite\"\n").unwrap();
        assert_eq!(built.db.path, parsed.db.path);
        assert_eq!(built.naming.group_template, parsed.naming.group_template);
        assert_eq!(built.checklist.policy, parsed.checklist.policy);
        assert_eq!(built.log.max_entries, parsed.log.max_entries);
        assert_eq!(built.queue.heartbeat_ms, parsed.queue.heartbeat_ms);
        assert_eq!(built.server.bind, parsed.server.bind);
    }

    #[test]
    fn test_template_requires_placeholder() {
        let err = parse("[db]\npath = \"x\"\n[naming]\ngroup_template = \"Chapter\"\n").unwrap_err();
        assert!(err.to_string().contains("group_template"));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(parse("[db]\npath = \"x\"\n[checklist]\npolicy = \"maybe\"\n").is_err());
    }

    #[test]
    fn test_additive_policy_maps_to_library_options() {
        let cfg = parse(
            "[db]\npath = \"x\"\n[checklist]\npolicy = \"additive\"\n[naming]\ngroup_template = \"Chương {n}\"\ngrouping = false\n",
        )
        .unwrap();
        let options = cfg.library_options();
        assert_eq!(options.checklist_policy, ChecklistPolicy::Additive);
        assert_eq!(options.naming.group_template, "Chương {n}");
        assert!(!options.default_grouping);
    }

    #[test]
    fn test_zero_log_capacity_rejected() {
        assert!(parse("[db]\npath = \"x\"\n[log]\nmax_entries = 0\n").is_err());
    }
}
