//! Audit configuration helpers.
//!
//! Configuration is an optional JSON file. Every field has a default so an
//! empty object is a valid config; unknown fields are rejected to catch typos.
use crate::audit::sanitize::{
    SentinelLiterals, DEFAULT_NOT_A_NUMBER_LITERAL, DEFAULT_NOT_A_STRING_LITERAL,
};
use crate::audit::substitute::PlaceholderPolicy;
use crate::audit::EngineOptions;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
const APP_DIR: &str = "baudit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub schema_version: u32,
    /// Directory holding benchmark JSON files; `~/.baudit/benchmarks` when unset.
    pub benchmarks_dir: Option<PathBuf>,
    pub shell: String,
    pub probe_timeout_seconds: u64,
    pub placeholder_policy: PlaceholderPolicy,
    pub not_a_number_literal: String,
    pub not_a_string_literal: String,
    /// Report tests that evaluated zero combinations as failed.
    pub fail_on_empty: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        default_config()
    }
}

impl AuditConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            placeholder_policy: self.placeholder_policy,
            sentinels: SentinelLiterals {
                not_a_number: self.not_a_number_literal.clone(),
                not_a_string: self.not_a_string_literal.clone(),
            },
        }
    }

    /// Resolve the benchmarks directory: CLI override, then config, then home.
    pub fn benchmarks_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.benchmarks_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow!("cannot determine home directory; pass --benchmarks"))?;
        Ok(home.join(format!(".{APP_DIR}")).join("benchmarks"))
    }
}

/// Defaults favor the most permissive, widely available shell and a bounded
/// probe runtime.
pub fn default_config() -> AuditConfig {
    AuditConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        benchmarks_dir: None,
        shell: "sh".to_string(),
        probe_timeout_seconds: DEFAULT_PROBE_TIMEOUT_SECS,
        placeholder_policy: PlaceholderPolicy::default(),
        not_a_number_literal: DEFAULT_NOT_A_NUMBER_LITERAL.to_string(),
        not_a_string_literal: DEFAULT_NOT_A_STRING_LITERAL.to_string(),
        fail_on_empty: false,
    }
}

/// Render a pretty JSON config stub.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize config stub")
}

/// `<config_dir>/baudit/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

pub fn load_config(path: &Path) -> Result<AuditConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: AuditConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Load the explicit config, else the default location when it exists, else
/// built-in defaults; the result is validated.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AuditConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => load_config(&path)?,
            None => default_config(),
        },
    };
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &AuditConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.shell.trim().is_empty() {
        return Err(anyhow!("shell must be non-empty"));
    }
    if config.probe_timeout_seconds == 0 {
        return Err(anyhow!("probe_timeout_seconds must be greater than zero"));
    }
    if config.not_a_number_literal.trim().is_empty() {
        return Err(anyhow!("not_a_number_literal must be non-empty"));
    }
    if config.not_a_string_literal.is_empty() {
        return Err(anyhow!("not_a_string_literal must be non-empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default_config() {
        let config: AuditConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, default_config());
        validate_config(&config).unwrap();
    }

    #[test]
    fn stub_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, config_stub().unwrap()).unwrap();
        assert_eq!(resolve_config(Some(&path)).unwrap(), default_config());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = serde_json::from_str::<AuditConfig>(r#"{"shel": "bash"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{err}");
    }

    #[test]
    fn parses_policy_and_overrides() {
        let config: AuditConfig = serde_json::from_str(
            r#"{"placeholder_policy": "always_number", "probe_timeout_seconds": 5, "fail_on_empty": true}"#,
        )
        .unwrap();
        assert_eq!(config.placeholder_policy, PlaceholderPolicy::AlwaysNumber);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert!(config.fail_on_empty);
        assert_eq!(
            config.engine_options().placeholder_policy,
            PlaceholderPolicy::AlwaysNumber
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = default_config();
        config.probe_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = default_config();
        config.schema_version = 2;
        assert!(validate_config(&config).is_err());

        let mut config = default_config();
        config.shell = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn cli_override_wins_for_benchmarks_dir() {
        let mut config = default_config();
        config.benchmarks_dir = Some(PathBuf::from("/etc/baudit/benchmarks"));
        assert_eq!(
            config.benchmarks_dir(Some(Path::new("/tmp/bench"))).unwrap(),
            PathBuf::from("/tmp/bench")
        );
        assert_eq!(
            config.benchmarks_dir(None).unwrap(),
            PathBuf::from("/etc/baudit/benchmarks")
        );
    }
}
