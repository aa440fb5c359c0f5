//! Loader configuration.
//!
//! Loaded from YAML (with `${VAR}` / `${VAR:-default}` substitution), from
//! `MSG_*` environment variables, or built in code.
//!
//! ```yaml
//! base_path: ${MSG_DATA_DIR:-/data/msg}
//! prefixes:
//!   - "%Y/%m/%d/%Y%m%d_%H%M/"
//! tolerance_minutes: 5
//! match_policy: first
//! row_order: south_up
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Duration;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::filename::FilenamePattern;
use crate::layout::RowOrder;
use crate::resolver::{MatchPolicy, DEFAULT_PREFIX};

/// Default half-width of the time window (minutes).
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 5;

/// Upper bound for `tolerance_minutes` (one leap year).
pub const MAX_TOLERANCE_MINUTES: i64 = 60 * 24 * 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Root of the archive tree
    pub base_path: PathBuf,
    /// strftime directory templates, tried in order
    pub prefixes: Vec<String>,
    pub tolerance_minutes: i64,
    pub match_policy: MatchPolicy,
    pub row_order: RowOrder,
    /// Where decompressed scenes are written (default: /dev/shm or system temp)
    pub temp_dir: Option<PathBuf>,
    /// Custom filename regex; must declare the standard named groups
    pub filename_pattern: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            prefixes: vec![DEFAULT_PREFIX.to_string()],
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            match_policy: MatchPolicy::default(),
            row_order: RowOrder::default(),
            temp_dir: None,
            filename_pattern: None,
        }
    }
}

impl LoaderConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_tolerance_minutes(mut self, minutes: i64) -> Self {
        self.tolerance_minutes = minutes;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn with_filename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.filename_pattern = Some(pattern.into());
        self
    }

    /// Half-width of the time window, clamped to `0..=MAX_TOLERANCE_MINUTES`.
    pub fn tolerance(&self) -> Duration {
        Duration::minutes(self.tolerance_minutes.clamp(0, MAX_TOLERANCE_MINUTES))
    }

    /// Parse YAML after environment substitution, then validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: LoaderConfig =
            serde_yaml::from_str(&expanded).context("Failed to parse loader config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid loader config: {}", path.display()))
    }

    /// Build from `MSG_*` environment variables on top of the defaults.
    ///
    /// - `MSG_DATA_DIR`: archive root
    /// - `MSG_PREFIXES`: comma-separated prefix templates
    /// - `MSG_TOLERANCE_MINUTES`
    /// - `MSG_TEMP_DIR`
    /// - `MSG_MATCH_POLICY`: `first` or `closest`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = env_var("MSG_DATA_DIR") {
            config.base_path = PathBuf::from(dir);
        }
        if let Some(prefixes) = env_var("MSG_PREFIXES") {
            config.prefixes = prefixes
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(minutes) = env_var("MSG_TOLERANCE_MINUTES") {
            config.tolerance_minutes = minutes
                .trim()
                .parse()
                .with_context(|| format!("Invalid MSG_TOLERANCE_MINUTES: {}", minutes))?;
        }
        if let Some(dir) = env_var("MSG_TEMP_DIR") {
            config.temp_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = env_var("MSG_MATCH_POLICY") {
            config.match_policy = policy
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid MSG_MATCH_POLICY")?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.base_path.as_os_str().is_empty(),
            "base_path cannot be empty"
        );
        anyhow::ensure!(
            !self.prefixes.is_empty(),
            "At least one directory prefix is required"
        );
        anyhow::ensure!(
            (0..=MAX_TOLERANCE_MINUTES).contains(&self.tolerance_minutes),
            "tolerance_minutes must be between 0 and {}, got {}",
            MAX_TOLERANCE_MINUTES,
            self.tolerance_minutes
        );
        if let Some(pattern) = &self.filename_pattern {
            FilenamePattern::new(pattern).context("Invalid filename_pattern")?;
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn var_ref() -> &'static Regex {
    static VAR_REF: OnceLock<Regex> = OnceLock::new();
    VAR_REF.get_or_init(|| Regex::new(r"\$\{([^{}]*)\}").expect("valid regex"))
}

/// Expand `${VAR}` and `${VAR:-default}` references.
///
/// A `${` left without its closing brace is an error.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut expanded = String::with_capacity(content.len());
    let mut last = 0;

    for caps in var_ref().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        push_literal(&mut expanded, &content[last..whole.start()])?;
        expanded.push_str(&lookup_var(&caps)?);
        last = whole.end();
    }
    push_literal(&mut expanded, &content[last..])?;

    Ok(expanded)
}

fn push_literal(out: &mut String, text: &str) -> Result<()> {
    if let Some(pos) = text.find("${") {
        anyhow::bail!("Unclosed variable substitution: {}", &text[pos..]);
    }
    out.push_str(text);
    Ok(())
}

fn lookup_var(caps: &Captures<'_>) -> Result<String> {
    let expr = &caps[1];
    let (name, default) = match expr.split_once(":-") {
        Some((name, default)) => (name.trim(), Some(default)),
        None => (expr.trim(), None),
    };

    match default {
        Some(default) => Ok(env_var(name).unwrap_or_else(|| default.to_string())),
        None => std::env::var(name)
            .with_context(|| format!("Environment variable {} not set", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.prefixes, vec![DEFAULT_PREFIX.to_string()]);
        assert_eq!(config.tolerance(), Duration::minutes(5));
        assert_eq!(config.match_policy, MatchPolicy::First);
        assert_eq!(config.row_order, RowOrder::SouthUp);
        assert!(config.temp_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_with_defaults_filled_in() {
        let config = LoaderConfig::from_yaml_str(
            "base_path: /data/msg\ntolerance_minutes: 10\nmatch_policy: closest\n",
        )
        .unwrap();
        assert_eq!(config.base_path, PathBuf::from("/data/msg"));
        assert_eq!(config.tolerance_minutes, 10);
        assert_eq!(config.match_policy, MatchPolicy::Closest);
        assert_eq!(config.prefixes, vec![DEFAULT_PREFIX.to_string()]);
    }

    #[test]
    fn test_yaml_row_order_and_temp_dir() {
        let config = LoaderConfig::from_yaml_str(
            "base_path: /data\nrow_order: north_up\ntemp_dir: /scratch\nprefixes: ['%Y%m%d/']\n",
        )
        .unwrap();
        assert_eq!(config.row_order, RowOrder::NorthUp);
        assert_eq!(config.temp_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(config.prefixes, vec!["%Y%m%d/".to_string()]);
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("MSG_SCENE_CONFIG_TEST_ROOT", "/archive/seviri");
        let config = LoaderConfig::from_yaml_str(
            "base_path: ${MSG_SCENE_CONFIG_TEST_ROOT}\ntemp_dir: ${MSG_SCENE_CONFIG_TEST_UNSET:-/tmp/msg}\n",
        )
        .unwrap();
        assert_eq!(config.base_path, PathBuf::from("/archive/seviri"));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/msg")));
    }

    #[test]
    fn test_env_substitution_errors() {
        assert!(expand_env_vars("base_path: ${MSG_SCENE_CONFIG_TEST_MISSING}").is_err());
        assert!(expand_env_vars("base_path: ${UNCLOSED").is_err());
        assert!(expand_env_vars("a: ${UNCLOSED\nb: ${HOME:-x}").is_err());
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
        assert_eq!(
            expand_env_vars("{braces}: ${MSG_SCENE_CONFIG_TEST_UNSET:-}").unwrap(),
            "{braces}: "
        );
    }

    #[test]
    fn test_tolerance_clamped_when_unvalidated() {
        let config = LoaderConfig::new("/data").with_tolerance_minutes(i64::MAX);
        assert!(config.validate().is_err());
        assert_eq!(config.tolerance(), Duration::minutes(MAX_TOLERANCE_MINUTES));

        let config = LoaderConfig::new("/data").with_tolerance_minutes(-3);
        assert_eq!(config.tolerance(), Duration::zero());
    }

    #[test]
    fn test_validation() {
        assert!(LoaderConfig::from_yaml_str("prefixes: []\n").is_err());
        assert!(LoaderConfig::from_yaml_str("tolerance_minutes: -1\n").is_err());
        assert!(LoaderConfig::from_yaml_str("tolerance_minutes: 1000000000000\n").is_err());
        assert!(LoaderConfig::from_yaml_str("tolerance_minutes: 9000000000000000000\n").is_err());
        let year = format!("tolerance_minutes: {}\n", MAX_TOLERANCE_MINUTES);
        assert!(LoaderConfig::from_yaml_str(&year).is_ok());
        assert!(LoaderConfig::from_yaml_str("filename_pattern: '^(?P<msg_id>\\d)$'\n").is_err());
        assert!(LoaderConfig::from_yaml_str("match_policy: nearest\n").is_err());
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.yaml");
        std::fs::write(&path, "base_path: /data/msg\n").unwrap();
        let config = LoaderConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/data/msg"));

        assert!(LoaderConfig::from_yaml_file(dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("MSG_DATA_DIR", "/env/msg");
        std::env::set_var("MSG_PREFIXES", "%Y/%m/%d/, %Y%m%d/");
        std::env::set_var("MSG_TOLERANCE_MINUTES", "7");
        std::env::set_var("MSG_MATCH_POLICY", "closest");
        let config = LoaderConfig::from_env();

        std::env::set_var("MSG_TOLERANCE_MINUTES", "soon");
        let bad = LoaderConfig::from_env();

        for name in [
            "MSG_DATA_DIR",
            "MSG_PREFIXES",
            "MSG_TOLERANCE_MINUTES",
            "MSG_MATCH_POLICY",
        ] {
            std::env::remove_var(name);
        }

        let config = config.unwrap();
        assert_eq!(config.base_path, PathBuf::from("/env/msg"));
        assert_eq!(config.prefixes, vec!["%Y/%m/%d/", "%Y%m%d/"]);
        assert_eq!(config.tolerance_minutes, 7);
        assert_eq!(config.match_policy, MatchPolicy::Closest);
        assert!(bad.is_err());
    }

    #[test]
    fn test_builder() {
        let config = LoaderConfig::new("/data")
            .with_tolerance_minutes(15)
            .with_match_policy(MatchPolicy::Closest)
            .with_row_order(RowOrder::NorthUp)
            .with_temp_dir("/scratch");
        assert_eq!(config.tolerance(), Duration::minutes(15));
        assert_eq!(config.temp_dir, Some(PathBuf::from("/scratch")));
        assert!(config.validate().is_ok());
    }
}
