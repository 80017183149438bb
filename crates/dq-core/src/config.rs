//! Configuration: `~/.config/dq/config.toml`, created with defaults on first
//! use. A malformed file is logged and treated as the default configuration;
//! semantically invalid values (missing destination directory, zero
//! intervals) are fatal at `run` startup via [`DqConfig::validate`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Fatal configuration problems, checked before the run loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("destination directory does not exist: {0}")]
    MissingDest(PathBuf),
    #[error("poll_interval_secs must be at least 1")]
    ZeroPollInterval,
    #[error("max_retries must be at least 1")]
    ZeroMaxRetries,
}

/// Global configuration. Constructed once at startup and passed by
/// reference; there is no ambient global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DqConfig {
    /// Queue file: one URL per line.
    pub queue: PathBuf,
    /// State record: retry counters and the active job.
    pub state: PathBuf,
    /// Append-only log of permanently failed URLs.
    pub failed_log: PathBuf,
    /// Append-only log of completed URLs.
    pub completed_log: PathBuf,
    /// Directory downloads land in. Must exist.
    pub dest: PathBuf,
    /// Seconds between wait-for-work polls of the queue file.
    pub poll_interval_secs: u64,
    /// Failures before a URL is abandoned for good. 1 = no retries.
    pub max_retries: u32,
    /// Extra arguments appended to every curl invocation.
    pub curl_args: Vec<String>,
    /// Shell command run after each completed download, with DQ_URL and
    /// DQ_FILE in the environment.
    pub on_complete: Option<String>,
    /// When true, a rejected resume counts against the retry budget instead
    /// of restarting the transfer from scratch within the same attempt.
    pub resume_restart_counts: bool,
    /// Per-host credentials: host -> "user password". Kept last: tables must
    /// follow plain values in the emitted TOML.
    pub auth: HashMap<String, String>,
}

impl Default for DqConfig {
    fn default() -> Self {
        let state_dir = default_state_dir();
        Self {
            queue: state_dir.join("queue"),
            state: state_dir.join("state.json"),
            failed_log: state_dir.join("failed.log"),
            completed_log: state_dir.join("completed.log"),
            dest: home_dir().join("Downloads"),
            poll_interval_secs: 10,
            max_retries: 5,
            curl_args: Vec::new(),
            on_complete: None,
            resume_restart_counts: false,
            auth: HashMap::new(),
        }
    }
}

impl DqConfig {
    /// Check the values the run loop depends on. `list`/`add` skip this so
    /// they keep working while e.g. the destination is unmounted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroMaxRetries);
        }
        if !self.dest.is_dir() {
            return Err(ConfigError::MissingDest(self.dest.clone()));
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        for path in [
            &mut self.queue,
            &mut self.state,
            &mut self.failed_log,
            &mut self.completed_log,
            &mut self.dest,
        ] {
            *path = expand_user(path);
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let mut cfg = parse_or_default(&data, &path);
    cfg.expand_paths();
    Ok(cfg)
}

fn parse_or_default(data: &str, path: &Path) -> DqConfig {
    match toml::from_str(data) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed config, using defaults");
            DqConfig::default()
        }
    }
}

/// Replace a leading `~/` with the home directory, like the shell would.
fn expand_user(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn default_state_dir() -> PathBuf {
    xdg::BaseDirectories::with_prefix("dq")
        .map(|d| d.get_state_home())
        .unwrap_or_else(|_| home_dir().join(".dq"))
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
