//! Configuration for the capture agent.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SOOTHSAYER_HOME, SOOTHSAYER_BASE_URL)
//! 2. Config file (.soothsayer/config.yaml)
//! 3. Defaults (~/.soothsayer, http://localhost:5001)
//!
//! CLI flags are applied on top of the resolved config by the commands
//! that accept them.
//!
//! Config file discovery:
//! - Searches current directory and parents for .soothsayer/config.yaml
//! - Relative paths in the config file resolve against the .soothsayer/ directory

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DeviceCommands;
use crate::core::{RateLimits, SchedulerSettings, SessionSettings};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub scheduler: Option<SchedulerSettings>,
    #[serde(default)]
    pub session: Option<SessionSettings>,
    #[serde(default)]
    pub rate_limit: Option<RateLimits>,
    #[serde(default)]
    pub devices: Option<DeviceCommands>,
    #[serde(default)]
    pub permissions: Option<PermissionsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .soothsayer/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

/// Host permission answers for desktop runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "granted")]
    pub microphone: bool,
    #[serde(default = "granted")]
    pub camera: bool,
}

fn granted() -> bool {
    true
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            microphone: true,
            camera: true,
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the state directory
    pub home: PathBuf,
    pub base_url: String,
    pub request_timeout: Duration,
    pub scheduler: SchedulerSettings,
    pub session: SessionSettings,
    pub rate_limit: RateLimits,
    pub devices: DeviceCommands,
    pub permissions: PermissionsConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Capture commands used when the config file names none
pub fn default_device_commands() -> DeviceCommands {
    let argv = |args: &[&str]| args.iter().map(|a| a.to_string()).collect::<Vec<_>>();

    if cfg!(target_os = "macos") {
        DeviceCommands {
            microphone: argv(&["ffmpeg", "-loglevel", "error", "-f", "avfoundation", "-i", ":0", "-y", "{output}"]),
            front_camera: argv(&["ffmpeg", "-loglevel", "error", "-f", "avfoundation", "-framerate", "30", "-i", "0", "-frames:v", "1", "-y", "{output}"]),
            back_camera: argv(&["ffmpeg", "-loglevel", "error", "-f", "avfoundation", "-framerate", "30", "-i", "1", "-frames:v", "1", "-y", "{output}"]),
        }
    } else {
        DeviceCommands {
            microphone: argv(&["ffmpeg", "-loglevel", "error", "-f", "pulse", "-i", "default", "-y", "{output}"]),
            front_camera: argv(&["ffmpeg", "-loglevel", "error", "-f", "v4l2", "-i", "/dev/video0", "-frames:v", "1", "-y", "{output}"]),
            back_camera: argv(&["ffmpeg", "-loglevel", "error", "-f", "v4l2", "-i", "/dev/video2", "-frames:v", "1", "-y", "{output}"]),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".soothsayer").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file (if any) with environment and defaults
fn resolve(config_file: Option<PathBuf>, parsed: Option<ConfigFile>) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".soothsayer");

    let parsed_home = match (&config_file, parsed.as_ref().and_then(|c| c.paths.home.as_ref())) {
        (Some(path), Some(home)) => {
            let config_dir = path.parent().unwrap_or(Path::new("."));
            Some(resolve_path(config_dir, home))
        }
        _ => None,
    };

    let home = std::env::var("SOOTHSAYER_HOME")
        .map(PathBuf::from)
        .ok()
        .or(parsed_home)
        .unwrap_or(default_home);

    let backend = parsed.as_ref().and_then(|c| c.backend.clone());
    let base_url = std::env::var("SOOTHSAYER_BASE_URL")
        .ok()
        .or_else(|| backend.as_ref().and_then(|b| b.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let request_timeout_ms = backend
        .and_then(|b| b.request_timeout_ms)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

    let parsed = parsed.as_ref();
    Ok(ResolvedConfig {
        home,
        base_url,
        request_timeout: Duration::from_millis(request_timeout_ms),
        scheduler: parsed.and_then(|c| c.scheduler).unwrap_or_default(),
        session: parsed.and_then(|c| c.session).unwrap_or_default(),
        rate_limit: parsed.and_then(|c| c.rate_limit).unwrap_or_default(),
        devices: parsed
            .and_then(|c| c.devices.clone())
            .unwrap_or_else(default_device_commands),
        permissions: parsed.and_then(|c| c.permissions).unwrap_or_default(),
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    match find_config_file() {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            resolve(Some(path), Some(parsed))
        }
        None => resolve(None, None),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the state directory.
pub fn soothsayer_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}
