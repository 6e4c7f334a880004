//! Application settings storage
//!
//! Stores the backend location in a JSON file in the config directory.
//! Environment variables always win over the stored values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const API_URL_ENV: &str = "AMAZONIA_API_URL";
pub const API_TIMEOUT_ENV: &str = "AMAZONIA_API_TIMEOUT_MS";

/// Global settings instance
static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Path to config file (set during init)
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub api_url: Option<String>,
    /// Request timeout in milliseconds (None = default)
    #[serde(default)]
    pub api_timeout_ms: Option<u64>,
}

impl Settings {
    /// Load settings from disk or create default
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("[Settings] Ignoring unreadable {}: {}", path.display(), e);
                    Settings::default()
                }),
                Err(_) => Settings::default(),
            }
        } else {
            Settings::default()
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}

/// Where and how long to talk to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { base_url: base_url.into(), timeout }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Base URL must be absolute http(s)
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid API URL '{}': {}", self.base_url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("API URL must be http or https, got '{}'", parsed.scheme()));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

/// Initialize settings with the given config directory
pub fn init(config_dir: PathBuf) {
    let config_path = config_dir.join("settings.json");
    let settings = Settings::load(&config_path);

    if let Ok(mut guard) = CONFIG_PATH.write() {
        *guard = Some(config_path);
    }
    if let Ok(mut guard) = SETTINGS.write() {
        *guard = Some(settings);
    }
}

/// Default config directory (`<config_dir>/amazonia`)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("amazonia"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn stored() -> Settings {
    SETTINGS.read().ok()
        .and_then(|guard| guard.clone())
        .unwrap_or_default()
}

fn resolve_api_url(env: Option<String>, stored: Option<String>) -> String {
    env.filter(|v| !v.trim().is_empty())
        .or(stored.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Unparseable or zero values fall through to the next source
fn resolve_timeout_ms(env: Option<String>, stored: Option<u64>) -> u64 {
    env.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .or(stored.filter(|ms| *ms > 0))
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

/// Get the backend base URL (checks env var first, then stored setting)
pub fn get_api_url() -> String {
    resolve_api_url(std::env::var(API_URL_ENV).ok(), stored().api_url)
}

pub fn get_api_timeout_ms() -> u64 {
    resolve_timeout_ms(std::env::var(API_TIMEOUT_ENV).ok(), stored().api_timeout_ms)
}

pub fn api_config() -> ApiConfig {
    ApiConfig::new(get_api_url(), Duration::from_millis(get_api_timeout_ms()))
}

/// Set and save the backend base URL
pub fn set_api_url(url: String) -> Result<(), String> {
    update(|settings| {
        settings.api_url = if url.is_empty() { None } else { Some(url) };
    })
}

/// Set and save the request timeout
pub fn set_api_timeout_ms(ms: u64) -> Result<(), String> {
    update(|settings| {
        settings.api_timeout_ms = if ms == 0 { None } else { Some(ms) };
    })
}

fn update(apply: impl FnOnce(&mut Settings)) -> Result<(), String> {
    let mut settings_guard = SETTINGS.write()
        .map_err(|_| "Failed to acquire settings lock")?;

    let settings = settings_guard.get_or_insert_with(Settings::default);
    apply(settings);

    let config_path = CONFIG_PATH.read()
        .map_err(|_| "Failed to acquire config path lock")?
        .clone()
        .ok_or("Settings not initialized")?;

    settings.save(&config_path)?;

    log::info!("[Settings] Saved to {}", config_path.display());
    Ok(())
}
