mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const HF_API_KEY: &str = "HF_API_KEY";
pub const STORY_VOICE: &str = "STORY_VOICE";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    prepare(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./autoreel.toml",
        "./config.toml",
        "~/.config/autoreel/config.toml",
        "/etc/autoreel/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    let mut config = Config::default();
    prepare(&mut config);
    Ok(config)
}

fn prepare(config: &mut Config) {
    config.apply_env_from(|key| std::env::var(key).ok());
    expand_home(&mut config.paths.data_dir);
    expand_home(&mut config.paths.counter_file);
    expand_home(&mut config.paths.history_file);
    expand_home(&mut config.publish.profile_dir);
}

fn expand_home(path: &mut PathBuf) {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    *path = PathBuf::from(expanded);
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.script.video_duration_secs == 0 {
        anyhow::bail!("script.video_duration_secs cannot be 0");
    }
    if config.script.seconds_per_scene == 0 {
        anyhow::bail!("script.seconds_per_scene cannot be 0");
    }
    if config.images.max_concurrent == 0 || config.narration.max_concurrent == 0 {
        anyhow::bail!("max_concurrent must be at least 1");
    }
    if config.publish.driver_port == 0 {
        anyhow::bail!("publish.driver_port cannot be 0");
    }
    if config.publish.processing_poll_secs == 0 {
        anyhow::bail!("publish.processing_poll_secs cannot be 0");
    }
    if config.publish.strategy_poll_millis == 0 {
        anyhow::bail!("publish.strategy_poll_millis cannot be 0");
    }
    if !config.publish.studio_url.starts_with("http") {
        anyhow::bail!(
            "publish.studio_url must be an http(s) URL, got '{}'",
            config.publish.studio_url
        );
    }

    if !config.publish.profile_dir.exists() {
        tracing::warn!(
            "Browser profile does not exist yet: {:?}",
            config.publish.profile_dir
        );
    }

    Ok(())
}

impl Config {
    /// Fill secrets that are not set in the file from `lookup` (normally the
    /// process environment, after `.env` has been loaded).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.news.api_key.is_none() {
            self.news.api_key = non_empty(NEWS_API_KEY);
        }
        if self.script.api_key.is_none() {
            self.script.api_key = non_empty(GROQ_API_KEY);
        }
        if self.images.api_key.is_none() {
            self.images.api_key = non_empty(HF_API_KEY);
        }
        if let Some(voice) = non_empty(STORY_VOICE) {
            self.narration.voice = voice;
        }
    }

    /// Secrets needed by the HTTP collaborators. Checked before any stage runs.
    pub fn require_secrets(&self) -> autoreel_common::Result<()> {
        let missing: Vec<&str> = [
            (NEWS_API_KEY, &self.news.api_key),
            (GROQ_API_KEY, &self.script.api_key),
            (HF_API_KEY, &self.images.api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(autoreel_common::Error::config(format!(
                "missing credentials: {}",
                missing.join(", ")
            )))
        }
    }
}
