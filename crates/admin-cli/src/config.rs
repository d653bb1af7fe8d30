use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use admin_client::ClientConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

/// `~/.admin-console`, holding `config.toml` and one directory per profile.
pub fn home_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".admin-console");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join("config.toml"))
}

pub fn load_all() -> Result<ConfigFile> {
    load_all_from(&config_path()?)
}

fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)?;
    let cfg: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Invalid profile file {}", path.display()))?;
    Ok(cfg)
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    Ok(load_all()?.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    save_profile_to(&config_path()?, profile, config)
}

fn save_profile_to(path: &Path, profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = load_all_from(path)?;
    all.insert(profile.to_string(), config.clone());
    let content = toml::to_string_pretty(&all)?;
    fs::write(path, content)?;
    Ok(())
}

/// Sets one profile key. Only `server` and `format` are known.
pub fn set_key(config: &mut ProfileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "server" => config.server = Some(value.to_string()),
        "format" => {
            value
                .parse::<OutputFormat>()
                .map_err(|e| anyhow::anyhow!("Invalid format: {e}"))?;
            config.format = Some(value.to_string());
        }
        other => anyhow::bail!("Unknown config key: {other}. Valid keys: server, format"),
    }
    Ok(())
}

/// Output format: `--format`, then the profile, then JSON.
pub fn resolve_format(cli: &Cli, profile: &ProfileConfig) -> OutputFormat {
    cli.format
        .or_else(|| profile.format.as_deref().and_then(|f| f.parse().ok()))
        .unwrap_or_default()
}

/// Client configuration for this invocation.
///
/// The config file and `ADMIN_CONSOLE__*` variables come first, then the
/// profile's server, then `--server`. The durable tier lives in the profile
/// directory.
pub fn client_config(cli: &Cli, profile: &ProfileConfig) -> Result<ClientConfig> {
    let mut config = admin_client::load_config(cli.config.as_deref())
        .context("Failed to load client configuration")?;

    if let Some(server) = cli.server.as_ref().or(profile.server.as_ref()) {
        config = config.with_base_url(server.clone());
    }
    let storage_dir = home_dir()?.join(&cli.profile);
    config = config.with_storage_dir(storage_dir);

    config.validate().context("Invalid client configuration")?;
    Ok(config)
}
