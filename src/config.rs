use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MidConfig {
    pub gateway: GatewayConfig,
    pub backend: BackendConfig,
    pub diary: DiaryConfig,
}

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    7300
}
fn default_bind() -> String {
    "127.0.0.1".into()
}

/// Where memories live: "memory" keeps everything in-process (lost on
/// exit); "rest" talks to a diary backend at `base_url`.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    pub base_url: Option<String>,
    /// Bearer token. Falls back to the credentials file written by
    /// `mid login` when unset.
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            base_url: None,
            token: None,
        }
    }
}

fn default_mode() -> String {
    "memory".into()
}

#[derive(Debug, Deserialize)]
pub struct DiaryConfig {
    #[serde(default = "default_listing_limit")]
    pub listing_limit: usize,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            listing_limit: default_listing_limit(),
        }
    }
}

fn default_listing_limit() -> usize {
    50
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `MID_CONFIG` env var
/// 2. `~/.mid/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<MidConfig> {
    let path = config_path();

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let mut config: MidConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;

        resolve_token(&mut config);
        validate(&config)?;

        info!("loaded config from {}", path.display());
        Ok(config)
    } else {
        info!("no config file found, using zero-config defaults");
        let mut config = MidConfig::default();
        resolve_token(&mut config);
        Ok(config)
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("MID_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".mid").join("config.toml")
}

/// Fall back to the stored credentials when the config has no token.
fn resolve_token(config: &mut MidConfig) {
    if config.backend.token.is_none() {
        config.backend.token = crate::secrets::load_token();
    }
}

/// Validate the config and return clear error messages.
pub fn validate(config: &MidConfig) -> anyhow::Result<()> {
    let valid_modes = ["memory", "rest"];
    if !valid_modes.contains(&config.backend.mode.as_str()) {
        anyhow::bail!(
            "invalid backend mode '{}': must be one of {:?}",
            config.backend.mode,
            valid_modes
        );
    }

    if config.backend.mode == "rest" {
        let base = config
            .backend
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("backend.base_url is required when mode = \"rest\""))?;
        let parsed = url::Url::parse(base)
            .map_err(|e| anyhow::anyhow!("invalid backend.base_url '{base}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("backend.base_url must be http(s), got '{base}'");
        }
    }

    if config.diary.listing_limit == 0 {
        anyhow::bail!("diary.listing_limit must be > 0");
    }

    Ok(())
}
