use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::record::DEFAULT_COMPANION_NAME;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiennaConfig {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub bot: BotConfig,
    pub discord: Option<DiscordConfig>,
    pub gateway: GatewayConfig,
}

impl SiennaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: SiennaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("SIENNA_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SIENNA_ACTIVATION_CODE") {
            self.bot.activation_code = v;
        }
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                let api_base = self
                    .discord
                    .as_ref()
                    .map(|d| d.api_base.clone())
                    .unwrap_or_else(default_discord_api);
                self.discord = Some(DiscordConfig {
                    token: token.trim().to_string(),
                    api_base,
                });
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openrouter`, `openai` or `mock`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Upper bound for one backend call; the turn fails once it elapses.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub explicit_temperature: f32,
    pub explicit_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "x-ai/grok-4.1-fast".to_string(),
            base_url: None,
            timeout_secs: 45,
            temperature: 0.75,
            max_tokens: 350,
            explicit_temperature: 0.85,
            explicit_max_tokens: 600,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one `<user_id>.json` per user.
    pub data_dir: PathBuf,
    pub watch_interval_secs: u64,
    /// Logs longer than this are pruned by the retention loop...
    pub log_high_water: usize,
    /// ...down to this many most recent turns.
    pub log_keep: usize,
    pub retention_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("users_data"),
            watch_interval_secs: 2,
            log_high_water: 50,
            log_keep: 30,
            retention_interval_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub activation_code: String,
    pub default_companion_name: String,
    /// Pause between consecutive segments of one reply.
    pub segment_delay_ms: u64,
    pub inactivity_threshold_secs: u64,
    pub inactivity_interval_secs: u64,
    pub reminder_interval_secs: u64,
    pub reset_confirm_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            activation_code: "MYSECRET123".to_string(),
            default_companion_name: DEFAULT_COMPANION_NAME.to_string(),
            segment_delay_ms: 120,
            inactivity_threshold_secs: 120,
            inactivity_interval_secs: 60,
            reminder_interval_secs: 30,
            reset_confirm_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
}

fn default_discord_api() -> String {
    "https://discord.com/api/v10".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SiennaConfig::default();
        assert_eq!(cfg.llm.provider, "openrouter");
        assert_eq!(cfg.llm.max_tokens, 350);
        assert_eq!(cfg.llm.explicit_max_tokens, 600);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("users_data"));
        assert_eq!(cfg.bot.default_companion_name, "Sienna");
        assert!(cfg.discord.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
"#;
        let cfg: SiennaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.temperature, 0.75);
        assert_eq!(cfg.storage.watch_interval_secs, 2);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[llm]
provider = "openrouter"
model = "some/model"
base_url = "https://openrouter.ai/api/v1"
timeout_secs = 20
temperature = 0.6
max_tokens = 300
explicit_temperature = 0.9
explicit_max_tokens = 500

[storage]
data_dir = "/var/lib/sienna"
watch_interval_secs = 5
log_high_water = 80
log_keep = 40

[bot]
activation_code = "OPEN-SESAME"
default_companion_name = "Luna"
segment_delay_ms = 0

[discord]
token = "abc"

[gateway]
host = "0.0.0.0"
port = 9000
"#;
        let cfg: SiennaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.timeout(), Duration::from_secs(20));
        assert_eq!(cfg.storage.log_keep, 40);
        assert_eq!(cfg.bot.activation_code, "OPEN-SESAME");
        assert_eq!(cfg.bot.segment_delay_ms, 0);
        let discord = cfg.discord.unwrap();
        assert_eq!(discord.token, "abc");
        assert_eq!(discord.api_base, "https://discord.com/api/v10");
        assert_eq!(cfg.gateway.port, 9000);
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        std::env::set_var("LLM_PROVIDER", "mock");
        std::env::set_var("SIENNA_ACTIVATION_CODE", "from-env");

        let mut cfg = SiennaConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.bot.activation_code, "from-env");

        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("SIENNA_ACTIVATION_CODE");

        let cfg = SiennaConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.llm.provider, "openrouter");
    }
}
