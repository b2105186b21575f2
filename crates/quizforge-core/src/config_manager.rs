use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for QuizForge
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuizForgeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    /// LLM used for question generation
    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed by CORS in addition to http://127.0.0.1:3000
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_cors_max_age")]
    pub cors_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: default_frontend_url(),
            cors_max_age_secs: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret, at least 32 characters
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<SecretString>,

    #[serde(default = "default_token_expiry")]
    pub token_expiry_minutes: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry_minutes: default_token_expiry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory" or "file"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Directory holding one JSON snapshot per collection
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider: "openai", "openai-compatible", "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Base URL for OpenAI and OpenAI-compatible endpoints
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    #[serde(default, skip_serializing)]
    pub anthropic_api_key: Option<SecretString>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key: None,
            anthropic_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_cors_max_age() -> u64 {
    600
}
fn default_token_expiry() -> i64 {
    60
}
fn default_storage_backend() -> String {
    "file".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    3000
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: QuizForgeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (quizforge.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading QuizForge configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!("   Storage backend: {}", config.storage.backend);
        info!("   LLM provider: {} ({})", config.llm.provider, config.llm.model);

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load a specific TOML file, then apply environment overrides
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: QuizForgeConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".quizforge.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .quizforge.env: {}", e);
                } else {
                    info!("Loaded .quizforge.env from home directory");
                }
            }
        }
    }

    /// Search order:
    /// 1. ./quizforge.toml
    /// 2. ~/.quizforge/config.toml
    /// 3. defaults
    fn load_config_file() -> Result<(QuizForgeConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new("quizforge.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".quizforge").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((QuizForgeConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<QuizForgeConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: QuizForgeConfig) -> QuizForgeConfig {
        // Server
        if let Ok(host) = std::env::var("QUIZFORGE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("QUIZFORGE_PORT").or_else(|_| std::env::var("PORT")) {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("FRONTEND_URL") {
            config.server.frontend_url = url;
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = Some(secret.into());
        }
        if let Ok(minutes) = std::env::var("JWT_EXPIRY_MINUTES") {
            if let Ok(m) = minutes.parse() {
                config.auth.token_expiry_minutes = m;
            }
        }

        // Storage
        if let Ok(backend) = std::env::var("QUIZFORGE_STORAGE") {
            config.storage.backend = backend;
        }
        if let Ok(dir) = std::env::var("QUIZFORGE_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        // LLM
        if let Ok(provider) = std::env::var("QUIZFORGE_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("QUIZFORGE_MODEL") {
            config.llm.model = model;
        }
        if let Ok(url) = std::env::var("QUIZFORGE_LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.api_key = Some(key.into());
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key.into());
        }

        // Logging; RUST_LOG directives like "quizforge_api=debug" stay with the env filter
        if let Ok(level) = std::env::var("RUST_LOG") {
            if LOG_LEVELS.contains(&level.as_str()) {
                config.logging.level = level;
            }
        }

        config
    }

    fn validate_config(config: &QuizForgeConfig) -> Result<(), ConfigError> {
        match config.storage.backend.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid storage backend: {}. Must be one of: memory, file",
                    other
                )))
            }
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                config.logging.level
            )));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                config.llm.temperature
            )));
        }

        if config.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must not be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn config(&self) -> &QuizForgeConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

}
