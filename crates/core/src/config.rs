use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub advisor: AdvisorConfig,
    pub records: RecordsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// How the external scenario engine is launched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordsConfig {
    /// Create the default record on first read when none is persisted.
    pub synthesize_on_read: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(alias = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub engine_program: Option<String>,
    pub engine_args: Option<Vec<String>>,
    pub engine_timeout_secs: Option<u64>,
    pub advisor_enabled: Option<bool>,
    pub advisor_provider: Option<LlmProvider>,
    pub advisor_model: Option<String>,
    pub synthesize_on_read: Option<bool>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://ecosim.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            engine: EngineConfig {
                program: "python3".to_string(),
                args: vec!["ai_model/predict.py".to_string()],
                timeout_secs: 30,
                max_concurrency: 8,
            },
            advisor: AdvisorConfig {
                enabled: false,
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                model: "gpt-3.5-turbo".to_string(),
                timeout_secs: 20,
                failure_threshold: 3,
                cooldown_secs: 60,
            },
            records: RecordsConfig { synthesize_on_read: true },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5001,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported advisor provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("ecosim.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(program) = engine.program {
                self.engine.program = program;
            }
            if let Some(args) = engine.args {
                self.engine.args = args;
            }
            if let Some(timeout_secs) = engine.timeout_secs {
                self.engine.timeout_secs = timeout_secs;
            }
            if let Some(max_concurrency) = engine.max_concurrency {
                self.engine.max_concurrency = max_concurrency;
            }
        }

        if let Some(advisor) = patch.advisor {
            if let Some(enabled) = advisor.enabled {
                self.advisor.enabled = enabled;
            }
            if let Some(provider) = advisor.provider {
                self.advisor.provider = provider;
            }
            if let Some(api_key_value) = advisor.api_key {
                self.advisor.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = advisor.base_url {
                self.advisor.base_url = Some(base_url);
            }
            if let Some(model) = advisor.model {
                self.advisor.model = model;
            }
            if let Some(timeout_secs) = advisor.timeout_secs {
                self.advisor.timeout_secs = timeout_secs;
            }
            if let Some(failure_threshold) = advisor.failure_threshold {
                self.advisor.failure_threshold = failure_threshold;
            }
            if let Some(cooldown_secs) = advisor.cooldown_secs {
                self.advisor.cooldown_secs = cooldown_secs;
            }
        }

        if let Some(records) = patch.records {
            if let Some(synthesize_on_read) = records.synthesize_on_read {
                self.records.synthesize_on_read = synthesize_on_read;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ECOSIM_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ECOSIM_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ECOSIM_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ECOSIM_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ECOSIM_ENGINE_PROGRAM") {
            self.engine.program = value;
        }
        if let Some(value) = read_env("ECOSIM_ENGINE_ARGS") {
            self.engine.args = value.split_whitespace().map(str::to_string).collect();
        }
        if let Some(value) = read_env("ECOSIM_ENGINE_TIMEOUT_SECS") {
            self.engine.timeout_secs = parse_u64("ECOSIM_ENGINE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_ENGINE_MAX_CONCURRENCY") {
            self.engine.max_concurrency = parse_u32("ECOSIM_ENGINE_MAX_CONCURRENCY", &value)? as usize;
        }

        if let Some(value) = read_env("ECOSIM_ADVISOR_ENABLED") {
            self.advisor.enabled = parse_bool("ECOSIM_ADVISOR_ENABLED", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_PROVIDER") {
            self.advisor.provider = value.parse()?;
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_API_KEY") {
            self.advisor.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_BASE_URL") {
            self.advisor.base_url = Some(value);
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_MODEL") {
            self.advisor.model = value;
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_TIMEOUT_SECS") {
            self.advisor.timeout_secs = parse_u64("ECOSIM_ADVISOR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_FAILURE_THRESHOLD") {
            self.advisor.failure_threshold =
                parse_u32("ECOSIM_ADVISOR_FAILURE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_ADVISOR_COOLDOWN_SECS") {
            self.advisor.cooldown_secs = parse_u64("ECOSIM_ADVISOR_COOLDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ECOSIM_RECORDS_SYNTHESIZE_ON_READ") {
            self.records.synthesize_on_read =
                parse_bool("ECOSIM_RECORDS_SYNTHESIZE_ON_READ", &value)?;
        }

        if let Some(value) = read_env("ECOSIM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ECOSIM_SERVER_PORT") {
            self.server.port = parse_u16("ECOSIM_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ECOSIM_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ECOSIM_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("ECOSIM_LOGGING_LEVEL").or_else(|| read_env("ECOSIM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ECOSIM_LOGGING_FORMAT").or_else(|| read_env("ECOSIM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(program) = overrides.engine_program {
            self.engine.program = program;
        }
        if let Some(args) = overrides.engine_args {
            self.engine.args = args;
        }
        if let Some(timeout_secs) = overrides.engine_timeout_secs {
            self.engine.timeout_secs = timeout_secs;
        }
        if let Some(enabled) = overrides.advisor_enabled {
            self.advisor.enabled = enabled;
        }
        if let Some(provider) = overrides.advisor_provider {
            self.advisor.provider = provider;
        }
        if let Some(model) = overrides.advisor_model {
            self.advisor.model = model;
        }
        if let Some(synthesize_on_read) = overrides.synthesize_on_read {
            self.records.synthesize_on_read = synthesize_on_read;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_engine(&self.engine)?;
        validate_advisor(&self.advisor)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("ecosim.toml"), PathBuf::from("config/ecosim.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "engine.program is required (e.g. `python3` with args [\"ai_model/predict.py\"])"
                .to_string(),
        ));
    }

    if engine.timeout_secs == 0 || engine.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "engine.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if engine.max_concurrency == 0 {
        return Err(ConfigError::Validation(
            "engine.max_concurrency must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_advisor(advisor: &AdvisorConfig) -> Result<(), ConfigError> {
    if advisor.timeout_secs == 0 || advisor.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "advisor.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if advisor.failure_threshold == 0 {
        return Err(ConfigError::Validation(
            "advisor.failure_threshold must be greater than zero".to_string(),
        ));
    }

    if !advisor.enabled {
        return Ok(());
    }

    match advisor.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = advisor
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "advisor.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                advisor.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "advisor.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &advisor.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "advisor.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
        ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    engine: Option<EnginePatch>,
    advisor: Option<AdvisorPatch>,
    records: Option<RecordsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    program: Option<String>,
    args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    max_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AdvisorPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    failure_threshold: Option<u32>,
    cooldown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsPatch {
    synthesize_on_read: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
