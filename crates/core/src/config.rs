use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling for a single batch request.
pub const MAX_BATCH_ITEMS: usize = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub source: TableSourceKind,
    pub tables_path: Option<PathBuf>,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub lookup_timeout_ms: u64,
    pub refresh_retries: u32,
    pub retry_backoff_ms: u64,
    pub delivery_fallback_unit_price: Decimal,
    pub batch_concurrency: usize,
    pub batch_max_items: usize,
}

impl PricingConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSourceKind {
    Builtin,
    File,
    Database,
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
    pub pricing_source: Option<TableSourceKind>,
    pub tables_path: Option<PathBuf>,
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
                url: "sqlite://capquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            pricing: PricingConfig {
                source: TableSourceKind::Builtin,
                tables_path: None,
                cache_capacity: 4_096,
                cache_ttl_secs: 900,
                lookup_timeout_ms: 2_000,
                refresh_retries: 3,
                retry_backoff_ms: 200,
                delivery_fallback_unit_price: Decimal::new(300, 2),
                batch_concurrency: 8,
                batch_max_items: MAX_BATCH_ITEMS,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for TableSourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "file" => Ok(Self::File),
            "database" | "db" => Ok(Self::Database),
            other => Err(ConfigError::Validation(format!(
                "unsupported pricing source `{other}` (expected builtin|file|database)"
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
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("capquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
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

        if let Some(pricing) = patch.pricing {
            if let Some(source) = pricing.source {
                self.pricing.source = source;
            }
            if let Some(tables_path) = pricing.tables_path {
                self.pricing.tables_path = Some(tables_path);
            }
            if let Some(cache_capacity) = pricing.cache_capacity {
                self.pricing.cache_capacity = cache_capacity;
            }
            if let Some(cache_ttl_secs) = pricing.cache_ttl_secs {
                self.pricing.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(lookup_timeout_ms) = pricing.lookup_timeout_ms {
                self.pricing.lookup_timeout_ms = lookup_timeout_ms;
            }
            if let Some(refresh_retries) = pricing.refresh_retries {
                self.pricing.refresh_retries = refresh_retries;
            }
            if let Some(retry_backoff_ms) = pricing.retry_backoff_ms {
                self.pricing.retry_backoff_ms = retry_backoff_ms;
            }
            if let Some(price) = pricing.delivery_fallback_unit_price {
                self.pricing.delivery_fallback_unit_price =
                    parse_decimal("pricing.delivery_fallback_unit_price", &price)?;
            }
            if let Some(batch_concurrency) = pricing.batch_concurrency {
                self.pricing.batch_concurrency = batch_concurrency;
            }
            if let Some(batch_max_items) = pricing.batch_max_items {
                self.pricing.batch_max_items = batch_max_items;
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

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CAPQUOTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CAPQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CAPQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CAPQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CAPQUOTE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CAPQUOTE_SERVER_PORT") {
            self.server.port = parse_u16("CAPQUOTE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CAPQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("CAPQUOTE_PRICING_SOURCE") {
            self.pricing.source = value.parse()?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_TABLES_PATH") {
            self.pricing.tables_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_CACHE_CAPACITY") {
            self.pricing.cache_capacity = parse_usize("CAPQUOTE_PRICING_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_CACHE_TTL_SECS") {
            self.pricing.cache_ttl_secs = parse_u64("CAPQUOTE_PRICING_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_LOOKUP_TIMEOUT_MS") {
            self.pricing.lookup_timeout_ms =
                parse_u64("CAPQUOTE_PRICING_LOOKUP_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_REFRESH_RETRIES") {
            self.pricing.refresh_retries = parse_u32("CAPQUOTE_PRICING_REFRESH_RETRIES", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_RETRY_BACKOFF_MS") {
            self.pricing.retry_backoff_ms =
                parse_u64("CAPQUOTE_PRICING_RETRY_BACKOFF_MS", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_DELIVERY_FALLBACK_UNIT_PRICE") {
            self.pricing.delivery_fallback_unit_price =
                parse_decimal("CAPQUOTE_PRICING_DELIVERY_FALLBACK_UNIT_PRICE", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_BATCH_CONCURRENCY") {
            self.pricing.batch_concurrency =
                parse_usize("CAPQUOTE_PRICING_BATCH_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("CAPQUOTE_PRICING_BATCH_MAX_ITEMS") {
            self.pricing.batch_max_items =
                parse_usize("CAPQUOTE_PRICING_BATCH_MAX_ITEMS", &value)?;
        }

        let log_level =
            read_env("CAPQUOTE_LOGGING_LEVEL").or_else(|| read_env("CAPQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CAPQUOTE_LOGGING_FORMAT").or_else(|| read_env("CAPQUOTE_LOG_FORMAT"));
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
        if let Some(source) = overrides.pricing_source {
            self.pricing.source = source;
        }
        if let Some(tables_path) = overrides.tables_path {
            self.pricing.tables_path = Some(tables_path);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_pricing(&self.pricing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("capquote.toml"), PathBuf::from("config/capquote.toml")]
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

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.graceful_shutdown_secs > 300 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be in range 0..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.source == TableSourceKind::File && pricing.tables_path.is_none() {
        return Err(ConfigError::Validation(
            "pricing.tables_path is required when pricing.source = \"file\"".to_string(),
        ));
    }
    if pricing.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "pricing.cache_capacity must be greater than zero".to_string(),
        ));
    }
    if pricing.lookup_timeout_ms == 0 || pricing.lookup_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "pricing.lookup_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }
    if pricing.refresh_retries == 0 {
        return Err(ConfigError::Validation(
            "pricing.refresh_retries must be at least 1".to_string(),
        ));
    }
    if pricing.delivery_fallback_unit_price.is_sign_negative() {
        return Err(ConfigError::Validation(
            "pricing.delivery_fallback_unit_price must not be negative".to_string(),
        ));
    }
    if pricing.batch_concurrency == 0 {
        return Err(ConfigError::Validation(
            "pricing.batch_concurrency must be greater than zero".to_string(),
        ));
    }
    if pricing.batch_max_items == 0 || pricing.batch_max_items > MAX_BATCH_ITEMS {
        return Err(ConfigError::Validation(format!(
            "pricing.batch_max_items must be in range 1..={MAX_BATCH_ITEMS}"
        )));
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

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    source: Option<TableSourceKind>,
    tables_path: Option<PathBuf>,
    cache_capacity: Option<usize>,
    cache_ttl_secs: Option<u64>,
    lookup_timeout_ms: Option<u64>,
    refresh_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    delivery_fallback_unit_price: Option<String>,
    batch_concurrency: Option<usize>,
    batch_max_items: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
