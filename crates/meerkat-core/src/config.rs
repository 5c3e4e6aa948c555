use anyhow::Result;
use config::Config;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub photos: PhotoConfig,
    pub import: ImportConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// HTTP Basic against the user table.
    Basic,
    /// A trusted reverse proxy forwards the resolved username in a header.
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub proxy: ProxyAuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAuthConfig {
    pub header: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL, or `memory://` for the in-process store.
    pub url: String,
    pub max_connections: u8,
}

impl DatabaseConfig {
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub session_ttl_secs: u64,
    pub max_csv_bytes: usize,
    pub max_csv_rows: usize,
    pub max_vcf_bytes: usize,
    pub max_vcf_cards: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 15 * 60,
            max_csv_bytes: 5 * 1024 * 1024,
            max_csv_rows: 1000,
            max_vcf_bytes: 10 * 1024 * 1024,
            max_vcf_cards: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub total_timeout_secs: u64,
    pub max_redirects: usize,
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: const_str::concat!("Meerkat/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 10,
            total_timeout_secs: 15,
            max_redirects: 3,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, environment variables and an optional
    /// `config.toml`. Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        let import = ImportConfig::default();
        let fetch = FetchConfig::default();

        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "info")?
            .set_default("auth.method", "basic")?
            .set_default("auth.proxy.header", "X-Remote-User")?
            .set_default("photos.dir", "./data/photos")?
            .set_default("import.session_ttl_secs", import.session_ttl_secs)?
            .set_default("import.max_csv_bytes", import.max_csv_bytes as u64)?
            .set_default("import.max_csv_rows", import.max_csv_rows as u64)?
            .set_default("import.max_vcf_bytes", import.max_vcf_bytes as u64)?
            .set_default("import.max_vcf_cards", import.max_vcf_cards as u64)?
            .set_default("fetch.user_agent", fetch.user_agent)?
            .set_default("fetch.connect_timeout_secs", fetch.connect_timeout_secs)?
            .set_default("fetch.total_timeout_secs", fetch.total_timeout_secs)?
            .set_default("fetch.max_redirects", fetch.max_redirects as u64)?
            .set_default("fetch.max_bytes", fetch.max_bytes as u64)?
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(
                config::Environment::with_prefix("MEERKAT")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
