//! Application configuration: `--addr` from the command line, everything
//! else from environment variables.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Arg, Command};

use sitehub_core::domain::cdn::DEFAULT_ORIGIN;
use sitehub_infra::{OriginClientConfig, RateLimitConfig};

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid listen address {0:?}: expected :PORT, HOST:PORT or PORT")]
    InvalidAddr(String),

    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Listen address accepting `:PORT`, `HOST:PORT` or a bare `PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for ListenAddr {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAddr(raw.to_string());

        let (host, port) = match raw.rsplit_once(':') {
            Some((host, port)) => (host.trim_start_matches('[').trim_end_matches(']'), port),
            None => ("", raw),
        };
        let port = port.parse().map_err(|_| invalid())?;
        let host = if host.is_empty() { "0.0.0.0" } else { host };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// CDN proxy settings.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub cache_dir: PathBuf,
    pub default_origin: String,
    pub prewarm: bool,
    pub max_redirects: usize,
    pub origin: OriginClientConfig,
}

/// HTTP server limits.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Requests declaring a larger `Content-Length` are refused with 413.
    pub max_body_bytes: u64,
    /// Time allowed to receive the request head.
    pub client_request_timeout: Duration,
    pub keep_alive: Duration,
    pub client_disconnect_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            client_request_timeout: Duration::from_secs(60),
            keep_alive: Duration::from_secs(120),
            client_disconnect_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: ListenAddr,
    pub sites_root: PathBuf,
    pub cdn: CdnConfig,
    pub rate_limit: RateLimitConfig,
    pub limits: ServerLimits,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env_parse(key).map(Duration::from_secs).unwrap_or(default)
}

impl AppConfig {
    fn build_cli() -> Command {
        Command::new("sitehub-server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Multi-site host with a caching CDN proxy")
            .arg(
                Arg::new("addr")
                    .long("addr")
                    .value_name("ADDR")
                    .default_value(":8080")
                    .help("Listen address (e.g. :8080, 127.0.0.1:8080 or 8080)"),
            )
    }

    /// Load from the process arguments and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(env::args_os())
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::build_cli().try_get_matches_from(args)?;
        let addr: ListenAddr = matches
            .get_one::<String>("addr")
            .map(String::as_str)
            .unwrap_or(":8080")
            .parse()?;

        let sites_root: PathBuf = env::var("SITES_ROOT")
            .unwrap_or_else(|_| "sites".to_string())
            .into();

        let cdn = CdnConfig {
            cache_dir: env::var("CDN_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| sites_root.join("_static").join("cdn")),
            default_origin: env::var("CDN_DEFAULT_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            prewarm: env::var("CDN_PREWARM")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            max_redirects: env_parse("CDN_MAX_REDIRECTS").unwrap_or(5),
            origin: OriginClientConfig::from_env(),
        };

        let defaults = ServerLimits::default();
        let limits = ServerLimits {
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            client_request_timeout: env_secs(
                "CLIENT_REQUEST_TIMEOUT_SECS",
                defaults.client_request_timeout,
            ),
            keep_alive: env_secs("KEEP_ALIVE_SECS", defaults.keep_alive),
            client_disconnect_timeout: env_secs(
                "CLIENT_DISCONNECT_TIMEOUT_SECS",
                defaults.client_disconnect_timeout,
            ),
            shutdown_timeout: env_secs("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout),
        };

        Ok(Self {
            addr,
            sites_root,
            cdn,
            rate_limit: RateLimitConfig::from_env(),
            limits,
        })
    }
}
