// Registry server configuration.
//
// Centralizes environment variable parsing with defaults for local
// development. Every setting is read through one injectable lookup so the
// whole table can be exercised in tests.

use std::net::SocketAddr;

use url::Url;

use crate::{
    db::pool::PoolConfig,
    rpc::{EventHashMode, DEFAULT_EVENT_HASH_PLACEHOLDER},
};

pub const DEFAULT_PATH_PREFIX: &str = "/track-and-trace/v1";

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_PASSWORD: &str = "password";
const DEFAULT_DB_NAME: &str = "ebsi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Core registry server configuration.
///
/// Constructed via [`RegistryConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// Prefix every registry route is mounted under. Empty mounts at `/`.
    pub path_prefix: String,
    /// PostgreSQL connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Create the registry tables at startup when missing.
    pub db_bootstrap_schema: bool,
    /// Pool sizing and TLS policy.
    pub pool: PoolConfig,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `tnt_registry=debug`).
    pub log_filter: String,
    pub log_format: LogFormat,
    pub event_hash: EventHashMode,
}

impl RegistryConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `TNT_REGISTRY_HOST` | `0.0.0.0` |
    /// | `TNT_REGISTRY_PORT` | `8080` |
    /// | `TNT_REGISTRY_PATH_PREFIX` | `/track-and-trace/v1` |
    /// | `TNT_REGISTRY_DATABASE_URL` | *(none)* |
    /// | `TNT_REGISTRY_DB_HOST` | *(none; enables URL composition)* |
    /// | `TNT_REGISTRY_DB_PORT` / `_DB_USER` / `_DB_PASSWORD` / `_DB_NAME` | `5432` / `postgres` / `password` / `ebsi` |
    /// | `TNT_REGISTRY_DB_REQUIRE_TLS` | `false` |
    /// | `TNT_REGISTRY_DB_BOOTSTRAP_SCHEMA` | `true` |
    /// | `TNT_REGISTRY_CORS_ORIGINS` | *(none; cors.rs uses dev defaults)* |
    /// | `TNT_REGISTRY_LOG_FILTER` | `info` |
    /// | `TNT_REGISTRY_LOG_FORMAT` | `text` |
    /// | `TNT_REGISTRY_EVENT_HASH` | `placeholder` |
    /// | `TNT_REGISTRY_EVENT_HASH_PLACEHOLDER` | `0` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    pub(crate) fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("TNT_REGISTRY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env("TNT_REGISTRY_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let path_prefix = normalize_path_prefix(
            &env("TNT_REGISTRY_PATH_PREFIX").unwrap_or_else(|_| DEFAULT_PATH_PREFIX.into()),
        );

        let database_url = env("TNT_REGISTRY_DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| compose_database_url(&env));

        let db_bootstrap_schema = parse_bool(env("TNT_REGISTRY_DB_BOOTSTRAP_SCHEMA").ok(), true);
        let mut pool = PoolConfig::from_env_fn(&env);
        pool.require_tls = parse_bool(env("TNT_REGISTRY_DB_REQUIRE_TLS").ok(), false);

        let cors_origins = env("TNT_REGISTRY_CORS_ORIGINS").ok();
        let log_filter = env("TNT_REGISTRY_LOG_FILTER").unwrap_or_else(|_| "info".into());
        let log_format =
            env("TNT_REGISTRY_LOG_FORMAT").map(|v| LogFormat::parse(&v)).unwrap_or_default();

        let event_hash = match env("TNT_REGISTRY_EVENT_HASH") {
            Ok(mode) if mode.trim().eq_ignore_ascii_case("sha256") => EventHashMode::Sha256,
            _ => EventHashMode::Placeholder(
                env("TNT_REGISTRY_EVENT_HASH_PLACEHOLDER")
                    .unwrap_or_else(|_| DEFAULT_EVENT_HASH_PLACEHOLDER.into()),
            ),
        };

        Self {
            listen_addr,
            path_prefix,
            database_url,
            db_bootstrap_schema,
            pool,
            cors_origins,
            log_filter,
            log_format,
            event_hash,
        }
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}

/// `/track-and-trace/v1/` and `track-and-trace/v1` both become
/// `/track-and-trace/v1`; `/` becomes the empty prefix.
fn normalize_path_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn compose_database_url<F>(env: &F) -> Option<String>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let host = env("TNT_REGISTRY_DB_HOST").ok().filter(|host| !host.trim().is_empty())?;
    let port = env("TNT_REGISTRY_DB_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_DB_PORT);
    let user = env("TNT_REGISTRY_DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.into());
    let password = env("TNT_REGISTRY_DB_PASSWORD").unwrap_or_else(|_| DEFAULT_DB_PASSWORD.into());
    let name = env("TNT_REGISTRY_DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.into());

    let mut url = Url::parse(&format!("postgres://{host}")).ok()?;
    url.set_port(Some(port)).ok()?;
    url.set_username(&user).ok()?;
    url.set_password(Some(&password)).ok()?;
    url.set_path(&name);

    Some(url.to_string())
}
