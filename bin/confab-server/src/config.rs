//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for confab-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx database URL (default: `"sqlite://confab.db?mode=rwc"`).
    pub database_url: String,

    /// Connection pool size.
    pub database_max_connections: u32,

    /// Base URL of the upstream completion service, without trailing slash.
    pub upstream_url: String,

    /// Upper bound for establishing the upstream connection. Reads of an
    /// open stream are never timed out here.
    pub upstream_connect_timeout_secs: u64,

    /// Model used when a turn does not name one.
    pub default_model: String,

    /// When `true`, completion requests carry the earlier turns of a
    /// continuing conversation.
    pub history_replay: bool,

    /// Bearer token guarding `/admin`. `None` leaves admin routes open.
    pub admin_token: Option<String>,

    /// Identity recorded for admin playground turns that arrive without an
    /// identity header.
    pub console_identity: String,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CONFAB_BIND", "0.0.0.0:3000"),
            database_url: env_or("CONFAB_DATABASE_URL", "sqlite://confab.db?mode=rwc"),
            database_max_connections: parse_env("CONFAB_DATABASE_MAX_CONNECTIONS", 8),
            upstream_url: env_or("CONFAB_UPSTREAM_URL", "http://127.0.0.1:8000")
                .trim_end_matches('/')
                .to_owned(),
            upstream_connect_timeout_secs: parse_env("CONFAB_UPSTREAM_CONNECT_TIMEOUT_SECS", 10),
            default_model: env_or("CONFAB_DEFAULT_MODEL", "default"),
            history_replay: flag_env("CONFAB_HISTORY_REPLAY", false),
            admin_token: std::env::var("CONFAB_ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            console_identity: env_or("CONFAB_CONSOLE_IDENTITY", "console"),
            cors_allowed_origins: std::env::var("CONFAB_CORS_ORIGINS").ok(),
            enable_swagger: flag_env("CONFAB_ENABLE_SWAGGER", true),
            log_level: env_or("CONFAB_LOG", "info"),
            log_json: flag_env("CONFAB_LOG_JSON", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            database_url: "sqlite://confab.db?mode=rwc".to_owned(),
            database_max_connections: 8,
            upstream_url: "http://127.0.0.1:8000".to_owned(),
            upstream_connect_timeout_secs: 10,
            default_model: "default".to_owned(),
            history_replay: false,
            admin_token: None,
            console_identity: "console".to_owned(),
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn flag_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
