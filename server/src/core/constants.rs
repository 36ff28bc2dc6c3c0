// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "FactLens";

/// Crate target used in the default log filter
pub const LOG_TARGET: &str = "factlens_server";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".factlens";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "factlens.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "FACTLENS_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "FACTLENS_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "FACTLENS_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "FACTLENS_LOG";

// =============================================================================
// Environment Variables - ClickHouse
// =============================================================================

pub const ENV_CLICKHOUSE_URL: &str = "FACTLENS_CLICKHOUSE_URL";
pub const ENV_CLICKHOUSE_DATABASE: &str = "FACTLENS_CLICKHOUSE_DATABASE";
pub const ENV_CLICKHOUSE_USER: &str = "FACTLENS_CLICKHOUSE_USER";
pub const ENV_CLICKHOUSE_PASSWORD: &str = "FACTLENS_CLICKHOUSE_PASSWORD";

/// Environment variable for the per-query deadline
pub const ENV_QUERY_TIMEOUT_SECS: &str = "FACTLENS_QUERY_TIMEOUT_SECS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum accepted request body size
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Seconds to wait for in-flight requests after a shutdown signal
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ClickHouse Defaults
// =============================================================================

pub const CLICKHOUSE_DEFAULT_URL: &str = "http://localhost:8123";
pub const CLICKHOUSE_DEFAULT_DATABASE: &str = "default";
pub const CLICKHOUSE_DEFAULT_USER: &str = "default";

/// Client-side deadline per query
pub const CLICKHOUSE_DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Server-side `max_execution_time` sent with every query
pub const CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS: u64 = 60;

/// Interval between background store pings
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Query Limits
// =============================================================================

/// Row limit used when the client sends none or an out-of-range value
pub const DEFAULT_QUERY_LIMIT: u64 = 100;

/// Largest row limit a client may request
pub const MAX_QUERY_LIMIT: u64 = 10_000;
