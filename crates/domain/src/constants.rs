//! Protocol and runtime constants
//!
//! Centralized location for the endpoint paths, parameter names, and default
//! timings used by every transport.

// Endpoint paths (appended to the parsed endpoint URL)
pub const QUERY_PATH: &str = "/query";
pub const WRITE_PATH: &str = "/write";

// Query parameters
pub const DATABASE_PARAM: &str = "db";
pub const QUERY_PARAM: &str = "q";
pub const DATABASE_MARKER: &str = "?db=";

// Write requests keep the content type the server historically accepted.
pub const WRITE_CONTENT_TYPE: &str = "application/json";

// HTTP client defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_VERIFY_TLS: bool = false;

// Reconciler defaults
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 30;
