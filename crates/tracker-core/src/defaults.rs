//! Shared default values for the tracker.
//!
//! Server config and the realtime client read these instead of repeating
//! literals.

// =============================================================================
// REALTIME
// =============================================================================

/// Seconds between `: ping` keepalive comments on an open subscription.
/// Stays under common 30 s idle timeouts of proxies.
pub const REALTIME_KEEPALIVE_SECS: u64 = 25;

/// Frames buffered per sink before further events are dropped for it.
pub const REALTIME_SINK_BUFFER: usize = 64;

/// Client reconnect delay in milliseconds (EventSource default).
pub const CLIENT_RETRY_MS: u64 = 3_000;

/// Largest frame (one line, or the joined data of one event) the client
/// decoder buffers before discarding it.
pub const CLIENT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Path of the subscription endpoint.
pub const REALTIME_PATH: &str = "/api/realtime";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default notification page size.
pub const NOTIFICATION_LIMIT: i64 = 20;

/// Upper bound on requested notification page size.
pub const NOTIFICATION_LIMIT_MAX: i64 = 100;

/// Default activity page size.
pub const ACTIVITY_LIMIT: i64 = 50;

/// Upper bound on requested activity page size.
pub const ACTIVITY_LIMIT_MAX: i64 = 200;

// =============================================================================
// SERVER
// =============================================================================

pub const SERVER_HOST: &str = "0.0.0.0";

pub const SERVER_PORT: u16 = 3001;

/// Lifetime of bearer tokens minted by the API auth helper.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
