//! Structured logging field name constants for notekeep.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service (store unavailable, unclassified failures) |
//! | WARN  | Rejected requests, recoverable issues, retries |
//! | INFO  | Lifecycle events (startup, shutdown, pool state), mutations |
//! | DEBUG | Decision points, query shapes, config choices |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated through `x-request-id`.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "client"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "notes", "classifier", "store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "list", "create", "toggle_archive", "search"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a list or search.
pub const RESULT_COUNT: &str = "result_count";

/// Total number of matches before pagination.
pub const TOTAL_COUNT: &str = "total_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Connection state reported by the pool observer.
pub const POOL_STATE: &str = "pool_state";

// ─── HTTP fields ───────────────────────────────────────────────────────────

/// HTTP method of a failed request.
pub const METHOD: &str = "method";

/// Request path of a failed request.
pub const PATH: &str = "path";

/// Classified error kind.
pub const ERROR_KIND: &str = "error_kind";

/// HTTP status code returned.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Retry attempt number (client).
pub const ATTEMPT: &str = "attempt";
