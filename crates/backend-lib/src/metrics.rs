// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_DEACTIVATED: &str = "session.deactivated";
pub const SESSION_VALIDATED: &str = "session.validated";
pub const SESSION_REJECTED: &str = "session.rejected";
pub const SESSION_PURGED: &str = "session.purged";
pub const SESSION_CACHE_SIZE: &str = "session.cache.size";
pub const SESSION_CACHE_HIT: &str = "session.cache.hit";
pub const SESSION_CACHE_MISS: &str = "session.cache.miss";
pub const SESSION_CACHE_EVICTED: &str = "session.cache.evicted";
pub const RATE_LIMIT_DENIED: &str = "rate_limit.denied";
pub const RATE_LIMIT_FAIL_OPEN: &str = "rate_limit.fail_open";
pub const RATE_LIMIT_SWEPT: &str = "rate_limit.swept";
pub const AUDIT_QUEUED: &str = "audit.queued";
pub const AUDIT_INLINE: &str = "audit.inline";
pub const AUDIT_FAILED: &str = "audit.failed";
pub const AUTH_SUCCESS: &str = "auth.success";
pub const AUTH_FAILURE: &str = "auth.failure";
