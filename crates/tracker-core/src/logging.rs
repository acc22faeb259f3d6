//! Structured logging schema shared by every tracker crate.
//!
//! Events carry `subsystem` and `component` fields so log aggregation can
//! slice by origin. Their values come from the constants below; call sites
//! write e.g. `subsystem = SUBSYSTEM_REALTIME, component = COMPONENT_REGISTRY`.
//!
//! Entity and measurement fields use these names throughout: `user_id`,
//! `actor_id`, `sink_id`, `project_id`, `issue_id`, `event_type`,
//! `audience_size`, `delivered`, `failed`, `sink_count`, `marked`.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, secondary effect skipped (push, notification, activity) |
//! | INFO  | Lifecycle events (startup, shutdown, subscription open/close) |
//! | DEBUG | Fan-out decisions, audience sizes, registry changes |
//! | TRACE | Per-sink writes |

// ─── Subsystems ────────────────────────────────────────────────────────────

/// Server-side live delivery: registry, dispatcher, resolver, emitter, SSE.
pub const SUBSYSTEM_REALTIME: &str = "realtime";

/// Persistence.
pub const SUBSYSTEM_DB: &str = "db";

/// Subscriber side (`tracker-client`).
pub const SUBSYSTEM_CLIENT: &str = "client";

// ─── Components ────────────────────────────────────────────────────────────

pub const COMPONENT_REGISTRY: &str = "registry";
pub const COMPONENT_DISPATCHER: &str = "dispatcher";
pub const COMPONENT_RESOLVER: &str = "resolver";
pub const COMPONENT_EMITTER: &str = "emitter";

/// The SSE endpoint on the server and the connection loop on the client.
pub const COMPONENT_SUBSCRIPTION: &str = "subscription";

pub const COMPONENT_POOL: &str = "pool";
pub const COMPONENT_NOTIFICATIONS: &str = "notifications";

/// Client-side query cache.
pub const COMPONENT_CACHE: &str = "cache";

/// Client-side frame decoder.
pub const COMPONENT_DECODER: &str = "decoder";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_snake_case_and_distinct() {
        let values = [
            SUBSYSTEM_REALTIME,
            SUBSYSTEM_DB,
            SUBSYSTEM_CLIENT,
            COMPONENT_REGISTRY,
            COMPONENT_DISPATCHER,
            COMPONENT_RESOLVER,
            COMPONENT_EMITTER,
            COMPONENT_SUBSCRIPTION,
            COMPONENT_POOL,
            COMPONENT_NOTIFICATIONS,
            COMPONENT_CACHE,
            COMPONENT_DECODER,
        ];
        for value in values {
            assert!(value.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        let unique: std::collections::HashSet<_> = values.iter().collect();
        assert_eq!(unique.len(), values.len());
    }
}
