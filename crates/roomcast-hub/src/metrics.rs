//! Metric names recorded by the hub.
//!
//! Recorded through the `metrics` facade; the server installs the exporter.

/// Sessions registered (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Sessions unregistered (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Currently registered sessions (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Slow consumers evicted on queue overflow (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Broadcast calls that reached fan-out (counter).
pub const HUB_BROADCASTS_TOTAL: &str = "hub_broadcasts_total";
/// Broadcast calls abandoned because the message could not be encoded (counter).
pub const HUB_BROADCAST_FAILURES_TOTAL: &str = "hub_broadcast_failures_total";
/// Rooms with at least one member (gauge).
pub const HUB_ROOMS_ACTIVE: &str = "hub_rooms_active";
/// Session lifetime in seconds (histogram).
pub const WS_SESSION_DURATION_SECONDS: &str = "ws_session_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_BROADCAST_DROPS_TOTAL,
            HUB_BROADCASTS_TOTAL,
            HUB_BROADCAST_FAILURES_TOTAL,
            HUB_ROOMS_ACTIVE,
            WS_SESSION_DURATION_SECONDS,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
