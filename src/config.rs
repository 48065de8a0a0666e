//! Server configuration loaded from environment variables.
//!
//! Every knob has a compiled-in default; the environment only overrides.
//! Invalid values are logged and ignored rather than aborting startup.

use std::sync::Arc;

use tracing::warn;

use crate::game::constants::{field, interval};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Play field width in world units
    pub field_width: u16,
    /// Play field height in world units
    pub field_height: u16,
    /// Scheduler pass interval in milliseconds
    pub process_interval_ms: u64,
    /// Entity movement gate within a session, in milliseconds
    pub entity_move_interval_ms: u64,
    /// Lifetime of a timed player statistic, in milliseconds
    pub statistic_duration_ms: u64,
    /// Grace period before an empty session is reaped, in milliseconds
    pub inactivity_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            field_width: field::WIDTH,
            field_height: field::HEIGHT,
            process_interval_ms: interval::PROCESS_MS,
            entity_move_interval_ms: interval::ENTITY_MOVE_MS,
            statistic_duration_ms: interval::STATISTIC_MS,
            inactivity_timeout_ms: interval::INACTIVITY_MS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw, "invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Read overrides from the environment on top of the defaults.
    pub fn load_or_default() -> Self {
        let defaults = Self::default();
        Self {
            field_width: env_parse("FIELD_WIDTH", defaults.field_width),
            field_height: env_parse("FIELD_HEIGHT", defaults.field_height),
            process_interval_ms: env_parse("PROCESS_INTERVAL_MS", defaults.process_interval_ms),
            entity_move_interval_ms: env_parse(
                "ENTITY_MOVE_INTERVAL_MS",
                defaults.entity_move_interval_ms,
            ),
            statistic_duration_ms: env_parse(
                "STATISTIC_DURATION_MS",
                defaults.statistic_duration_ms,
            ),
            inactivity_timeout_ms: env_parse(
                "INACTIVITY_TIMEOUT_MS",
                defaults.inactivity_timeout_ms,
            ),
        }
    }

    /// Reject configurations the simulation cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.field_width == 0 || self.field_height == 0 {
            return Err("field dimensions must be non-zero".into());
        }
        if self.process_interval_ms == 0 {
            return Err("process interval must be non-zero".into());
        }
        if self.entity_move_interval_ms < self.process_interval_ms {
            return Err("entity move interval must be at least the process interval".into());
        }
        Ok(())
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
