//! Tracing subscriber setup for hosts and tests.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the level passed to [`init_tracing`].
pub const LOG_ENV_VAR: &str = "PLAN_LOG";

/// Install a fmt subscriber filtered at `level` (e.g. `"info"`,
/// `"plan::database=debug"`). `PLAN_LOG` takes precedence when set.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(level: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
