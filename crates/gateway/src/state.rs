use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use sb_domain::config::Config;

use crate::runtime::Orchestrator;

/// Unix-seconds timestamp reported by `/ping`. Starts at process start and
/// moves forward after every finished invocation.
#[derive(Debug)]
pub struct HealthClock {
    last_update: AtomicI64,
}

impl HealthClock {
    pub fn new() -> Self {
        Self {
            last_update: AtomicI64::new(chrono::Utc::now().timestamp()),
        }
    }

    pub fn touch(&self) {
        self.last_update
            .fetch_max(chrono::Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_update(&self) -> i64 {
        self.last_update.load(Ordering::Relaxed)
    }
}

impl Default for HealthClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
    pub health: Arc<HealthClock>,
}

impl AppState {
    pub fn new(config: Arc<Config>, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
            health: Arc::new(HealthClock::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_never_moves_backwards() {
        let clock = HealthClock::new();
        let start = clock.last_update();
        clock.touch();
        assert!(clock.last_update() >= start);
    }
}
