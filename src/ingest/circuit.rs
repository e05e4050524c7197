// src/ingest/circuit.rs
//! Per-source circuit breaker. Stops calling a dependency that is failing
//! repeatedly, probes it again after a cooldown, and closes only after a few
//! consecutive successful probes.
//!
//! State is process-local and keyed by source name in a global registry — a
//! cold process starts every circuit closed. That is an accepted limitation
//! of the single-process deployment, not a bug.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::Serialize;

/// Observable phase of a circuit, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(120),
            success_threshold: 2,
        }
    }
}

/// One circuit. `closed → open` after `failure_threshold` consecutive
/// failures; `open → half-open` when the cooldown elapses (the next call is
/// the probe); `half-open → closed` after `success_threshold` successes;
/// any half-open failure reopens with a fresh cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: State,
    failures: u32,
    last_failure_at: Option<Instant>,
    config: CircuitConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            state: State::Closed,
            failures: 0,
            last_failure_at: None,
            config,
        }
    }

    pub fn phase(&self) -> CircuitPhase {
        match self.state {
            State::Closed => CircuitPhase::Closed,
            State::Open { .. } => CircuitPhase::Open,
            State::HalfOpen { .. } => CircuitPhase::HalfOpen,
        }
    }

    /// Whether a call may go out right now. Rejections are immediate — no
    /// network attempt is made on an open circuit.
    pub fn is_allowed(&mut self) -> bool {
        match self.state {
            State::Closed => true,
            State::HalfOpen { .. } => true,
            State::Open { since } => {
                if since.elapsed() >= self.config.cooldown {
                    self.state = State::HalfOpen { successes: 0 };
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            State::Closed => {
                self.failures = 0;
            }
            State::HalfOpen { successes } => {
                let successes = successes + 1;
                if successes >= self.config.success_threshold {
                    self.state = State::Closed;
                    self.failures = 0;
                } else {
                    self.state = State::HalfOpen { successes };
                }
            }
            State::Open { .. } => {}
        }
    }

    pub fn record_failure(&mut self) {
        self.last_failure_at = Some(Instant::now());
        match self.state {
            State::Closed => {
                self.failures += 1;
                if self.failures >= self.config.failure_threshold {
                    self.state = State::Open {
                        since: Instant::now(),
                    };
                }
            }
            // A failed probe reopens with a full cooldown restart.
            State::HalfOpen { .. } => {
                self.state = State::Open {
                    since: Instant::now(),
                };
            }
            State::Open { .. } => {
                self.state = State::Open {
                    since: Instant::now(),
                };
            }
        }
    }

    /// Remaining cooldown, zero unless open.
    pub fn remaining_cooldown(&self) -> Duration {
        match self.state {
            State::Open { since } => self.config.cooldown.saturating_sub(since.elapsed()),
            _ => Duration::ZERO,
        }
    }
}

// ------------------------------------------------------------
// Named-circuit registry
// ------------------------------------------------------------

static REGISTRY: Lazy<Mutex<HashMap<String, CircuitBreaker>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static REGISTRY_CONFIG: Lazy<Mutex<CircuitConfig>> =
    Lazy::new(|| Mutex::new(CircuitConfig::default()));

/// Set the config used for circuits created after this call.
pub fn configure(config: CircuitConfig) {
    *REGISTRY_CONFIG.lock().expect("circuit config mutex poisoned") = config;
}

fn with_circuit<T>(name: &str, f: impl FnOnce(&mut CircuitBreaker) -> T) -> T {
    let mut map = REGISTRY.lock().expect("circuit registry mutex poisoned");
    let cb = map.entry(name.to_string()).or_insert_with(|| {
        let cfg = *REGISTRY_CONFIG.lock().expect("circuit config mutex poisoned");
        CircuitBreaker::new(cfg)
    });
    f(cb)
}

pub fn allows(name: &str) -> bool {
    with_circuit(name, |cb| cb.is_allowed())
}

pub fn report_success(name: &str) {
    with_circuit(name, |cb| cb.record_success());
}

pub fn report_failure(name: &str) {
    with_circuit(name, |cb| cb.record_failure());
}

pub fn phase_of(name: &str) -> CircuitPhase {
    with_circuit(name, |cb| cb.phase())
}

/// Drop all named circuits. Test isolation helper.
pub fn reset_all() {
    REGISTRY
        .lock()
        .expect("circuit registry mutex poisoned")
        .clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(cooldown_ms: u64) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 3,
            cooldown: Duration::from_millis(cooldown_ms),
            success_threshold: 2,
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let mut cb = CircuitBreaker::new(fast_config(10_000));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
        assert_eq!(cb.phase(), CircuitPhase::Open);
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn cooldown_allows_single_probe_then_half_open() {
        let mut cb = CircuitBreaker::new(fast_config(10));
        for _ in 0..3 {
            cb.record_failure();
        }
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
        assert_eq!(cb.phase(), CircuitPhase::HalfOpen);
    }

    #[test]
    fn probe_failure_reopens_with_full_cooldown() {
        let mut cb = CircuitBreaker::new(fast_config(10));
        for _ in 0..3 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed()); // probe
        cb.record_failure();
        assert_eq!(cb.phase(), CircuitPhase::Open);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn closes_after_success_threshold_probes() {
        let mut cb = CircuitBreaker::new(fast_config(10));
        for _ in 0..3 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed());
        cb.record_success();
        assert_eq!(cb.phase(), CircuitPhase::HalfOpen);
        cb.record_success();
        assert_eq!(cb.phase(), CircuitPhase::Closed);
        // Failure counter reset: three new failures needed to reopen.
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn success_resets_closed_failure_count() {
        let mut cb = CircuitBreaker::new(fast_config(10_000));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }
}
