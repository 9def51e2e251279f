use crate::circuitbreaker::config::CircuitBreakerConfig;
use crate::circuitbreaker::events::CircuitBreakerEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls pass through to the inner service.
    Closed = 0,
    /// Calls are rejected immediately.
    Open = 1,
    /// A limited number of trial calls are allowed to probe recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Point-in-time snapshot of the circuit breaker's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    /// Current state of the circuit.
    pub state: CircuitState,
    /// Total calls recorded in the current window.
    pub total_calls: usize,
    /// Failed calls recorded in the current window.
    pub failure_count: usize,
    /// Successful calls recorded in the current window.
    pub success_count: usize,
    /// Failure rate over the current window (0.0 to 1.0).
    pub failure_rate: f64,
    /// Time since the last state transition.
    pub time_since_state_change: std::time::Duration,
}

/// The shared mutable state behind a circuit breaker: the state enum, the
/// rolling outcome window and the timestamp of the last transition.
///
/// The window is a ring buffer of the last `sliding_window_size` call
/// outcomes; recording a call evicts the oldest outcome once the window is
/// full, so the failure rate always reflects the most recent calls only.
/// The window empties on every state transition.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    // true = failure
    window: VecDeque<bool>,
    failure_count: usize,
    success_count: usize,
    half_open_in_flight: usize,
    half_open_successes: usize,
}

impl Circuit {
    pub(crate) fn new_with_atomic(state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            window: VecDeque::new(),
            failure_count: 0,
            success_count: 0,
            half_open_in_flight: 0,
            half_open_successes: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::new_with_atomic(Arc::new(AtomicU8::new(CircuitState::Closed as u8)))
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics<Res, Err>(&self, _config: &CircuitBreakerConfig<Res, Err>) -> CircuitMetrics {
        let total = self.window.len();
        let failure_rate = if total > 0 {
            self.failure_count as f64 / total as f64
        } else {
            0.0
        };

        CircuitMetrics {
            state: self.state,
            total_calls: total,
            failure_count: self.failure_count,
            success_count: self.success_count,
            failure_rate,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    pub(crate) fn record_success<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        self.settle_in_flight();

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= config.permitted_calls_in_half_open {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            _ => {
                self.push_outcome(false, config);
                self.evaluate_window(config);
            }
        }
    }

    pub(crate) fn record_failure<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        self.settle_in_flight();

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        match self.state {
            // Any failed trial call reopens the circuit and restarts the cooldown.
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config),
            _ => {
                self.push_outcome(true, config);
                self.evaluate_window(config);
            }
        }
    }

    /// Decides whether a call may proceed, transitioning open circuits to
    /// half-open once the cooldown has elapsed.
    ///
    /// In the half-open state a permit is reserved at acquisition time, so at
    /// most `permitted_calls_in_half_open` trials are in flight or settled at
    /// once; concurrent callers beyond that are rejected.
    pub(crate) fn try_acquire<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) -> bool {
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted(config);
                true
            }
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.wait_duration_in_open {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_in_flight += 1;
                    self.emit_permitted(config);
                    true
                } else {
                    self.emit_rejected(config);
                    false
                }
            }
            CircuitState::HalfOpen => {
                let permitted = self.half_open_in_flight + self.half_open_successes
                    < config.permitted_calls_in_half_open;
                if permitted {
                    self.half_open_in_flight += 1;
                    self.emit_permitted(config);
                } else {
                    self.emit_rejected(config);
                }
                permitted
            }
        }
    }

    pub(crate) fn force_open<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub(crate) fn reset<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        self.transition_to(CircuitState::Closed, config);
        // Already-closed circuits skip the transition but still drop their
        // window counters.
        self.clear_window();
    }

    fn emit_permitted<Res, Err>(&self, config: &CircuitBreakerConfig<Res, Err>) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });
    }

    fn emit_rejected<Res, Err>(&self, config: &CircuitBreakerConfig<Res, Err>) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
            });
    }

    fn settle_in_flight(&mut self) {
        self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
    }

    fn push_outcome<Res, Err>(&mut self, failed: bool, config: &CircuitBreakerConfig<Res, Err>) {
        self.window.push_back(failed);
        if failed {
            self.failure_count += 1;
        } else {
            self.success_count += 1;
        }

        while self.window.len() > config.sliding_window_size.max(1) {
            if let Some(evicted) = self.window.pop_front() {
                if evicted {
                    self.failure_count -= 1;
                } else {
                    self.success_count -= 1;
                }
            }
        }
    }

    fn clear_window(&mut self) {
        self.window.clear();
        self.success_count = 0;
        self.failure_count = 0;
        self.half_open_in_flight = 0;
        self.half_open_successes = 0;
    }

    fn transition_to<Res, Err>(
        &mut self,
        state: CircuitState,
        config: &CircuitBreakerConfig<Res, Err>,
    ) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            from = ?from_state,
            to = ?state,
            "circuit state transition"
        );

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.clear_window();
    }

    fn evaluate_window<Res, Err>(&mut self, config: &CircuitBreakerConfig<Res, Err>) {
        if self.window.len() < config.minimum_number_of_calls {
            return;
        }

        let failure_rate = self.failure_count as f64 / self.window.len() as f64;
        if failure_rate >= config.failure_rate_threshold {
            self.transition_to(CircuitState::Open, config);
        }
    }
}
