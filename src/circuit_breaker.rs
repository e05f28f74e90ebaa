use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding the postal-code lookup transport.
pub type LookupCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Consecutive transport failures that open the circuit.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Creates the circuit breaker used by the ViaCEP client.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive transport failures trigger OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, lookups pass through.
/// - **OPEN**: Upstream keeps failing, lookups fail fast as service-unavailable.
/// - **HALF_OPEN**: A trial lookup decides whether the upstream recovered.
///
/// A "postal code not found" answer is a healthy upstream response and must be
/// reported as a success.
pub fn create_lookup_circuit_breaker() -> LookupCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
