use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding the external business directory.
pub type DirectoryBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the circuit breaker used around directory lookups.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failed lookups open the circuit.
/// - **Backoff**: Exponential backoff from 10s to 60s before a trial lookup.
///
/// While the circuit is open, lookups are rejected without a network call and
/// the lead is enriched with empty place details.
pub fn create_directory_circuit_breaker() -> DirectoryBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_opens_after_five_failed_lookups() {
        let cb = create_directory_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("directory down"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        assert!(
            matches!(result, Err(Error::Rejected)),
            "Expected circuit to be open and reject lookups"
        );
    }

    #[test]
    fn test_intermittent_failures_keep_circuit_closed() {
        let cb = create_directory_circuit_breaker();

        for _ in 0..3 {
            let _: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("flaky"));
            let ok: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(1));
            assert_eq!(ok.unwrap(), 1);
        }
        assert!(cb.is_call_permitted());
    }
}
