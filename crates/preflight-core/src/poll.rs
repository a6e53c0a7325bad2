use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

// ─── PollTimeout ──────────────────────────────────────────────────────────

/// The deadline elapsed with no satisfying probe.
///
/// Typed distinctly from any probe-level failure: callers can tell "the
/// target rejected the query" apart from "the target never became ready".
/// Carries the final probe result so diagnostics can show the last observed
/// state.
#[derive(Debug)]
pub struct PollTimeout<T> {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last: T,
}

impl<T> fmt::Display for PollTimeout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deadline elapsed after {} attempt(s) over {:.1}s",
            self.attempts,
            self.elapsed.as_secs_f64()
        )
    }
}

// ─── poll_until ───────────────────────────────────────────────────────────

/// Bounded-retry polling loop: invoke `probe` until `is_ready` holds or
/// `deadline` elapses.
///
/// Returns the first satisfying probe result immediately — success latency
/// is the time to that probe, with no further waiting. The interval is
/// constant; control-plane state converges in seconds, so backoff buys
/// nothing here.
///
/// The deadline is checked after each failed attempt, before the sleep, so
/// a zero (or already-exhausted) budget still performs one probe.
/// Termination is guaranteed: either the predicate holds or the deadline
/// check fires.
pub fn poll_until<T, P, F>(
    mut probe: P,
    mut is_ready: F,
    interval: Duration,
    deadline: Duration,
) -> Result<T, PollTimeout<T>>
where
    P: FnMut() -> T,
    F: FnMut(&T) -> bool,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let result = probe();
        if is_ready(&result) {
            return Ok(result);
        }
        if start.elapsed() >= deadline {
            return Err(PollTimeout {
                attempts,
                elapsed: start.elapsed(),
                last: result,
            });
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn first_satisfying_probe_returns_immediately() {
        let start = Instant::now();
        let result = poll_until(|| "Running", |r| *r == "Running", TICK, Duration::from_secs(60));
        assert_eq!(result.unwrap(), "Running");
        // No sleep happened: success latency is time-to-first-probe.
        assert!(start.elapsed() < TICK);
    }

    #[test]
    fn converges_after_a_few_attempts() {
        let calls = Cell::new(0);
        let result = poll_until(
            || {
                calls.set(calls.get() + 1);
                if calls.get() >= 3 {
                    "Running"
                } else {
                    "Pending"
                }
            },
            |r| *r == "Running",
            TICK,
            Duration::from_secs(60),
        );
        assert_eq!(result.unwrap(), "Running");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn timeout_is_typed_even_when_every_probe_succeeds() {
        // Every probe "succeeds" at the transport level but reports Pending;
        // the outcome must be a PollTimeout, not a probe failure.
        let result = poll_until(|| "Pending", |r| *r == "Running", TICK, TICK * 3);
        let timeout = result.unwrap_err();
        assert_eq!(timeout.last, "Pending");
        // Attempts land at 0, 10, 20, 30ms; scheduler jitter can swallow one.
        assert!(
            (3..=4).contains(&timeout.attempts),
            "attempts = {}",
            timeout.attempts
        );
    }

    #[test]
    fn zero_deadline_still_probes_once() {
        let calls = Cell::new(0);
        let result = poll_until(
            || {
                calls.set(calls.get() + 1);
                "Pending"
            },
            |r| *r == "Running",
            TICK,
            Duration::ZERO,
        );
        assert_eq!(calls.get(), 1);
        assert_eq!(result.unwrap_err().attempts, 1);
    }

    #[test]
    fn zero_deadline_with_ready_probe_succeeds() {
        let result = poll_until(|| "Running", |r| *r == "Running", TICK, Duration::ZERO);
        assert!(result.is_ok());
    }
}
