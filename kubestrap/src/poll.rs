use std::{
	sync::mpsc::{Receiver, RecvTimeoutError},
	thread::sleep,
	time::{Duration, Instant},
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
	pub interval: Duration,
	/// `None` waits until the condition holds or the process is killed.
	pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(5),
			timeout: None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
	Satisfied { waited: Duration },
	TimedOut { waited: Duration },
}

/// Pauses, refreshes, then checks, until `condition` holds.
///
/// `refresh` runs before every check so that stale caches (NFS attribute
/// caching in particular) are revalidated. A message on `events` ends the
/// current pause early; the interval still bounds every pause, and a
/// disconnected channel leaves plain polling.
pub fn wait_for<R, C>(
	what: &str,
	policy: &PollPolicy,
	mut events: Option<&Receiver<()>>,
	mut refresh: R,
	mut condition: C,
) -> WaitOutcome
where
	R: FnMut(),
	C: FnMut() -> bool,
{
	let started = Instant::now();
	loop {
		match events {
			Some(rx) => match rx.recv_timeout(policy.interval) {
				Ok(()) => while rx.try_recv().is_ok() {},
				Err(RecvTimeoutError::Timeout) => {}
				Err(RecvTimeoutError::Disconnected) => {
					events = None;
					sleep(policy.interval);
				}
			},
			None => sleep(policy.interval),
		}
		refresh();
		let waited = started.elapsed();
		if condition() {
			info!("Found {what} after {}s.", waited.as_secs());
			return WaitOutcome::Satisfied { waited };
		}
		info!("Waiting for {what}: {}s elapsed.", waited.as_secs());
		if policy.timeout.is_some_and(|timeout| waited >= timeout) {
			return WaitOutcome::TimedOut { waited };
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
		mpsc,
	};
	use std::thread;

	fn quick(timeout: Option<u64>) -> PollPolicy {
		PollPolicy {
			interval: Duration::from_millis(5),
			timeout: timeout.map(Duration::from_millis),
		}
	}

	#[test]
	fn refresh_runs_before_each_check() {
		let mut refreshes = 0;
		let mut checks = 0;
		let outcome = wait_for(
			"third check",
			&quick(None),
			None,
			|| refreshes += 1,
			|| {
				checks += 1;
				checks == 3
			},
		);
		assert!(matches!(outcome, WaitOutcome::Satisfied { .. }));
		assert_eq!(refreshes, 3);
	}

	#[test]
	fn event_ends_pause_early() {
		let (tx, rx) = mpsc::channel();
		let ready = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&ready);
		let notifier = thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			flag.store(true, Ordering::SeqCst);
			tx.send(()).unwrap();
		});
		let slow = PollPolicy {
			interval: Duration::from_secs(60),
			timeout: None,
		};
		let outcome = wait_for("event", &slow, Some(&rx), || {}, || ready.load(Ordering::SeqCst));
		notifier.join().unwrap();
		match outcome {
			WaitOutcome::Satisfied { waited } => assert!(waited < Duration::from_secs(30)),
			other => panic!("unexpected outcome {other:?}"),
		}
	}

	#[test]
	fn closed_event_channel_falls_back_to_polling() {
		let (tx, rx) = mpsc::channel::<()>();
		drop(tx);
		let mut checks = 0;
		let outcome = wait_for(
			"third check",
			&quick(Some(5_000)),
			Some(&rx),
			|| {},
			|| {
				checks += 1;
				checks == 3
			},
		);
		assert!(matches!(outcome, WaitOutcome::Satisfied { .. }));
		assert_eq!(checks, 3);
	}

	#[test]
	fn gives_up_after_timeout() {
		let outcome = wait_for("nothing", &quick(Some(30)), None, || {}, || false);
		match outcome {
			WaitOutcome::TimedOut { waited } => assert!(waited >= Duration::from_millis(30)),
			other => panic!("unexpected outcome {other:?}"),
		}
	}
}
