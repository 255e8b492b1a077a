use crate::error::BootstrapError;
use crate::handoff::Handoff;
use crate::poll::{self, PollPolicy, WaitOutcome};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::mpsc::{self, Sender};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
	Waiting,
	Found,
	TimedOut,
}

/// Blocks a joining node until the initializer has published the hand-off file.
pub struct JoinFileWatcher {
	handoff: Handoff,
	policy: PollPolicy,
	state: WatchState,
}

impl JoinFileWatcher {
	pub fn new(handoff: Handoff, policy: PollPolicy) -> Self {
		Self {
			handoff,
			policy,
			state: WatchState::Waiting,
		}
	}

	pub fn state(&self) -> WatchState {
		self.state
	}

	pub fn wait(&mut self) -> Result<(), BootstrapError> {
		if self.state == WatchState::Found {
			return Ok(());
		}
		let path = self.handoff.path().display().to_string();
		info!("Waiting for hand-off file {path}.");
		let (tx, rx) = mpsc::channel();
		// Must outlive the wait, dropping it stops the events.
		let notifier = self.notifier(tx);
		let handoff = &self.handoff;
		let outcome = poll::wait_for(
			&path,
			&self.policy,
			notifier.as_ref().map(|_| &rx),
			|| handoff.refresh(),
			|| handoff.exists(),
		);
		match outcome {
			WaitOutcome::Satisfied { .. } => {
				self.state = WatchState::Found;
				Ok(())
			}
			WaitOutcome::TimedOut { waited } => {
				warn!("Hand-off file {path} did not appear.");
				self.state = WatchState::TimedOut;
				Err(BootstrapError::JoinTimeout {
					path: self.handoff.path().to_path_buf(),
					waited,
				})
			}
		}
	}

	/// Local changes to the hand-off directory wake the poll early. Writes
	/// from other NFS clients raise no event, so polling stays the fallback.
	fn notifier(&self, tx: Sender<()>) -> Option<RecommendedWatcher> {
		let dir = self.handoff.dir();
		let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
			if let Ok(event) = res {
				if !matches!(event.kind, EventKind::Access(_)) {
					let _ = tx.send(());
				}
			}
		})
		.map_err(|err| warn!("No file watcher, polling only: {err}"))
		.ok()?;
		watcher
			.watch(dir, RecursiveMode::NonRecursive)
			.map_err(|err| warn!("Cannot watch {}, polling only: {err}", dir.display()))
			.ok()?;
		Some(watcher)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::{fs, thread, time::Duration};
	use tempfile::TempDir;

	fn policy(timeout_ms: Option<u64>) -> PollPolicy {
		PollPolicy {
			interval: Duration::from_millis(10),
			timeout: timeout_ms.map(Duration::from_millis),
		}
	}

	#[test]
	fn stays_waiting_while_absent() {
		let dir = TempDir::new().unwrap();
		let mut watcher = JoinFileWatcher::new(Handoff::new(dir.path().join("join.txt")), policy(Some(60)));
		assert_eq!(watcher.state(), WatchState::Waiting);
		let err = watcher.wait().unwrap_err();
		assert!(matches!(err, BootstrapError::JoinTimeout { .. }));
		assert_eq!(watcher.state(), WatchState::TimedOut);
	}

	#[test]
	fn finds_file_published_later() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("join.txt"));
		let publisher = handoff.clone();
		let writer = thread::spawn(move || {
			thread::sleep(Duration::from_millis(50));
			publisher.publish("kubeadm join a \\\n--token b\n").unwrap();
		});
		let mut watcher = JoinFileWatcher::new(handoff, policy(Some(5_000)));
		watcher.wait().unwrap();
		writer.join().unwrap();
		assert_eq!(watcher.state(), WatchState::Found);
	}

	#[test]
	fn local_publish_is_noticed_before_interval_ends() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("join.txt"));
		let publisher = handoff.clone();
		let writer = thread::spawn(move || {
			thread::sleep(Duration::from_millis(100));
			publisher.publish("kubeadm join a \\\n--token b\n").unwrap();
		});
		let slow = PollPolicy {
			interval: Duration::from_secs(2),
			timeout: None,
		};
		let mut watcher = JoinFileWatcher::new(handoff, slow);
		watcher.wait().unwrap();
		writer.join().unwrap();
		assert_eq!(watcher.state(), WatchState::Found);
	}

	#[test]
	fn missing_directory_still_polls() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("not-yet/join.txt"));
		let publisher = handoff.clone();
		let writer = thread::spawn(move || {
			thread::sleep(Duration::from_millis(50));
			publisher.publish("kubeadm join a \\\n--token b\n").unwrap();
		});
		let mut watcher = JoinFileWatcher::new(handoff, policy(Some(5_000)));
		watcher.wait().unwrap();
		writer.join().unwrap();
		assert_eq!(watcher.state(), WatchState::Found);
	}

	#[test]
	fn existing_file_is_found_after_one_interval() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("join.txt");
		fs::write(&path, "ready").unwrap();
		let mut watcher = JoinFileWatcher::new(Handoff::new(path), policy(Some(0)));
		watcher.wait().unwrap();
		assert_eq!(watcher.state(), WatchState::Found);
	}
}
