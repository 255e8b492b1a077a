use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::handoff::Handoff;
use crate::handoff::extract::{JoinCommand, JoinCommandParser};
use crate::handoff::watch::JoinFileWatcher;
use crate::poll::PollPolicy;
use tracing::info;

/// Waits for the initializer's hand-off file and joins the cluster with it.
pub fn join(
	exec: &Executor,
	handoff: &Handoff,
	policy: PollPolicy,
	parser: &dyn JoinCommandParser,
) -> Result<JoinCommand, BootstrapError> {
	JoinFileWatcher::new(handoff.clone(), policy).wait()?;
	let text = handoff.read()?;
	let join_command = parser.parse(&text)?;
	info!("Joining with: {join_command}");
	exec.execute(
		Invocation::new("kubeadm")
			.args(["reset", "--force"])
			.tolerate_failure(),
	)?;
	exec.execute(join_command.to_invocation()?)?;
	info!("This node has joined the cluster.");
	Ok(join_command)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exec::RawOutput;
	use crate::exec::testing::{ScriptedRunner, scripted};
	use crate::handoff::extract::{JoinTokenScan, LastTwoLines};
	use std::{thread, time::Duration};
	use tempfile::TempDir;

	const INIT_OUTPUT: &str = "\
Your Kubernetes control-plane has initialized successfully!

kubeadm join 10.0.0.1:6443 --token abcd \\
\t--discovery-token-ca-cert-hash sha256:deadbeef
";

	fn policy() -> PollPolicy {
		PollPolicy {
			interval: Duration::from_millis(10),
			timeout: Some(Duration::from_secs(10)),
		}
	}

	#[test]
	fn joins_once_master_publishes() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("join.txt"));
		let master = handoff.clone();
		let writer = thread::spawn(move || {
			thread::sleep(Duration::from_millis(40));
			master.publish(INIT_OUTPUT).unwrap();
		});
		let (exec, calls) = scripted(ScriptedRunner::default());
		let command = join(&exec, &handoff, policy(), &LastTwoLines).unwrap();
		writer.join().unwrap();
		assert_eq!(
			command.as_str(),
			"kubeadm join 10.0.0.1:6443 --token abcd  --discovery-token-ca-cert-hash sha256:deadbeef"
		);
		assert_eq!(
			*calls.borrow(),
			vec![
				"kubeadm reset --force",
				"kubeadm join 10.0.0.1:6443 --token abcd --discovery-token-ca-cert-hash sha256:deadbeef",
			]
		);
	}

	#[test]
	fn failed_join_is_fatal() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("join.txt"));
		handoff.publish(INIT_OUTPUT).unwrap();
		let (exec, _calls) =
			scripted(ScriptedRunner::default().respond("kubeadm join", RawOutput::failure(1)));
		let err = join(&exec, &handoff, policy(), &JoinTokenScan).unwrap_err();
		assert!(matches!(err, BootstrapError::CommandFailed { .. }));
	}

	#[test]
	fn malformed_artifact_runs_nothing() {
		let dir = TempDir::new().unwrap();
		let handoff = Handoff::new(dir.path().join("join.txt"));
		handoff.publish("init failed halfway\n").unwrap();
		let (exec, calls) = scripted(ScriptedRunner::default());
		let err = join(&exec, &handoff, policy(), &JoinTokenScan).unwrap_err();
		assert!(matches!(err, BootstrapError::JoinCommandMissing(_)));
		assert!(calls.borrow().is_empty());
	}
}
