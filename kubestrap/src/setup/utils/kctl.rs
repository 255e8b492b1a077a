use crate::context::KUBECONFIG;
use crate::error::BootstrapError;
use crate::exec::{ExecResult, Executor, Invocation};
use std::path::Path;

fn kubectl(args: &[&str]) -> Invocation {
	Invocation::new("kubectl")
		.args(["--kubeconfig", KUBECONFIG])
		.args(args.iter().copied())
}

/// `target` is a URL or a local manifest path.
pub fn apply(exec: &Executor, target: &str) -> Result<(), BootstrapError> {
	exec.execute(kubectl(&["apply", "-f", target]))?;
	Ok(())
}

pub fn apply_file(exec: &Executor, path: &Path) -> Result<(), BootstrapError> {
	apply(exec, &path.to_string_lossy())
}

pub fn apply_yaml(exec: &Executor, yaml: &str) -> Result<(), BootstrapError> {
	exec.execute(kubectl(&["apply", "-f", "-"]).stdin(yaml))?;
	Ok(())
}

/// Blocks until `workload` (e.g. `deployment/controller`) has rolled out.
/// Unlike `kubectl wait pod`, this does not fail before the pods exist.
pub fn rollout_status(
	exec: &Executor,
	namespace: &str,
	workload: &str,
	timeout: &str,
) -> Result<(), BootstrapError> {
	exec.execute(kubectl(&[
		"rollout",
		"status",
		"--namespace",
		namespace,
		workload,
		&format!("--timeout={timeout}"),
	]))?;
	Ok(())
}

/// Removes `taint` from every node. Tolerated: the taint may not exist.
pub fn remove_taint(exec: &Executor, taint: &str) -> Result<ExecResult, BootstrapError> {
	exec.execute(kubectl(&["taint", "nodes", "--all", &format!("{taint}-")]).tolerate_failure())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exec::RawOutput;
	use crate::exec::testing::{ScriptedRunner, scripted};

	#[test]
	fn apply_yaml_goes_through_stdin() {
		let runner = ScriptedRunner::default();
		let stdins = runner.stdins();
		let (exec, calls) = scripted(runner);
		apply_yaml(&exec, "kind: Namespace\n").unwrap();
		assert_eq!(
			*calls.borrow(),
			vec!["kubectl --kubeconfig /etc/kubernetes/admin.conf apply -f -"]
		);
		assert_eq!(*stdins.borrow(), vec!["kind: Namespace\n"]);
	}

	#[test]
	fn missing_taint_is_not_fatal() {
		let (exec, _calls) = scripted(ScriptedRunner::default().respond(
			"kubectl --kubeconfig /etc/kubernetes/admin.conf taint",
			RawOutput::failure(1),
		));
		let result = remove_taint(&exec, "node-role.kubernetes.io/master:NoSchedule").unwrap();
		assert!(result.tolerated);
	}
}
