use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use std::path::Path;
use tracing::info;

/// Gives `path` to the user that ran sudo. Nothing to do when run as root
/// directly.
pub fn hand_over(exec: &Executor, user: Option<&str>, path: &Path) -> Result<(), BootstrapError> {
	let Some(user) = user else {
		return Ok(());
	};
	exec.execute(
		Invocation::new("chown")
			.arg(format!("{user}:"))
			.arg(path.to_string_lossy()),
	)?;
	info!("{} now belongs to {user}.", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exec::testing::{ScriptedRunner, scripted};

	#[test]
	fn chowns_to_invoking_user() {
		let (exec, calls) = scripted(ScriptedRunner::default());
		hand_over(&exec, Some("alex"), Path::new("/shared/join.txt")).unwrap();
		assert_eq!(*calls.borrow(), vec!["chown alex: /shared/join.txt"]);
	}

	#[test]
	fn root_invocation_changes_nothing() {
		let (exec, calls) = scripted(ScriptedRunner::default());
		hand_over(&exec, None, Path::new("/shared/join.txt")).unwrap();
		assert!(calls.borrow().is_empty());
	}
}
