use std::{io, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
	#[error("I/O error: {0}.")]
	Io(#[from] io::Error),

	#[error("Failed to execute command '{cmd}': {source}")]
	CommandLaunch {
		cmd: String,
		#[source]
		source: io::Error,
	},

	#[error("Command failed ({}): {cmd}", exit_label(.code))]
	CommandFailed {
		cmd: String,
		code: Option<i32>,
		stderr: Option<String>,
	},

	#[error("Step '{step}' failed after attempt to set it.")]
	StepFailed { step: &'static str },

	#[error("Hand-off file {}: {source}", .path.display())]
	Handoff {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("No join command found in hand-off text: {0}.")]
	JoinCommandMissing(String),

	#[error("Gave up waiting for {} after {}s.", .path.display(), .waited.as_secs())]
	JoinTimeout { path: PathBuf, waited: Duration },

	#[error("Privilege escalation failed: {0}.")]
	Privilege(String),

	#[error("Invalid configuration: {0}.")]
	Config(String),

	#[error("YAML error: {0}.")]
	Yaml(#[from] serde_yaml::Error),
}

fn exit_label(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("exit code {code}"),
		None => "terminated by signal".to_owned(),
	}
}
