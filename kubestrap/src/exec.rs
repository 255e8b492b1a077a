use crate::error::BootstrapError;
use std::{
	fmt, io,
	io::Write,
	process::{Command, Stdio},
};
use tracing::{error, info, warn};

/// One external command, with its per-call policy.
///
/// `capture_output` and `tolerate_failure` belong to the invocation value, so
/// they never leak into the next call.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
	pub program: String,
	pub args: Vec<String>,
	pub env: Vec<(String, String)>,
	pub stdin: Option<String>,
	pub capture_output: bool,
	pub tolerate_failure: bool,
}

impl Invocation {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			..Default::default()
		}
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env.push((key.into(), value.into()));
		self
	}

	pub fn stdin(mut self, input: impl Into<String>) -> Self {
		self.stdin = Some(input.into());
		self
	}

	pub fn capture_output(mut self) -> Self {
		self.capture_output = true;
		self
	}

	pub fn tolerate_failure(mut self) -> Self {
		self.tolerate_failure = true;
		self
	}
}

impl fmt::Display for Invocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.program)?;
		for arg in &self.args {
			if arg.is_empty() || arg.contains(char::is_whitespace) {
				write!(f, " '{arg}'")?;
			} else {
				write!(f, " {arg}")?;
			}
		}
		Ok(())
	}
}

/// What a [`Runner`] hands back: raw exit code and byte streams.
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
	pub code: Option<i32>,
	pub stdout: Vec<u8>,
	pub stderr: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
	pub code: Option<i32>,
	pub stdout: Option<String>,
	pub stderr: Option<String>,
	pub tolerated: bool,
}

impl ExecResult {
	pub fn success(&self) -> bool {
		self.code == Some(0)
	}

	pub fn stdout(&self) -> &str {
		self.stdout.as_deref().unwrap_or_default()
	}
}

pub trait Runner {
	fn run(&self, invocation: &Invocation) -> io::Result<RawOutput>;
}

/// Runs invocations as child processes.
pub struct SystemRunner {
	/// Inherit the terminal for output that is not captured.
	pub passthrough: bool,
}

impl Runner for SystemRunner {
	fn run(&self, invocation: &Invocation) -> io::Result<RawOutput> {
		let mut command = Command::new(&invocation.program);
		command.args(&invocation.args);
		command.envs(invocation.env.iter().map(|(k, v)| (k, v)));
		if invocation.capture_output {
			command.stdout(Stdio::piped()).stderr(Stdio::piped());
		} else if self.passthrough {
			command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
		} else {
			command.stdout(Stdio::null()).stderr(Stdio::piped());
		}
		if invocation.stdin.is_some() {
			command.stdin(Stdio::piped());
		} else {
			command.stdin(Stdio::null());
		}
		let mut child = command.spawn()?;
		if let Some(input) = &invocation.stdin {
			let mut stdin = child
				.stdin
				.take()
				.ok_or_else(|| io::Error::other("child stdin was not piped"))?;
			// A child that exits without reading its input still has a
			// status and stderr to report.
			match stdin.write_all(input.as_bytes()) {
				Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err),
				_ => {}
			}
		}
		let output = child.wait_with_output()?;
		Ok(RawOutput {
			code: output.status.code(),
			stdout: output.stdout,
			stderr: output.stderr,
		})
	}
}

pub struct Executor {
	runner: Box<dyn Runner>,
}

impl Executor {
	pub fn new(runner: Box<dyn Runner>) -> Self {
		Self { runner }
	}

	pub fn system(passthrough: bool) -> Self {
		Self::new(Box::new(SystemRunner { passthrough }))
	}

	/// Runs one command. A failure is returned as `Err` unless the invocation
	/// tolerates it, in which case the caller inspects the result.
	pub fn execute(&self, invocation: Invocation) -> Result<ExecResult, BootstrapError> {
		let cmd = invocation.to_string();
		info!("Executing: {cmd}");
		let raw = match self.runner.run(&invocation) {
			Ok(raw) => raw,
			Err(source) if invocation.tolerate_failure => {
				warn!("Tolerated launch failure of '{cmd}': {source}");
				return Ok(ExecResult {
					code: None,
					stdout: None,
					stderr: Some(source.to_string()),
					tolerated: true,
				});
			}
			Err(source) => {
				error!("FAILED to launch: {cmd}: {source}");
				return Err(BootstrapError::CommandLaunch { cmd, source });
			}
		};
		let stdout = invocation
			.capture_output
			.then(|| String::from_utf8_lossy(&raw.stdout).into_owned());
		if let Some(text) = &stdout {
			info!("Output of '{cmd}':\n{text}");
		}
		let stderr = (!raw.stderr.is_empty())
			.then(|| String::from_utf8_lossy(&raw.stderr).trim().to_owned());
		let mut result = ExecResult {
			code: raw.code,
			stdout,
			stderr,
			tolerated: false,
		};
		if result.success() {
			return Ok(result);
		}
		if invocation.tolerate_failure {
			warn!("Tolerated failure ({:?}): {cmd}", result.code);
			result.tolerated = true;
			return Ok(result);
		}
		error!("FAILED ({:?}): {cmd}", result.code);
		if let Some(stderr) = &result.stderr {
			error!("{stderr}");
		}
		Err(BootstrapError::CommandFailed {
			cmd,
			code: result.code,
			stderr: result.stderr,
		})
	}
}

#[cfg(test)]
pub mod testing {
	use super::*;
	use std::{cell::RefCell, rc::Rc};

	/// Records every command and answers from a list of prefix rules.
	#[derive(Default)]
	pub struct ScriptedRunner {
		calls: Rc<RefCell<Vec<String>>>,
		stdins: Rc<RefCell<Vec<String>>>,
		rules: Vec<(String, RawOutput)>,
	}

	impl ScriptedRunner {
		pub fn respond(mut self, prefix: &str, output: RawOutput) -> Self {
			self.rules.push((prefix.to_owned(), output));
			self
		}

		pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
			Rc::clone(&self.calls)
		}

		pub fn stdins(&self) -> Rc<RefCell<Vec<String>>> {
			Rc::clone(&self.stdins)
		}
	}

	impl Runner for ScriptedRunner {
		fn run(&self, invocation: &Invocation) -> io::Result<RawOutput> {
			let cmd = invocation.to_string();
			self.calls.borrow_mut().push(cmd.clone());
			if let Some(input) = &invocation.stdin {
				self.stdins.borrow_mut().push(input.clone());
			}
			let output = self
				.rules
				.iter()
				.find(|(prefix, _)| cmd.starts_with(prefix))
				.map(|(_, output)| output.clone())
				.unwrap_or_else(RawOutput::success);
			Ok(output)
		}
	}

	impl RawOutput {
		pub fn success() -> Self {
			Self {
				code: Some(0),
				..Default::default()
			}
		}

		pub fn with_stdout(mut self, stdout: &str) -> Self {
			self.stdout = stdout.as_bytes().to_vec();
			self
		}

		pub fn failure(code: i32) -> Self {
			Self {
				code: Some(code),
				..Default::default()
			}
		}
	}

	pub fn scripted(runner: ScriptedRunner) -> (Executor, Rc<RefCell<Vec<String>>>) {
		let calls = runner.calls();
		(Executor::new(Box::new(runner)), calls)
	}
}
