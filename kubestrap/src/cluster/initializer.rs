use crate::context::Context;
use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::handoff::Handoff;
use crate::handoff::extract::JoinCommandParser;
use crate::setup::utils::owner;
use std::{env, fs, path::PathBuf};
use tracing::info;

/// Turns this node into the control plane and publishes the join command.
pub struct Initializer<'a> {
	exec: &'a Executor,
	handoff: &'a Handoff,
	parser: &'a dyn JoinCommandParser,
	owner: Option<&'a str>,
}

impl<'a> Initializer<'a> {
	pub fn new(exec: &'a Executor, handoff: &'a Handoff, parser: &'a dyn JoinCommandParser) -> Self {
		Self {
			exec,
			handoff,
			parser,
			owner: None,
		}
	}

	/// User that receives the published hand-off file.
	pub fn owned_by(mut self, user: Option<&'a str>) -> Self {
		self.owner = user;
		self
	}

	/// Returns the published `kubeadm init` output.
	pub fn initialize(&self, pod_network_cidr: &str, service_cidr: &str) -> Result<String, BootstrapError> {
		info!("Initializing control plane.");
		self.handoff.remove_stale()?;
		self.exec.execute(
			Invocation::new("kubeadm")
				.args(["reset", "--force"])
				.tolerate_failure(),
		)?;
		let init = self.exec.execute(
			Invocation::new("kubeadm")
				.arg("init")
				.args(["--pod-network-cidr", pod_network_cidr])
				.args(["--service-cidr", service_cidr])
				.capture_output(),
		)?;
		let text = init.stdout().to_owned();
		let join_command = self.parser.parse(&text)?;
		info!("Join command: {join_command}");
		self.handoff.publish(&text)?;
		owner::hand_over(self.exec, self.owner, self.handoff.path())?;
		info!("Control plane initialized.");
		Ok(text)
	}
}

fn home_dir(exec: &Executor, user: &str) -> Result<PathBuf, BootstrapError> {
	let passwd = exec.execute(
		Invocation::new("getent")
			.args(["passwd", user])
			.capture_output(),
	)?;
	passwd
		.stdout()
		.trim()
		.split(':')
		.nth(5)
		.filter(|home| !home.is_empty())
		.map(PathBuf::from)
		.ok_or_else(|| BootstrapError::Config(format!("no home directory for user {user}")))
}

/// Copies the admin kubeconfig to `~/.kube/config` of the user that ran sudo.
pub fn install_kubeconfig(exec: &Executor, context: &Context) -> Result<PathBuf, BootstrapError> {
	let home = match &context.user {
		Some(user) => home_dir(exec, user)?,
		None => env::var("HOME")
			.map(PathBuf::from)
			.map_err(|_| BootstrapError::Config("HOME is not set".to_owned()))?,
	};
	let kube_dir = home.join(".kube");
	fs::create_dir_all(&kube_dir)?;
	let target = kube_dir.join("config");
	fs::copy(&context.paths.kubeconfig, &target)?;
	if let Some(user) = &context.user {
		exec.execute(
			Invocation::new("chown")
				.arg("-R")
				.arg(format!("{user}:"))
				.arg(kube_dir.to_string_lossy()),
		)?;
	}
	info!("Kubeconfig set for {}.", target.display());
	Ok(target)
}
