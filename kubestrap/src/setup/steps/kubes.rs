use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::setup::SetupStep;
use crate::setup::utils::pkg;
use std::fs;
use tracing::info;

pub struct Kubes;

impl Kubes {
	pub const PACKAGE_NAMES: &[&str] = &["kubelet", "kubeadm", "kubectl"];
	pub const DEPENDENCIES: &[&str] = &["apt-transport-https", "ca-certificates", "curl", "gpg"];
	pub const APT_CONFIG_PATH: &str = "/etc/apt/sources.list.d/kubernetes.list";
	pub const APT_KEY_PATH: &str = "/etc/apt/keyrings/kubernetes-apt-keyring.gpg";
	pub const K8S_BASE_URL: &str = "https://pkgs.k8s.io/core:/stable:/v1.30/deb";
}

impl SetupStep for Kubes {
	fn name(&self) -> &'static str {
		"Kubes"
	}

	fn check(&self, exec: &Executor) -> Result<bool, BootstrapError> {
		for package_name in Kubes::PACKAGE_NAMES {
			if !pkg::is_installed(exec, package_name)? {
				info!("{package_name} is not installed.");
				return Ok(false);
			}
		}
		info!("Kubes are installed.");
		Ok(true)
	}

	fn set(&self, exec: &Executor) -> Result<(), BootstrapError> {
		info!("Installing Kubernetes tooling via apt-get.");
		pkg::update(exec)?;
		pkg::install(exec, Kubes::DEPENDENCIES)?;
		fs::create_dir_all("/etc/apt/keyrings")?;
		let key_command = format!(
			"curl -fsSL {}/Release.key | gpg --dearmor --yes -o {}",
			Kubes::K8S_BASE_URL,
			Kubes::APT_KEY_PATH,
		);
		exec.execute(Invocation::new("sh").args(["-c", &key_command]))?;
		let apt_config_txt = format!(
			"deb [signed-by={}] {} /\n",
			Kubes::APT_KEY_PATH,
			Kubes::K8S_BASE_URL,
		);
		fs::write(Kubes::APT_CONFIG_PATH, apt_config_txt)?;
		pkg::update(exec)?;
		pkg::install(exec, Kubes::PACKAGE_NAMES)?;
		pkg::hold(exec, Kubes::PACKAGE_NAMES)?;
		exec.execute(Invocation::new("systemctl").args(["enable", "--now", "kubelet"]))?;
		info!("Kubernetes tooling installed.");
		Ok(())
	}
}
