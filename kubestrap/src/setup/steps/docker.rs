use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::setup::SetupStep;
use crate::setup::utils::pkg;
use std::{fs, path::Path};
use tracing::info;

pub struct Docker;

impl Docker {
	pub const PACKAGE_NAME: &str = "docker.io";
	pub const SERVICE_NAME: &str = "docker";
	pub const CONFIG_PATH: &str = "/etc/docker/daemon.json";
	pub const CONTAINERD_CONFIG_PATH: &str = "/etc/containerd/config.toml";
	// kubelet expects the systemd cgroup driver.
	pub const CONFIG: &str = r#"{
  "exec-opts": ["native.cgroupdriver=systemd"],
  "log-driver": "json-file",
  "log-opts": { "max-size": "100m" },
  "storage-driver": "overlay2"
}
"#;
}

/// The containerd config shipped with docker.io disables the CRI plugin.
fn cri_enabled(config: &str) -> bool {
	!config.is_empty()
		&& !config.contains(r#"disabled_plugins = ["cri"]"#)
		&& config.contains("SystemdCgroup = true")
}

fn with_systemd_cgroup(config: &str) -> String {
	config.replace("SystemdCgroup = false", "SystemdCgroup = true")
}

impl SetupStep for Docker {
	fn name(&self) -> &'static str {
		"Docker"
	}

	fn check(&self, exec: &Executor) -> Result<bool, BootstrapError> {
		if !pkg::is_installed(exec, Docker::PACKAGE_NAME)? {
			info!("Docker is not installed.");
			return Ok(false);
		}
		if !Path::new(Docker::CONFIG_PATH).exists() {
			info!("Docker is not configured.");
			return Ok(false);
		}
		let containerd_config = fs::read_to_string(Docker::CONTAINERD_CONFIG_PATH).unwrap_or_default();
		if !cri_enabled(&containerd_config) {
			info!("Containerd CRI is not configured.");
			return Ok(false);
		}
		let is_active = exec
			.execute(
				Invocation::new("systemctl")
					.args(["is-active", "--quiet", Docker::SERVICE_NAME])
					.tolerate_failure(),
			)?
			.success();
		if !is_active {
			info!("Docker is not active.");
			return Ok(false);
		}
		info!("Docker is installed and active.");
		Ok(true)
	}

	fn set(&self, exec: &Executor) -> Result<(), BootstrapError> {
		info!("Installing docker via apt-get.");
		pkg::update(exec)?;
		pkg::install(exec, &[Docker::PACKAGE_NAME])?;
		if let Some(dir) = Path::new(Docker::CONFIG_PATH).parent() {
			fs::create_dir_all(dir)?;
		}
		fs::write(Docker::CONFIG_PATH, Docker::CONFIG)?;
		info!("Generating containerd config with the systemd cgroup driver.");
		let default_config = exec.execute(
			Invocation::new("containerd")
				.args(["config", "default"])
				.capture_output(),
		)?;
		fs::write(
			Docker::CONTAINERD_CONFIG_PATH,
			with_systemd_cgroup(default_config.stdout()),
		)?;
		exec.execute(Invocation::new("systemctl").args(["restart", "containerd"]))?;
		exec.execute(Invocation::new("systemctl").args(["enable", Docker::SERVICE_NAME]))?;
		exec.execute(Invocation::new("systemctl").arg("daemon-reload"))?;
		exec.execute(Invocation::new("systemctl").args(["restart", Docker::SERVICE_NAME]))?;
		info!("Docker installed.");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exec::RawOutput;
	use crate::exec::testing::{ScriptedRunner, scripted};

	#[test]
	fn docker_default_containerd_config_lacks_cri() {
		assert!(!cri_enabled(""));
		assert!(!cri_enabled("disabled_plugins = [\"cri\"]\n"));
		let generated = with_systemd_cgroup("[plugins]\n  SystemdCgroup = false\n");
		assert!(cri_enabled(&generated));
	}

	#[test]
	fn missing_package_short_circuits_check() {
		let (exec, calls) = scripted(
			ScriptedRunner::default().respond("dpkg-query", RawOutput::failure(1)),
		);
		assert!(!Docker.check(&exec).unwrap());
		assert_eq!(calls.borrow().len(), 1);
	}
}
