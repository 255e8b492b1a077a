use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};

pub enum PkgManager {
	Apt,
}

fn get_pkg_manager() -> PkgManager {
	PkgManager::Apt
}

pub fn is_installed(exec: &Executor, package_name: &str) -> Result<bool, BootstrapError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			let result = exec.execute(
				Invocation::new("dpkg-query")
					.args(["-W", "-f=${Status}", package_name])
					.capture_output()
					.tolerate_failure(),
			)?;
			if !result.success() {
				return Ok(false);
			}
			let status = result.stdout().trim();
			Ok(status == "install ok installed" || status == "hold ok installed")
		}
	}
}

pub fn update(exec: &Executor) -> Result<(), BootstrapError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			exec.execute(Invocation::new("apt-get").arg("update"))?;
		}
	}
	Ok(())
}

pub fn install(exec: &Executor, package_names: &[&str]) -> Result<(), BootstrapError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			exec.execute(
				Invocation::new("apt-get")
					.args(["install", "-y", "--no-install-recommends"])
					.args(package_names.iter().copied())
					.env("DEBIAN_FRONTEND", "noninteractive"),
			)?;
		}
	}
	Ok(())
}

pub fn hold(exec: &Executor, package_names: &[&str]) -> Result<(), BootstrapError> {
	match get_pkg_manager() {
		PkgManager::Apt => {
			exec.execute(
				Invocation::new("apt-mark")
					.arg("hold")
					.args(package_names.iter().copied()),
			)?;
		}
	}
	Ok(())
}
