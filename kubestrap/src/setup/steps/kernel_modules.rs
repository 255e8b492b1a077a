use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::setup::SetupStep;
use hex_literal::hex;
use sha2::{Digest, Sha256};
use std::{fs, path::Path};
use tracing::info;

pub struct KernelModules;

impl KernelModules {
	pub const CONFIG_PATH: &str = "/etc/modules-load.d/k8s.conf";
	pub const MODULES: &[&str] = &["overlay", "br_netfilter"];
	pub const CONFIG: &str = "overlay\nbr_netfilter\n";
	const CONFIG_SHA256: [u8; 32] =
		hex!("fcaf07413a456d658640930cef56ed4d13330123e3b522c481021613c64755e3");

	pub fn is_loaded(module_name: &str) -> bool {
		Path::new("/sys/module/").join(module_name).exists()
	}

	pub fn load(exec: &Executor, module_name: &str) -> Result<(), BootstrapError> {
		info!("Loading kernel module: {module_name}.");
		exec.execute(Invocation::new("modprobe").arg(module_name))?;
		Ok(())
	}
}

impl SetupStep for KernelModules {
	fn name(&self) -> &'static str {
		"KernelModules"
	}

	fn check(&self, _exec: &Executor) -> Result<bool, BootstrapError> {
		let Ok(config_txt) = fs::read(KernelModules::CONFIG_PATH) else {
			info!("Kernel module config missing or unreadable.");
			return Ok(false);
		};
		if Sha256::digest(&config_txt)[..] != KernelModules::CONFIG_SHA256 {
			info!("Kernel modules are misconfigured.");
			return Ok(false);
		}
		for module_name in KernelModules::MODULES {
			if !KernelModules::is_loaded(module_name) {
				info!("Kernel module {module_name} not loaded.");
				return Ok(false);
			}
		}
		info!("Kernel modules are already configured and loaded.");
		Ok(true)
	}

	fn set(&self, exec: &Executor) -> Result<(), BootstrapError> {
		info!("Configuring kernel modules.");
		fs::write(KernelModules::CONFIG_PATH, KernelModules::CONFIG)?;
		for module_name in KernelModules::MODULES {
			KernelModules::load(exec, module_name)?;
		}
		info!("Kernel modules have been configured and loaded.");
		Ok(())
	}
}
