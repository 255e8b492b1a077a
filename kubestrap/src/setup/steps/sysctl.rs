use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::setup::SetupStep;
use hex_literal::hex;
use sha2::{Digest, Sha256};
use std::fs;
use tracing::info;

pub struct Sysctl;

impl Sysctl {
	pub const CONFIG_PATH: &str = "/etc/sysctl.d/k8s.conf";
	pub const SETTINGS: &[&str] = &[
		"net.bridge.bridge-nf-call-iptables = 1",
		"net.bridge.bridge-nf-call-ip6tables = 1",
		"net.ipv4.ip_forward = 1",
	];
	const CONFIG_SHA256: [u8; 32] =
		hex!("6e3f751b8409493b80fb7154ee21989dece3322d8b9018157ffef64dfbc10799");

	fn config() -> String {
		Sysctl::SETTINGS.join("\n") + "\n"
	}
}

impl SetupStep for Sysctl {
	fn name(&self) -> &'static str {
		"Sysctl"
	}

	fn check(&self, _exec: &Executor) -> Result<bool, BootstrapError> {
		let Ok(config_txt) = fs::read(Sysctl::CONFIG_PATH) else {
			info!("Sysctl config missing or unreadable.");
			return Ok(false);
		};
		if Sha256::digest(&config_txt)[..] != Sysctl::CONFIG_SHA256 {
			info!("Sysctl is misconfigured.");
			return Ok(false);
		}
		info!("Sysctl already configured.");
		Ok(true)
	}

	fn set(&self, exec: &Executor) -> Result<(), BootstrapError> {
		info!("Configuring sysctl.");
		fs::write(Sysctl::CONFIG_PATH, Sysctl::config())?;
		exec.execute(Invocation::new("sysctl").arg("--system"))?;
		info!("Sysctl has been configured.");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn digest_matches_settings() {
		assert_eq!(
			Sha256::digest(Sysctl::config().as_bytes()).as_slice(),
			&Sysctl::CONFIG_SHA256[..]
		);
	}
}
