use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::setup::SetupStep;
use std::fs;
use tracing::info;

pub struct DisableSwap;

impl DisableSwap {
	pub const FSTAB_PATH: &str = "/etc/fstab";
	pub const SWAPS_PATH: &str = "/proc/swaps";
}

fn has_swap_entry(fstab: &str) -> bool {
	fstab
		.lines()
		.filter(|line| !line.trim_start().starts_with('#'))
		.any(|line| line.split_whitespace().nth(2) == Some("swap"))
}

fn strip_swap_entries(fstab: &str) -> String {
	let cleaned = fstab
		.lines()
		.filter(|line| {
			line.split_whitespace()
				.nth(2)
				.is_none_or(|fs_type| fs_type != "swap")
		})
		.collect::<Vec<_>>()
		.join("\n");
	if fstab.ends_with('\n') {
		cleaned + "\n"
	} else {
		cleaned
	}
}

impl SetupStep for DisableSwap {
	fn name(&self) -> &'static str {
		"DisableSwap"
	}

	fn check(&self, _exec: &Executor) -> Result<bool, BootstrapError> {
		let is_swap_on = fs::read_to_string(DisableSwap::SWAPS_PATH)?.lines().count() > 1;
		if is_swap_on {
			info!("Swap is enabled.");
			return Ok(false);
		}
		let Ok(config_txt) = fs::read_to_string(DisableSwap::FSTAB_PATH) else {
			info!("fstab is missing or unreadable.");
			return Ok(true);
		};
		if has_swap_entry(&config_txt) {
			info!("Swap is enabled in fstab.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, exec: &Executor) -> Result<(), BootstrapError> {
		exec.execute(Invocation::new("swapoff").arg("-a"))?;
		let original = fs::read_to_string(DisableSwap::FSTAB_PATH)?;
		let final_content = strip_swap_entries(&original);
		if final_content != original {
			info!("Removing swap entries from {}.", DisableSwap::FSTAB_PATH);
			fs::write(DisableSwap::FSTAB_PATH, final_content)?;
		}
		Ok(())
	}
}
