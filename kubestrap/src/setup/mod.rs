mod steps;
pub(crate) mod utils;

use crate::cluster::{self, AddOns, Initializer};
use crate::config::Config;
use crate::context::Context;
use crate::error::BootstrapError;
use crate::exec::Executor;
use crate::handoff::Handoff;
use crate::role::{self, Role};
use crate::setup::steps::{DisableSwap, Docker, KernelModules, Kubes, Sysctl};
use tracing::info;

pub trait SetupStep {
	fn name(&self) -> &'static str;
	fn check(&self, exec: &Executor) -> Result<bool, BootstrapError>;
	fn set(&self, exec: &Executor) -> Result<(), BootstrapError>;
}

const SETUP_STEPS: &[&dyn SetupStep] = &[&DisableSwap, &KernelModules, &Sysctl, &Docker, &Kubes];

pub fn run_steps(exec: &Executor, steps: &[&dyn SetupStep]) -> Result<(), BootstrapError> {
	for step in steps {
		if !step.check(exec)? {
			step.set(exec)?;
			if !step.check(exec)? {
				return Err(BootstrapError::StepFailed { step: step.name() });
			}
		}
	}
	Ok(())
}

pub fn setup(config: &Config, context: &Context, exec: &Executor) -> Result<(), BootstrapError> {
	let nodes = config.cluster_nodes();
	let role = role::select(&nodes, &context.hostname, &config.initializer_host);
	info!("Node {} bootstraps as {role:?}.", context.hostname);
	let log_file = context.log_file();
	if log_file.exists() {
		utils::owner::hand_over(exec, context.user.as_deref(), &log_file)?;
	}
	info!("Node provisioning started.");
	run_steps(exec, SETUP_STEPS)?;
	info!("Node provisioning finished.");
	let handoff = Handoff::new(&context.paths.handoff);
	let parser = config.join_parser.parser();
	match role {
		Role::Initializer => {
			let user = context.user.as_deref();
			Initializer::new(exec, &handoff, parser.as_ref())
				.owned_by(user)
				.initialize(&config.pod_network_cidr, &config.service_cidr)?;
			cluster::initializer::install_kubeconfig(exec, context)?;
			AddOns::new(exec, &context.paths.work_dir)
				.owned_by(user)
				.configure(config.mode, &nodes)?;
		}
		Role::Joiner => {
			cluster::joiner::join(exec, &handoff, config.poll_policy(), parser.as_ref())?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	struct Flaky {
		checks: Cell<u32>,
		fixed_after_set: bool,
	}

	impl SetupStep for Flaky {
		fn name(&self) -> &'static str {
			"Flaky"
		}

		fn check(&self, _exec: &Executor) -> Result<bool, BootstrapError> {
			self.checks.set(self.checks.get() + 1);
			Ok(self.checks.get() > 1 && self.fixed_after_set)
		}

		fn set(&self, _exec: &Executor) -> Result<(), BootstrapError> {
			Ok(())
		}
	}

	#[test]
	fn step_is_rechecked_after_set() {
		let (exec, _calls) = crate::exec::testing::scripted(Default::default());
		let fixed = Flaky {
			checks: Cell::new(0),
			fixed_after_set: true,
		};
		run_steps(&exec, &[&fixed]).unwrap();
		assert_eq!(fixed.checks.get(), 2);
	}

	#[test]
	fn step_still_failing_after_set_is_fatal() {
		let (exec, _calls) = crate::exec::testing::scripted(Default::default());
		let broken = Flaky {
			checks: Cell::new(0),
			fixed_after_set: false,
		};
		let err = run_steps(&exec, &[&broken]).unwrap_err();
		assert!(matches!(err, BootstrapError::StepFailed { step: "Flaky" }));
	}
}
