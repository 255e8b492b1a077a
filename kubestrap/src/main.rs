mod cluster;
mod config;
mod context;
mod error;
mod exec;
mod handoff;
mod logging;
mod poll;
mod role;
mod setup;

use clap::Parser;
use config::Config;
use context::Context;
use error::BootstrapError;
use exec::Executor;
use tracing::{error, info};

fn main() {
	let config = Config::parse();
	if let Err(err) = sudo::with_env(&["KUBESTRAP_", "RUST_LOG"]) {
		eprintln!("{}", BootstrapError::Privilege(err.to_string()));
		std::process::exit(1);
	}
	let context = match Context::resolve(&config) {
		Ok(context) => context,
		Err(err) => {
			eprintln!("Failed to resolve node context: {err}");
			std::process::exit(1);
		}
	};
	logging::init(&context.log_file());
	info!("Cluster bootstrap started.");
	let exec = Executor::system(config.debug);
	if let Err(err) = setup::setup(&config, &context, &exec) {
		error!("Bootstrap failed: {err}");
		std::process::exit(1);
	};
	info!("Cluster bootstrap finished successfully.");
}
