use std::{
	fs::{self, File, OpenOptions},
	panic,
	path::Path,
	sync::Mutex,
};
use tracing_journald::layer as journald_layer;
use tracing_panic::panic_hook;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry::Registry};

// sudo journalctl -t kubestrap
pub fn init(log_file: &Path) {
	panic::set_hook(Box::new(panic_hook));
	let log_sub = Registry::default()
		.with(
			EnvFilter::builder()
				.with_default_directive(tracing::Level::INFO.into())
				.from_env_lossy(),
		)
		.with(
			fmt::layer()
				.with_ansi(true)
				.with_file(true)
				.with_line_number(true)
				.with_target(true)
				.with_timer(fmt::time::SystemTime)
				.compact(),
		)
		.with(open_log_file(log_file).map(|file| {
			fmt::layer()
				.with_ansi(false)
				.with_target(true)
				.with_timer(fmt::time::SystemTime)
				.with_writer(Mutex::new(file))
		}))
		.with(
			journald_layer()
				.map_err(|err| eprintln!("journald not available: {err}"))
				.ok()
				.map(|layr| layr.with_syslog_identifier("kubestrap".into())),
		);
	tracing::subscriber::set_global_default(log_sub).expect("Failed to set log subscriber.");
}

/// Each node appends to its own file, so nodes never share a writer.
fn open_log_file(path: &Path) -> Option<File> {
	if let Some(dir) = path.parent() {
		fs::create_dir_all(dir)
			.map_err(|err| eprintln!("log directory {} not available: {err}", dir.display()))
			.ok()?;
	}
	OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.map_err(|err| eprintln!("log file {} not available: {err}", path.display()))
		.ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn log_file_is_created_with_its_directory() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("logs/node1.log");
		assert!(open_log_file(&path).is_some());
		assert!(path.exists());
	}
}
