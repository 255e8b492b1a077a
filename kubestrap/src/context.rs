use crate::config::Config;
use crate::error::BootstrapError;
use std::{env, path::PathBuf};

pub const KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

/// Paths shared by every node through the work directory.
#[derive(Debug, Clone)]
pub struct Paths {
	pub work_dir: PathBuf,
	pub handoff: PathBuf,
	pub kubeconfig: PathBuf,
	pub log_dir: PathBuf,
}

impl Paths {
	pub fn new(work_dir: PathBuf, log_dir: PathBuf) -> Self {
		Self {
			handoff: work_dir.join("join.txt"),
			kubeconfig: PathBuf::from(KUBECONFIG),
			work_dir,
			log_dir,
		}
	}
}

#[derive(Debug, Clone)]
pub struct Context {
	pub hostname: String,
	/// The user that invoked sudo, owner of the files this run creates.
	pub user: Option<String>,
	pub paths: Paths,
}

impl Context {
	pub fn resolve(config: &Config) -> Result<Self, BootstrapError> {
		let hostname = hostname::get()?
			.into_string()
			.map_err(|raw| BootstrapError::Config(format!("non-utf8 hostname {raw:?}")))?;
		let user = env::var("SUDO_USER").ok().filter(|user| !user.is_empty());
		Ok(Self {
			hostname,
			user,
			paths: Paths::new(config.work_dir.clone(), config.log_dir()),
		})
	}

	pub fn log_file(&self) -> PathBuf {
		self.paths.log_dir.join(format!("{}.log", self.hostname))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn log_file_is_keyed_by_hostname() {
		let context = Context {
			hostname: "node1.exp.testbed".to_owned(),
			user: None,
			paths: Paths::new(PathBuf::from("/shared"), PathBuf::from("/shared/logs")),
		};
		assert_eq!(context.log_file(), PathBuf::from("/shared/logs/node1.exp.testbed.log"));
		assert_eq!(context.paths.handoff, PathBuf::from("/shared/join.txt"));
	}
}
