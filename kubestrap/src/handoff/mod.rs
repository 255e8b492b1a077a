//! The hand-off file: `kubeadm init` output published by the initializer on
//! the shared filesystem and read by joining nodes.

pub mod extract;
pub mod watch;

use crate::error::BootstrapError;
use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
	process,
};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Handoff {
	path: PathBuf,
}

impl Handoff {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Directory holding the hand-off file.
	pub fn dir(&self) -> &Path {
		match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		}
	}

	fn err(&self, source: io::Error) -> BootstrapError {
		BootstrapError::Handoff {
			path: self.path.clone(),
			source,
		}
	}

	pub fn exists(&self) -> bool {
		self.path.exists()
	}

	/// Lists the parent directory. On NFS this revalidates the directory
	/// attribute cache, without it `exists` can keep returning false.
	pub fn refresh(&self) {
		if let Ok(entries) = fs::read_dir(self.dir()) {
			entries.for_each(drop);
		}
	}

	/// Deletes a hand-off file left behind by an earlier cluster.
	pub fn remove_stale(&self) -> Result<(), BootstrapError> {
		match fs::remove_file(&self.path) {
			Ok(()) => {
				info!("Removed stale hand-off file {}.", self.path.display());
				Ok(())
			}
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(self.err(err)),
		}
	}

	/// Writes `text` to a temporary sibling and renames it into place, so a
	/// reader sees either nothing or the whole file.
	pub fn publish(&self, text: &str) -> Result<(), BootstrapError> {
		if text.trim().is_empty() {
			return Err(self.err(io::Error::new(
				io::ErrorKind::InvalidInput,
				"refusing to publish empty hand-off text",
			)));
		}
		let parent = self.dir();
		fs::create_dir_all(parent).map_err(|err| self.err(err))?;
		let file_name = self
			.path
			.file_name()
			.ok_or_else(|| self.err(io::Error::new(io::ErrorKind::InvalidInput, "no file name")))?;
		let tmp = parent.join(format!(".{}.{}.tmp", file_name.to_string_lossy(), process::id()));
		let written = File::create(&tmp).and_then(|mut file| {
			file.write_all(text.as_bytes())?;
			file.sync_all()
		});
		if let Err(err) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
			let _ = fs::remove_file(&tmp);
			return Err(self.err(err));
		}
		if let Ok(dir) = File::open(parent) {
			let _ = dir.sync_all();
		}
		self.refresh();
		info!("Published hand-off file {}.", self.path.display());
		Ok(())
	}

	pub fn read(&self) -> Result<String, BootstrapError> {
		fs::read_to_string(&self.path).map_err(|err| self.err(err))
	}
}
