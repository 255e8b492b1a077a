//! Recovering the `kubeadm join` command from `kubeadm init` output.
//!
//! kubeadm prints the join command last, split over two lines with a
//! trailing backslash. That layout is an external contract of kubeadm, so
//! the strategy sits behind [`JoinCommandParser`].

use crate::error::BootstrapError;
use crate::exec::Invocation;
use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCommand(String);

impl JoinCommand {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Splits on whitespace into a typed invocation; the text is never handed
	/// to a shell.
	pub fn to_invocation(&self) -> Result<Invocation, BootstrapError> {
		let mut words = self.0.split_whitespace();
		let program = words
			.next()
			.ok_or_else(|| BootstrapError::JoinCommandMissing(self.0.clone()))?;
		Ok(Invocation::new(program).args(words))
	}
}

impl fmt::Display for JoinCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

pub trait JoinCommandParser {
	fn parse(&self, text: &str) -> Result<JoinCommand, BootstrapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParserKind {
	/// The last two non-empty lines.
	LastLines,
	/// Search for the last `kubeadm join` line and its continuations.
	Scan,
}

impl ParserKind {
	pub fn parser(self) -> Box<dyn JoinCommandParser> {
		match self {
			ParserKind::LastLines => Box::new(LastTwoLines),
			ParserKind::Scan => Box::new(JoinTokenScan),
		}
	}
}

const CONTINUATION: char = '\\';
const JOIN_TOKEN: &str = "kubeadm join";

/// Replaces the continuation backslash with a space and appends the next line.
fn splice(first: &str, second: &str) -> String {
	let first = first.trim_start();
	let first = match first.strip_suffix(CONTINUATION) {
		Some(head) => format!("{head} "),
		None => format!("{first} "),
	};
	first + second.trim()
}

#[derive(Debug, Clone, Copy)]
pub struct LastTwoLines;

impl JoinCommandParser for LastTwoLines {
	fn parse(&self, text: &str) -> Result<JoinCommand, BootstrapError> {
		let lines = text
			.lines()
			.map(str::trim_end)
			.filter(|line| !line.is_empty())
			.collect::<Vec<_>>();
		let [.., first, second] = lines.as_slice() else {
			return Err(BootstrapError::JoinCommandMissing(text.trim().to_owned()));
		};
		Ok(JoinCommand(splice(first, second)))
	}
}

#[derive(Debug, Clone, Copy)]
pub struct JoinTokenScan;

impl JoinCommandParser for JoinTokenScan {
	fn parse(&self, text: &str) -> Result<JoinCommand, BootstrapError> {
		let lines = text.lines().map(str::trim_end).collect::<Vec<_>>();
		let start = lines
			.iter()
			.rposition(|line| line.contains(JOIN_TOKEN))
			.ok_or_else(|| BootstrapError::JoinCommandMissing(text.trim().to_owned()))?;
		let head = &lines[start][lines[start].find(JOIN_TOKEN).unwrap_or_default()..];
		let mut command = head.to_owned();
		for line in &lines[start + 1..] {
			if !command.ends_with(CONTINUATION) {
				break;
			}
			command = splice(&command, line);
		}
		let command = command.trim_end_matches(CONTINUATION).trim().to_owned();
		Ok(JoinCommand(command))
	}
}
