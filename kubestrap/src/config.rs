use crate::handoff::extract::ParserKind;
use crate::poll::PollPolicy;
use crate::role::ClusterNodes;
use clap::{Parser, ValueEnum};
use std::{net::Ipv4Addr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExposureMode {
	/// NGINX ingress controller on the host network.
	Ingress,
	/// MetalLB with a layer 2 address pool.
	LoadBalancer,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "kubestrap")]
#[command(version)]
#[command(about = "Bootstrap a kubeadm cluster across testbed nodes sharing a filesystem")]
pub struct Config {
	/// Cluster node addresses, initializer first. Empty on joining nodes.
	pub nodes: Vec<Ipv4Addr>,

	/// How services are exposed outside the cluster
	#[arg(long, env = "KUBESTRAP_MODE", value_enum, default_value_t = ExposureMode::LoadBalancer)]
	pub mode: ExposureMode,

	/// Shared directory holding the hand-off file
	#[arg(long, env = "KUBESTRAP_WORK_DIR", default_value = "/mnt/shared/kubestrap")]
	pub work_dir: PathBuf,

	/// Directory for per-node log files (defaults to the work directory)
	#[arg(long, env = "KUBESTRAP_LOG_DIR")]
	pub log_dir: Option<PathBuf>,

	/// Hostname (or first hostname label) of the initializing node
	#[arg(long, env = "KUBESTRAP_INITIALIZER_HOST", default_value = "node0")]
	pub initializer_host: String,

	#[arg(long, env = "KUBESTRAP_POD_NETWORK_CIDR", default_value = "10.32.0.0/12")]
	pub pod_network_cidr: String,

	#[arg(long, env = "KUBESTRAP_SERVICE_CIDR", default_value = "10.96.0.0/12")]
	pub service_cidr: String,

	/// Seconds between hand-off file checks
	#[arg(
		long,
		env = "KUBESTRAP_POLL_INTERVAL",
		default_value_t = 5,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub poll_interval: u64,

	/// Seconds to wait for the hand-off file before giving up (waits forever if unset)
	#[arg(long, env = "KUBESTRAP_JOIN_TIMEOUT")]
	pub join_timeout: Option<u64>,

	/// How the join command is located in the kubeadm init output
	#[arg(long, env = "KUBESTRAP_JOIN_PARSER", value_enum, default_value_t = ParserKind::LastLines)]
	pub join_parser: ParserKind,

	/// Show output of commands that are not captured
	#[arg(long, env = "KUBESTRAP_DEBUG")]
	pub debug: bool,
}

impl Config {
	pub fn cluster_nodes(&self) -> ClusterNodes {
		ClusterNodes::new(self.nodes.clone())
	}

	pub fn poll_policy(&self) -> PollPolicy {
		PollPolicy {
			interval: Duration::from_secs(self.poll_interval),
			timeout: self.join_timeout.map(Duration::from_secs),
		}
	}

	pub fn log_dir(&self) -> PathBuf {
		self.log_dir.clone().unwrap_or_else(|| self.work_dir.clone())
	}
}
