use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	/// Runs `kubeadm init` and publishes the hand-off file.
	Initializer,
	/// Waits for the hand-off file and joins.
	Joiner,
}

/// Node addresses given on the command line, initializer first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterNodes(Vec<Ipv4Addr>);

impl ClusterNodes {
	pub fn new(addrs: Vec<Ipv4Addr>) -> Self {
		Self(addrs)
	}

	pub fn master(&self) -> Option<Ipv4Addr> {
		self.0.first().copied()
	}

	/// Cluster size, unknown when the initializer was picked by hostname.
	pub fn count(&self) -> Option<usize> {
		(!self.0.is_empty()).then_some(self.0.len())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

pub fn select(nodes: &ClusterNodes, hostname: &str, initializer_host: &str) -> Role {
	if !nodes.is_empty() || is_initializer_host(hostname, initializer_host) {
		Role::Initializer
	} else {
		Role::Joiner
	}
}

fn is_initializer_host(hostname: &str, initializer_host: &str) -> bool {
	let short = hostname.split('.').next().unwrap_or(hostname);
	hostname.eq_ignore_ascii_case(initializer_host) || short.eq_ignore_ascii_case(initializer_host)
}
