use crate::config::ExposureMode;
use crate::error::BootstrapError;
use crate::exec::{Executor, Invocation};
use crate::role::ClusterNodes;
use crate::setup::utils::{kctl, owner};
use serde::Serialize;
use std::{
	net::Ipv4Addr,
	path::{Path, PathBuf},
};
use tracing::info;

pub const WEAVE_VERSION: &str = "v2.8.1";
pub const METALLB_VERSION: &str = "v0.14.5";
pub const METALLB_NAMESPACE: &str = "metallb-system";
pub const NGINX_INGRESS_VERSION: &str = "v3.4.3";
pub const CONTROL_PLANE_TAINTS: &[&str] = &[
	"node-role.kubernetes.io/control-plane:NoSchedule",
	"node-role.kubernetes.io/master:NoSchedule",
];
// Workloads of the native manifest, ready once the webhook answers.
const METALLB_WORKLOADS: &[&str] = &["deployment/controller", "daemonset/speaker"];
// Applied before the daemon set, in order.
const NGINX_INGRESS_PREREQUISITES: &[&str] = &[
	"deploy/crds.yaml",
	"deployments/common/ns-and-sa.yaml",
	"deployments/rbac/rbac.yaml",
	"deployments/common/nginx-config.yaml",
	"deployments/common/ingress-class.yaml",
];
const NGINX_INGRESS_DAEMON_SET: &str = "deployments/daemon-set/nginx-ingress.yaml";
const NGINX_INGRESS_NODE_PORT: &str = "deployments/service/nodeport.yaml";
const INGRESS_PATCHES: &[&str] = &[
	r#"(select(.kind == "DaemonSet") | .spec.template.spec.hostNetwork) = true"#,
	r#"del(select(.kind == "DaemonSet") | .spec.replicas)"#,
];

fn weave_url() -> String {
	format!("https://github.com/weaveworks/weave/releases/download/{WEAVE_VERSION}/weave-daemonset-k8s.yaml")
}

fn metallb_url() -> String {
	format!("https://raw.githubusercontent.com/metallb/metallb/{METALLB_VERSION}/config/manifests/metallb-native.yaml")
}

fn nginx_ingress_url(path: &str) -> String {
	format!("https://raw.githubusercontent.com/nginxinc/kubernetes-ingress/{NGINX_INGRESS_VERSION}/{path}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Resource<S> {
	api_version: &'static str,
	kind: &'static str,
	metadata: Metadata,
	spec: S,
}

#[derive(Serialize)]
struct Metadata {
	name: String,
	namespace: String,
}

#[derive(Serialize)]
struct AddressPoolSpec {
	addresses: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct L2AdvertisementSpec {
	ip_address_pools: Vec<String>,
}

/// MetalLB pool and layer 2 advertisement for the given addresses.
pub fn address_pool_manifest(addrs: &[Ipv4Addr]) -> Result<String, BootstrapError> {
	let metadata = || Metadata {
		name: "kubestrap-pool".to_owned(),
		namespace: METALLB_NAMESPACE.to_owned(),
	};
	let pool = Resource {
		api_version: "metallb.io/v1beta1",
		kind: "IPAddressPool",
		metadata: metadata(),
		spec: AddressPoolSpec {
			addresses: addrs.iter().map(|addr| format!("{addr}/32")).collect(),
		},
	};
	let advertisement = Resource {
		api_version: "metallb.io/v1beta1",
		kind: "L2Advertisement",
		metadata: metadata(),
		spec: L2AdvertisementSpec {
			ip_address_pools: vec![pool.metadata.name.clone()],
		},
	};
	Ok(format!(
		"{}---\n{}",
		serde_yaml::to_string(&pool)?,
		serde_yaml::to_string(&advertisement)?
	))
}

/// Network, exposure and scheduling add-ons applied once `kubeadm init` is done.
pub struct AddOns<'a> {
	exec: &'a Executor,
	work_dir: &'a Path,
	owner: Option<&'a str>,
}

impl<'a> AddOns<'a> {
	pub fn new(exec: &'a Executor, work_dir: &'a Path) -> Self {
		Self {
			exec,
			work_dir,
			owner: None,
		}
	}

	/// User that receives manifests written to the work directory.
	pub fn owned_by(mut self, user: Option<&'a str>) -> Self {
		self.owner = user;
		self
	}

	pub fn configure(&self, mode: ExposureMode, nodes: &ClusterNodes) -> Result<(), BootstrapError> {
		self.pod_network()?;
		// Add-on pods do not tolerate the control plane taint.
		if nodes.count() == Some(1) {
			self.untaint()?;
		}
		match mode {
			ExposureMode::LoadBalancer => self.load_balancer(nodes),
			ExposureMode::Ingress => self.ingress(),
		}
	}

	fn pod_network(&self) -> Result<(), BootstrapError> {
		let version = self.exec.execute(
			Invocation::new("kubeadm")
				.args(["version", "-o", "short"])
				.capture_output(),
		)?;
		let version = version.stdout().trim();
		info!("Applying Weave Net {WEAVE_VERSION} for Kubernetes {version}.");
		kctl::apply(self.exec, &weave_url())
	}

	fn load_balancer(&self, nodes: &ClusterNodes) -> Result<(), BootstrapError> {
		info!("Installing MetalLB.");
		kctl::apply(self.exec, &metallb_url())?;
		for workload in METALLB_WORKLOADS {
			kctl::rollout_status(self.exec, METALLB_NAMESPACE, workload, "180s")?;
		}
		// Only the initializer is advertised, so the cluster has one entry point.
		let master = match nodes.master() {
			Some(addr) => addr,
			None => self.own_address()?,
		};
		let manifest = address_pool_manifest(&[master])?;
		info!("Advertising {master} through MetalLB.");
		kctl::apply_yaml(self.exec, &manifest)
	}

	fn own_address(&self) -> Result<Ipv4Addr, BootstrapError> {
		let result = self
			.exec
			.execute(Invocation::new("hostname").arg("-I").capture_output())?;
		result
			.stdout()
			.split_whitespace()
			.find_map(|word| word.parse::<Ipv4Addr>().ok())
			.ok_or_else(|| BootstrapError::Config("no IPv4 address for this host".to_owned()))
	}

	fn ingress_manifest_path(&self) -> PathBuf {
		self.work_dir.join("nginx-ingress.yaml")
	}

	fn ingress(&self) -> Result<(), BootstrapError> {
		info!("Installing NGINX ingress controller.");
		for prerequisite in NGINX_INGRESS_PREREQUISITES {
			kctl::apply(self.exec, &nginx_ingress_url(prerequisite))?;
		}
		let manifest = self.ingress_manifest_path();
		let manifest_arg = manifest.to_string_lossy().into_owned();
		self.exec.execute(
			Invocation::new("curl")
				.args(["-fsSL", "-o"])
				.arg(manifest_arg.as_str())
				.arg(nginx_ingress_url(NGINX_INGRESS_DAEMON_SET)),
		)?;
		for patch in INGRESS_PATCHES {
			self.exec.execute(
				Invocation::new("yq")
					.args(["-i", *patch])
					.arg(manifest_arg.as_str()),
			)?;
		}
		owner::hand_over(self.exec, self.owner, &manifest)?;
		kctl::apply_file(self.exec, &manifest)?;
		kctl::apply(self.exec, &nginx_ingress_url(NGINX_INGRESS_NODE_PORT))
	}

	/// Lets workloads run on a single-node cluster.
	fn untaint(&self) -> Result<(), BootstrapError> {
		info!("Single node cluster, removing control plane taints.");
		for taint in CONTROL_PLANE_TAINTS {
			kctl::remove_taint(self.exec, taint)?;
		}
		Ok(())
	}
}
