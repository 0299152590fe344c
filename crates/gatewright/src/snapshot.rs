//! The read-only input snapshot. The surrounding controller keeps a local mirror of
//! cluster state; translation only ever sees one immutable view of it. Lookups that
//! miss mean the mirror has not caught up yet, and surface as retryable reference
//! errors on the owning object.

use std::collections::BTreeMap;

use crate::translate::PolicyError;
use crate::types::api::*;
use crate::*;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	pub policies: Vec<Arc<PolicyObject>>,
	pub gateways: BTreeMap<ObjectKey, Arc<Gateway>>,
	pub listener_sets: BTreeMap<ObjectKey, Arc<ListenerSet>>,
	pub routes: BTreeMap<ObjectKey, Arc<HttpRoute>>,
	pub services: BTreeMap<ObjectKey, Arc<ServiceObject>>,
	pub backends: BTreeMap<ObjectKey, Arc<BackendObject>>,
	pub secrets: BTreeMap<ObjectKey, Arc<Secret>>,
	pub configs: BTreeMap<ObjectKey, Arc<ConfigObject>>,
}

impl Snapshot {
	pub fn insert_policy(&mut self, p: PolicyObject) {
		self.policies.push(Arc::new(p));
	}

	pub fn insert_gateway(&mut self, g: Gateway) {
		self.gateways.insert(g.metadata.key(), Arc::new(g));
	}

	pub fn insert_listener_set(&mut self, ls: ListenerSet) {
		self.listener_sets.insert(ls.metadata.key(), Arc::new(ls));
	}

	pub fn insert_route(&mut self, r: HttpRoute) {
		self.routes.insert(r.metadata.key(), Arc::new(r));
	}

	pub fn insert_service(&mut self, s: ServiceObject) {
		self.services.insert(s.metadata.key(), Arc::new(s));
	}

	pub fn insert_backend(&mut self, b: BackendObject) {
		self.backends.insert(b.metadata.key(), Arc::new(b));
	}

	pub fn insert_secret(&mut self, s: Secret) {
		self.secrets.insert(s.metadata.key(), Arc::new(s));
	}

	pub fn insert_config(&mut self, c: ConfigObject) {
		self.configs.insert(c.metadata.key(), Arc::new(c));
	}
}

/// Lookup capability handed to translators. Implemented over the snapshot; translators
/// never reach anything else.
pub trait Resolver {
	fn secret(&self, namespace: &str, name: &str) -> Result<Arc<Secret>, PolicyError>;
	fn secrets_by_labels(&self, namespace: &str, labels: &BTreeMap<Strng, Strng>) -> Vec<Arc<Secret>>;
	fn config(&self, namespace: &str, name: &str) -> Result<Arc<ConfigObject>, PolicyError>;
	/// Resolve a backend reference to the name of the cluster that will carry it.
	fn backend_cluster(&self, from_namespace: &str, r: &BackendRef) -> Result<Strng, PolicyError>;
}

impl Resolver for Snapshot {
	fn secret(&self, namespace: &str, name: &str) -> Result<Arc<Secret>, PolicyError> {
		self
			.secrets
			.get(&ObjectKey::new(namespace, name))
			.cloned()
			.ok_or_else(|| PolicyError::not_found("Secret", namespace, name))
	}

	fn secrets_by_labels(&self, namespace: &str, labels: &BTreeMap<Strng, Strng>) -> Vec<Arc<Secret>> {
		self
			.secrets
			.values()
			.filter(|s| s.metadata.namespace.as_str() == namespace && s.metadata.matches_labels(labels))
			.cloned()
			.collect()
	}

	fn config(&self, namespace: &str, name: &str) -> Result<Arc<ConfigObject>, PolicyError> {
		self
			.configs
			.get(&ObjectKey::new(namespace, name))
			.cloned()
			.ok_or_else(|| PolicyError::not_found("ConfigObject", namespace, name))
	}

	fn backend_cluster(&self, from_namespace: &str, r: &BackendRef) -> Result<Strng, PolicyError> {
		let namespace = r.namespace.as_deref().unwrap_or(from_namespace);
		let key = ObjectKey::new(namespace, &r.name);
		match r.kind.as_deref() {
			None | Some("Service") => {
				if !self.services.contains_key(&key) {
					return Err(PolicyError::not_found("Service", namespace, &r.name));
				}
				let port = r.port.unwrap_or(80);
				Ok(strng::format!("service/{}/{}:{}", namespace, r.name, port))
			},
			Some("Backend") => {
				if !self.backends.contains_key(&key) {
					return Err(PolicyError::not_found("Backend", namespace, &r.name));
				}
				Ok(strng::format!("backend/{}/{}", namespace, r.name))
			},
			Some(other) => Err(PolicyError::Validation(format!(
				"unsupported backendRef kind {other}; expected Service or Backend"
			))),
		}
	}
}
