//! Backend translation: each backend shape becomes one cluster descriptor plus an
//! endpoint set, with the effective backend policy layered on top.

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::translate::backendtls;
use crate::types::api::*;
use crate::types::ir::EffectiveBackendPolicy;
use crate::types::wire::*;
use crate::*;

const CLOUD_FUNCTION_PORT: u16 = 443;
const SECRET_ACCESS_KEY_ID: &str = "accessKey";
const SECRET_SECRET_KEY: &str = "secretKey";
const SECRET_SESSION_TOKEN: &str = "sessionToken";

pub fn cluster_name(backend: &BackendObject) -> Strng {
	strng::format!(
		"backend/{}/{}",
		backend.metadata.namespace,
		backend.metadata.name
	)
}

pub fn service_cluster_name(service: &ServiceObject, port: u16) -> Strng {
	strng::format!(
		"service/{}/{}:{}",
		service.metadata.namespace,
		service.metadata.name,
		port
	)
}

pub fn translate(
	backend: &BackendObject,
	policy: &EffectiveBackendPolicy,
	resolver: &dyn Resolver,
) -> (Cluster, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let name = cluster_name(backend);
	let namespace = backend.metadata.namespace.clone();

	let mut cluster = match &backend.spec {
		BackendType::Static(s) => translate_static(name, s, &mut errors),
		BackendType::DynamicForwardProxy(d) => translate_dfp(name, d),
		BackendType::CloudFunction(c) => translate_cloud_function(name, c, &namespace, resolver, &mut errors),
	};

	apply_policy(&mut cluster, policy, &namespace, resolver, &mut errors);
	(cluster, errors)
}

/// Build the cluster for one service port. Services resolve through cluster DNS; the
/// policy layering is the same as for backends.
pub fn translate_service(
	service: &ServiceObject,
	port: u16,
	policy: &EffectiveBackendPolicy,
	resolver: &dyn Resolver,
) -> (Cluster, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let namespace = service.metadata.namespace.clone();
	let mut cluster = Cluster::new(service_cluster_name(service, port), DiscoveryType::StrictDns);
	cluster.endpoints = vec![Target::Hostname(
		strng::format!("{}.{}.svc.cluster.local", service.metadata.name, namespace),
		port,
	)];
	apply_policy(&mut cluster, policy, &namespace, resolver, &mut errors);
	(cluster, errors)
}

fn translate_static(name: Strng, spec: &StaticBackend, errors: &mut Vec<PolicyError>) -> Cluster {
	let mut endpoints = Vec::new();
	let mut sni = None;
	for host in &spec.hosts {
		match Target::try_from((host.host.as_str(), host.port)) {
			Ok(t @ Target::Address(_)) => endpoints.push(t),
			Ok(t @ Target::Hostname(_, _)) => {
				// First hostname doubles as the SNI hint for DNS-discovered clusters.
				if sni.is_none() {
					sni = Some(host.host.clone());
				}
				endpoints.push(t);
			},
			Err(e) => errors.push(PolicyError::Validation(format!(
				"invalid static host {}: {e}",
				host.host
			))),
		}
	}
	if endpoints.is_empty() {
		errors.push(PolicyError::Validation(
			"static backend requires at least one host".to_string(),
		));
	}

	// Pre-resolved discovery only when every host is a literal address.
	let discovery = if sni.is_none() {
		DiscoveryType::Static
	} else {
		DiscoveryType::StrictDns
	};
	let mut cluster = Cluster::new(name, discovery);
	cluster.endpoints = endpoints;
	cluster.sni = sni;
	cluster
}

fn translate_dfp(name: Strng, spec: &DynamicForwardProxyBackend) -> Cluster {
	let mut cluster = Cluster::new(name, DiscoveryType::DynamicForwardProxy);
	if spec.enable_tls {
		cluster.tls = Some(UpstreamTlsConfig {
			root_ca: Some(RootCaConfig::SystemTrust),
			..Default::default()
		});
	}
	cluster
}

fn translate_cloud_function(
	name: Strng,
	spec: &CloudFunctionBackend,
	namespace: &str,
	resolver: &dyn Resolver,
	errors: &mut Vec<PolicyError>,
) -> Cluster {
	let mut cluster = Cluster::new(name, DiscoveryType::StrictDns);

	let host = match &spec.endpoint {
		Some(endpoint) => endpoint.clone(),
		None => strng::format!("lambda.{}.amazonaws.com", spec.region),
	};
	cluster.endpoints = vec![Target::Hostname(host.clone(), CLOUD_FUNCTION_PORT)];

	// Emulator endpoints speak plaintext; the real service is always TLS with SNI set
	// to the function endpoint.
	if spec.endpoint.is_none() {
		cluster.tls = Some(UpstreamTlsConfig {
			root_ca: Some(RootCaConfig::SystemTrust),
			sni: Some(host),
			..Default::default()
		});
	}

	let credentials = spec.auth.as_ref().and_then(|auth| {
		match resolve_credentials(&auth.secret_ref, namespace, resolver) {
			Ok(c) => Some(c),
			Err(e) => {
				errors.push(e);
				None
			},
		}
	});

	let mut function_arn = strng::format!("arn:aws:lambda:{}:function:{}", spec.region, spec.function);
	if let Some(qualifier) = &spec.qualifier {
		function_arn = strng::format!("{function_arn}:{qualifier}");
	}
	cluster.cloud_function = Some(CloudFunctionConfig {
		function_arn,
		invocation_mode: spec.invocation_mode,
		payload_transform: spec.payload_transform,
		credentials,
	});
	cluster
}

fn resolve_credentials(
	secret_ref: &SecretRef,
	namespace: &str,
	resolver: &dyn Resolver,
) -> Result<CloudFunctionCredentials, PolicyError> {
	let ns = secret_ref.namespace.as_deref().unwrap_or(namespace);
	let secret = resolver.secret(ns, &secret_ref.name)?;
	let get = |key: &str| {
		secret.data.get(key).filter(|v| !v.is_empty()).cloned().ok_or_else(|| {
			PolicyError::Validation(format!(
				"secret {ns}/{} is missing key '{key}'",
				secret_ref.name
			))
		})
	};
	Ok(CloudFunctionCredentials {
		access_key_id: get(SECRET_ACCESS_KEY_ID)?,
		secret_access_key: get(SECRET_SECRET_KEY)?,
		session_token: secret.data.get(SECRET_SESSION_TOKEN).filter(|v| !v.is_empty()).cloned(),
	})
}

fn apply_policy(
	cluster: &mut Cluster,
	policy: &EffectiveBackendPolicy,
	namespace: &str,
	resolver: &dyn Resolver,
	errors: &mut Vec<PolicyError>,
) {
	if let Some(http) = &policy.http {
		cluster.http_version = http.version;
		cluster.pool_idle_timeout = http.pool_idle_timeout;
	}
	if let Some(tcp) = &policy.tcp {
		cluster.connect_timeout = tcp.connect_timeout;
		cluster.keepalive = tcp.keepalive.clone();
	}
	if let Some(tls) = &policy.tls {
		let (cfg, errs) = backendtls::translate(tls, namespace, resolver);
		errors.extend(errs);
		if let Some(mut cfg) = cfg {
			// A backend shape that already fixed its SNI keeps it unless the policy
			// sets its own.
			if cfg.sni.is_none() {
				cfg.sni = cluster
					.sni
					.clone()
					.or_else(|| cluster.tls.as_ref().and_then(|t| t.sni.clone()));
			}
			cluster.tls = Some(cfg);
		}
	}
	if let Some(auth) = &policy.auth {
		match translate_auth(auth, namespace, resolver) {
			Ok(a) => cluster.auth = Some(a),
			Err(e) => errors.push(e),
		}
	}
}

pub fn translate_auth(
	spec: &BackendAuthSpec,
	namespace: &str,
	resolver: &dyn Resolver,
) -> Result<BackendAuthConfig, PolicyError> {
	match spec {
		BackendAuthSpec::Key(k) => Ok(BackendAuthConfig::Key(k.clone())),
		BackendAuthSpec::SecretRef(r) => {
			let ns = r.namespace.as_deref().unwrap_or(namespace);
			let secret = resolver.secret(ns, &r.name)?;
			let key = r.key.as_deref().unwrap_or("Authorization");
			secret
				.data
				.get(key)
				.filter(|v| !v.is_empty())
				.map(|v| BackendAuthConfig::Key(v.clone()))
				.ok_or_else(|| {
					PolicyError::Validation(format!("secret {ns}/{} is missing key '{key}'", r.name))
				})
		},
		BackendAuthSpec::Passthrough {} => Ok(BackendAuthConfig::Passthrough),
	}
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
