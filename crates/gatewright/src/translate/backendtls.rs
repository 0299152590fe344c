//! Backend TLS translation. Certificate/key pairs are validated before they ever
//! reach the proxy; a pair that rustls rejects is a validation error on the policy.

use std::io::Cursor;

use anyhow::anyhow;
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::Item;

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::{RootCaConfig, UpstreamTlsConfig};
use crate::*;

const SECRET_CERT_KEY: &str = "tls.crt";
const SECRET_KEY_KEY: &str = "tls.key";
const SECRET_CA_KEY: &str = "ca.crt";

pub fn translate(
	spec: &BackendTlsSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<UpstreamTlsConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	if spec.insecure_skip_verify {
		return (
			Some(UpstreamTlsConfig {
				sni: spec.sni.clone(),
				alpn: spec.alpn.clone(),
				insecure_skip_verify: true,
				..Default::default()
			}),
			errors,
		);
	}

	let material = match extract_material(spec, policy_namespace, resolver) {
		Ok(m) => m,
		Err(e) => return (None, vec![e]),
	};

	// A client certificate needs both halves of the pair; providing one without the
	// other is a configuration error, and a mismatched pair is rejected up front.
	match (&material.cert_chain, &material.private_key) {
		(None, None) => {},
		(Some(cert), Some(key)) => {
			if let Err(e) = validate_pair(cert, key) {
				errors.push(PolicyError::Validation(format!(
					"invalid certificate and key pair: {e}"
				)));
				return (None, errors);
			}
		},
		_ => {
			errors.push(PolicyError::Validation(
				"a client certificate requires both cert and key".to_string(),
			));
			return (None, errors);
		},
	}

	let root_ca = match (&material.root_ca, &spec.well_known_ca_certificates) {
		(Some(ca), _) => Some(RootCaConfig::Inline(ca.clone())),
		(None, Some(WellKnownCa::System)) => Some(RootCaConfig::SystemTrust),
		(None, None) => None,
	};

	// SAN verification is only meaningful against a trust root.
	if root_ca.is_none() && !spec.verify_subject_alt_names.is_empty() {
		errors.push(PolicyError::Validation(
			"a root CA must be provided if verifySubjectAltNames is not empty".to_string(),
		));
		return (None, errors);
	}

	(
		Some(UpstreamTlsConfig {
			cert_chain: material.cert_chain,
			private_key: material.private_key,
			root_ca,
			sni: spec.sni.clone(),
			alpn: spec.alpn.clone(),
			subject_alt_names: spec.verify_subject_alt_names.clone(),
			insecure_skip_verify: false,
		}),
		errors,
	)
}

struct TlsMaterial {
	cert_chain: Option<String>,
	private_key: Option<String>,
	root_ca: Option<String>,
}

fn extract_material(
	spec: &BackendTlsSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> Result<TlsMaterial, PolicyError> {
	if let Some(secret_ref) = &spec.secret_ref {
		if spec.cert.is_some() || spec.key.is_some() || spec.root_ca.is_some() {
			return Err(PolicyError::Validation(
				"TLS material must come from either inline fields or a secretRef, not both".to_string(),
			));
		}
		let namespace = secret_ref.namespace.as_deref().unwrap_or(policy_namespace);
		let secret = resolver.secret(namespace, &secret_ref.name)?;
		let get = |key: &str| secret.data.get(key).filter(|v| !v.is_empty()).cloned();
		return Ok(TlsMaterial {
			cert_chain: get(SECRET_CERT_KEY),
			private_key: get(SECRET_KEY_KEY),
			root_ca: get(SECRET_CA_KEY),
		});
	}
	Ok(TlsMaterial {
		cert_chain: spec.cert.clone(),
		private_key: spec.key.clone(),
		root_ca: spec.root_ca.clone(),
	})
}

pub fn parse_cert(mut cert: &[u8]) -> anyhow::Result<Vec<CertificateDer<'static>>> {
	let mut reader = std::io::BufReader::new(Cursor::new(&mut cert));
	let parsed: Result<Vec<_>, _> = rustls_pemfile::read_all(&mut reader).collect();
	let certs = parsed?
		.into_iter()
		.map(|p| {
			let Item::X509Certificate(der) = p else {
				return Err(anyhow!("no certificate"));
			};
			Ok(der)
		})
		.collect::<Result<Vec<_>, _>>()?;
	if certs.is_empty() {
		return Err(anyhow!("no certificate"));
	}
	Ok(certs)
}

pub fn parse_key(mut key: &[u8]) -> anyhow::Result<PrivateKeyDer<'static>> {
	let mut reader = std::io::BufReader::new(Cursor::new(&mut key));
	let parsed = rustls_pemfile::read_one(&mut reader)?;
	match parsed.ok_or_else(|| anyhow!("no key"))? {
		Item::Pkcs8Key(c) => Ok(PrivateKeyDer::Pkcs8(c)),
		Item::Pkcs1Key(c) => Ok(PrivateKeyDer::Pkcs1(c)),
		Item::Sec1Key(c) => Ok(PrivateKeyDer::Sec1(c)),
		_ => Err(anyhow!("unsupported key")),
	}
}

/// Check that the certificate and key parse and actually belong together by building a
/// throwaway rustls config from them.
fn validate_pair(cert: &str, key: &str) -> anyhow::Result<()> {
	let cert_chain = parse_cert(cert.as_bytes())?;
	let private_key = parse_key(key.as_bytes())?;
	ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
		.with_safe_default_protocol_versions()
		.expect("default protocol versions are valid")
		.with_no_client_auth()
		.with_single_cert(cert_chain, private_key)?;
	Ok(())
}

#[cfg(test)]
#[path = "backendtls_tests.rs"]
mod tests;
