//! API key authentication: keys live in secrets, either referenced directly or
//! selected by label. Each secret entry is a raw key or a `{key, metadata}` JSON
//! object.

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::{ApiKeyAuthConfig, ApiKeyCredential};
use crate::*;

pub fn translate(
	spec: &ApiKeyAuthenticationSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<ApiKeyAuthConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	let secrets = match (&spec.secret_ref, &spec.secret_selector) {
		(Some(r), None) => {
			let namespace = r.namespace.as_deref().unwrap_or(policy_namespace);
			match resolver.secret(namespace, &r.name) {
				Ok(s) => vec![s],
				Err(e) => {
					errors.push(e);
					return (None, errors);
				},
			}
		},
		(None, Some(sel)) => resolver.secrets_by_labels(policy_namespace, &sel.match_labels),
		_ => {
			errors.push(PolicyError::Validation(
				"api key authentication requires exactly one of secretRef and secretSelector".to_string(),
			));
			return (None, errors);
		},
	};

	let mut credentials = Vec::new();
	for secret in &secrets {
		for (entry, value) in &secret.data {
			match parse_entry(value) {
				Ok(cred) => credentials.push(cred),
				Err(e) => errors.push(PolicyError::Validation(format!(
					"secret {} contains invalid key {entry}: {e}",
					secret.metadata.name
				))),
			}
		}
	}
	// Selector iteration order is not guaranteed to be meaningful; sort for stable output.
	credentials.sort_by(|a, b| a.key.cmp(&b.key));

	if credentials.is_empty() {
		errors.push(PolicyError::Validation(
			"api key authentication resolved no credentials".to_string(),
		));
		return (None, errors);
	}

	(
		Some(ApiKeyAuthConfig {
			mode: spec.mode,
			credentials,
		}),
		errors,
	)
}

fn parse_entry(value: &str) -> anyhow::Result<ApiKeyCredential> {
	if !value.trim_start().starts_with('{') {
		// A raw key entry without metadata.
		return Ok(ApiKeyCredential {
			key: value.to_string(),
			metadata: None,
		});
	}
	#[apply(schema_de!)]
	struct Entry {
		key: String,
		#[serde(default)]
		metadata: Option<serde_json::Value>,
	}
	let e: Entry = serde_json::from_str(value)?;
	Ok(ApiKeyCredential {
		key: e.key,
		metadata: e.metadata,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::snapshot::Snapshot;

	fn secret_with(data: &[(&str, &str)]) -> Snapshot {
		let mut snap = Snapshot::default();
		snap.insert_secret(Secret {
			metadata: ObjectMeta {
				name: strng::new("api-keys"),
				namespace: strng::new("default"),
				..Default::default()
			},
			data: data
				.iter()
				.map(|(k, v)| (strng::new(k), v.to_string()))
				.collect(),
		});
		snap
	}

	fn spec() -> ApiKeyAuthenticationSpec {
		ApiKeyAuthenticationSpec {
			mode: AuthenticationMode::Strict,
			secret_ref: Some(SecretRef {
				name: strng::new("api-keys"),
				namespace: None,
				key: None,
			}),
			secret_selector: None,
		}
	}

	#[test]
	fn test_raw_and_structured_entries() {
		let snap = secret_with(&[
			("client1", r#"{"key": "k-123", "metadata": {"group": "sales"}}"#),
			("client2", "k-456"),
		]);
		let (cfg, errors) = translate(&spec(), "default", &snap);
		assert!(errors.is_empty(), "{errors:?}");
		let cfg = cfg.unwrap();
		assert_eq!(cfg.credentials.len(), 2);
		assert_eq!(cfg.credentials[0].key, "k-123");
		assert_eq!(
			cfg.credentials[0].metadata.as_ref().unwrap()["group"],
			serde_json::json!("sales")
		);
		assert_eq!(cfg.credentials[1].key, "k-456");
		assert_eq!(cfg.credentials[1].metadata, None);
	}

	#[test]
	fn test_invalid_entry_is_reported_not_fatal() {
		let snap = secret_with(&[("bad", r#"{"metadata": {}}"#), ("good", "k-1")]);
		let (cfg, errors) = translate(&spec(), "default", &snap);
		assert_eq!(errors.len(), 1);
		assert_eq!(cfg.unwrap().credentials.len(), 1);
	}

	#[test]
	fn test_missing_secret_is_reference_error() {
		let snap = Snapshot::default();
		let (cfg, errors) = translate(&spec(), "default", &snap);
		assert!(cfg.is_none());
		assert!(errors[0].retryable());
	}
}
