//! JWT authentication: one wire provider per configured provider, with the key
//! material resolved at translation time (inline or config object) or referenced for
//! the proxy to fetch (remote JWKS).

use std::collections::BTreeMap;

use crate::jwks;
use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::*;
use crate::*;

/// Metadata key under which the proxy stores the validated payload.
pub const PAYLOAD_IN_METADATA: &str = "payload";
/// Fixed key under which a config object carries inline key material.
pub const CONFIG_JWKS_KEY: &str = "jwks";

const REMOTE_JWKS_TIMEOUT: Duration = Duration::from_secs(5);
/// Remote JWKS cache duration: default, and also the enforced floor.
const MIN_CACHE_DURATION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct JwtTranslation {
	pub providers: BTreeMap<Strng, JwtProviderConfig>,
	pub requirement_name: Strng,
	pub requirement: JwtRequirement,
	/// Claim-to-header mappings can change later routing decisions.
	pub clear_route_cache: bool,
}

/// Globally unique wire provider name.
pub fn provider_name(policy: &str, namespace: &str, provider: &str) -> Strng {
	strng::format!("{policy}_{namespace}_{provider}")
}

pub fn translate(
	spec: &JwtAuthenticationSpec,
	policy_namespace: &str,
	policy_name: &str,
	resolver: &dyn Resolver,
) -> (Option<JwtTranslation>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let mut providers = BTreeMap::new();
	let mut clear_route_cache = false;

	for p in &spec.providers {
		match translate_provider(p, policy_namespace, resolver) {
			Ok(cfg) => {
				clear_route_cache |= cfg.clear_route_cache;
				providers.insert(provider_name(policy_name, policy_namespace, &p.name), cfg);
			},
			Err(e) => errors.push(e),
		}
	}

	if providers.is_empty() {
		if errors.is_empty() {
			errors.push(PolicyError::Validation(
				"jwt authentication requires at least one provider".to_string(),
			));
		}
		return (None, errors);
	}

	// BTreeMap iteration is already sorted by provider name, which keeps the
	// requirement deterministic.
	let mut reqs = providers
		.keys()
		.map(|name| JwtRequirement::Provider(name.clone()))
		.collect_vec();
	let requirement = if reqs.len() == 1 {
		reqs.remove(0)
	} else {
		JwtRequirement::Any(reqs)
	};
	let requirement = match spec.mode {
		AuthenticationMode::Strict => requirement,
		AuthenticationMode::Optional => JwtRequirement::AllowMissing(Box::new(requirement)),
		AuthenticationMode::Permissive => JwtRequirement::AllowMissingOrFailed(Box::new(requirement)),
	};

	(
		Some(JwtTranslation {
			providers,
			requirement_name: strng::format!("{policy_name}_{policy_namespace}_requirements"),
			requirement,
			clear_route_cache,
		}),
		errors,
	)
}

fn translate_provider(
	p: &JwtProviderSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> Result<JwtProviderConfig, PolicyError> {
	let jwks = match &p.jwks {
		JwksSpec::Inline(inline) => local_jwks(inline)
			.map_err(|e| PolicyError::Validation(format!("provider {}: {e}", p.name)))?,
		JwksSpec::ConfigRef { name } => {
			let cm = resolver.config(policy_namespace, name)?;
			let data = cm.data.get(CONFIG_JWKS_KEY).filter(|d| !d.is_empty()).ok_or_else(|| {
				PolicyError::Validation(format!(
					"provider {}: config object {name} has no '{CONFIG_JWKS_KEY}' key",
					p.name
				))
			})?;
			local_jwks(data).map_err(|e| PolicyError::Validation(format!("provider {}: {e}", p.name)))?
		},
		JwksSpec::Remote {
			url,
			backend_ref,
			cache_duration,
		} => {
			let cluster = resolver.backend_cluster(policy_namespace, backend_ref)?;
			JwksSourceConfig::Remote {
				url: url.clone(),
				cluster,
				timeout: REMOTE_JWKS_TIMEOUT,
				cache_duration: cache_duration.unwrap_or(MIN_CACHE_DURATION).max(MIN_CACHE_DURATION),
			}
		},
	};

	let (from_headers, from_params) = match &p.token_source {
		None => (vec![], vec![]),
		Some(TokenSourceSpec::Header { name, prefix }) => (
			vec![JwtHeaderSource {
				name: name.clone(),
				value_prefix: prefix.clone(),
			}],
			vec![],
		),
		Some(TokenSourceSpec::QueryParameter(q)) => (vec![], vec![q.clone()]),
	};

	let claim_to_headers = p
		.claims_to_headers
		.iter()
		.map(|c| JwtClaimToHeader {
			claim: c.claim.clone(),
			header: c.header.clone(),
		})
		.collect_vec();

	Ok(JwtProviderConfig {
		issuer: p.issuer.clone(),
		audiences: p.audiences.clone(),
		payload_in_metadata: strng::new(PAYLOAD_IN_METADATA),
		clear_route_cache: !claim_to_headers.is_empty(),
		claim_to_headers,
		forward: p.keep_token,
		from_headers,
		from_params,
		jwks,
	})
}

fn local_jwks(inline: &str) -> anyhow::Result<JwksSourceConfig> {
	let keyset = jwks::translate_key(inline)?;
	Ok(JwksSourceConfig::LocalInline {
		keyset: serde_json::to_string(&keyset)?,
	})
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
