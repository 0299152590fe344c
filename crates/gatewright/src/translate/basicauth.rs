//! Basic authentication over htpasswd credentials. The proxy only understands
//! salted-SHA1 hashes, so everything else is filtered out and reported.

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::BasicAuthConfig;
use crate::*;

const DEFAULT_SECRET_KEY: &str = ".htpasswd";
const SHA_PREFIX: &str = "{SHA}";
// 5 = len("{SHA}"), 28 = base64 length of a SHA1 digest.
const SHA_HASH_LEN: usize = 28 + 5;

pub fn translate(
	spec: &BasicAuthenticationSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<BasicAuthConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	let htpasswd = match (&spec.users[..], &spec.secret_ref) {
		([], None) => {
			errors.push(PolicyError::Validation(
				"basic authentication requires either users or secretRef".to_string(),
			));
			return (None, errors);
		},
		(users, None) => users.join("\n"),
		([], Some(secret_ref)) => match fetch_htpasswd(secret_ref, policy_namespace, resolver) {
			Ok(data) => data,
			Err(e) => {
				errors.push(e);
				return (None, errors);
			},
		},
		(_, Some(_)) => {
			errors.push(PolicyError::Validation(
				"basic authentication accepts only one of users and secretRef".to_string(),
			));
			return (None, errors);
		},
	};

	let (valid, invalid) = filter_sha_users(&htpasswd);
	if valid.is_empty() {
		errors.push(PolicyError::Validation(
			"basic authentication has no valid users with {SHA} hash format".to_string(),
		));
		return (None, errors);
	}
	if !invalid.is_empty() {
		errors.push(PolicyError::Conflict(format!(
			"basic authentication dropped {} user(s) with unsupported hash or duplicate username: {}",
			invalid.len(),
			invalid.join(", ")
		)));
	}

	(
		Some(BasicAuthConfig {
			users: valid.join("\n"),
			realm: spec.realm.clone(),
			mode: spec.mode,
		}),
		errors,
	)
}

fn fetch_htpasswd(
	secret_ref: &SecretRef,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> Result<String, PolicyError> {
	let namespace = secret_ref.namespace.as_deref().unwrap_or(policy_namespace);
	let secret = resolver.secret(namespace, &secret_ref.name)?;
	let key = secret_ref.key.as_deref().unwrap_or(DEFAULT_SECRET_KEY);
	let data = secret.data.get(key).ok_or_else(|| {
		PolicyError::Validation(format!(
			"secret {namespace}/{} does not contain key '{key}'",
			secret_ref.name
		))
	})?;
	if data.is_empty() {
		return Err(PolicyError::Validation(format!(
			"secret {namespace}/{} key '{key}' is empty",
			secret_ref.name
		)));
	}
	Ok(data.trim().to_string())
}

/// Filter htpasswd lines to entries the proxy accepts. Returns the surviving lines and
/// the usernames (or whole malformed lines) that were dropped. A username that appears
/// twice keeps its first valid line but is still reported, so the operator sees the
/// ambiguity.
pub fn filter_sha_users(htpasswd: &str) -> (Vec<String>, Vec<String>) {
	let mut valid = Vec::new();
	let mut seen = std::collections::HashSet::new();
	let mut invalid = Vec::new();

	for (i, line) in htpasswd.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let Some((username, hash)) = line.split_once(':') else {
			warn!("malformed htpasswd entry, missing colon (line {})", i + 1);
			invalid.push(line.to_string());
			continue;
		};

		// Only one colon-delimited split is allowed; a second colon in the value
		// invalidates the line.
		let valid_hash = !hash.contains(':')
			&& hash.starts_with(SHA_PREFIX)
			&& hash.len() == SHA_HASH_LEN;
		let duplicate = seen.contains(username);

		if valid_hash && !duplicate {
			valid.push(line.to_string());
			seen.insert(username.to_string());
		} else {
			warn!(user = username, duplicate, valid_hash, "invalid basic auth user");
			invalid.push(username.to_string());
		}
	}

	(valid, invalid)
}

#[cfg(test)]
#[path = "basicauth_tests.rs"]
mod tests;
