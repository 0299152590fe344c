//! Authorization rule sets (allow/deny CEL expressions) plus the external
//! authorization and processing hooks.

use std::collections::BTreeMap;

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::*;
use crate::*;

pub fn translate_rules(spec: &AuthorizationSpec) -> (Option<RbacConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let keep = |rules: &[CelExpression], action: &str, errors: &mut Vec<PolicyError>| {
		rules
			.iter()
			.filter(|r| {
				if r.trim().is_empty() {
					errors.push(PolicyError::Validation(format!(
						"authorization: empty {action} expression"
					)));
					false
				} else {
					true
				}
			})
			.cloned()
			.collect_vec()
	};
	let allow = keep(&spec.allow, "allow", &mut errors);
	let deny = keep(&spec.deny, "deny", &mut errors);
	if allow.is_empty() && deny.is_empty() {
		errors.push(PolicyError::Validation(
			"authorization requires at least one rule".to_string(),
		));
		return (None, errors);
	}
	(Some(RbacConfig { allow, deny }), errors)
}

pub fn translate_ext_auth(
	spec: &ExtAuthSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<ExtAuthzConfig>, Vec<PolicyError>) {
	let cluster = match resolver.backend_cluster(policy_namespace, &spec.backend_ref) {
		Ok(c) => c,
		Err(e) => return (None, vec![e]),
	};
	let failure_mode = match (spec.fail_open, spec.status_on_error) {
		(Some(true), _) => FailureModeConfig::Allow,
		(_, Some(code)) => FailureModeConfig::DenyWithStatus(code),
		_ => FailureModeConfig::Deny,
	};
	(
		Some(ExtAuthzConfig {
			cluster,
			context: spec
				.context
				.clone()
				.unwrap_or_default()
				.into_iter()
				.collect::<BTreeMap<_, _>>(),
			failure_mode,
			include_request_headers: spec.include_request_headers.clone(),
			include_request_body: spec.forward_body.as_ref().map(|b| BodyOptionsConfig {
				max_request_bytes: b.max_size,
				// The partial-message default matches what upstream proxies expect.
				allow_partial_message: true,
				pack_as_bytes: false,
			}),
		}),
		vec![],
	)
}

pub fn translate_ext_proc(
	spec: &ExtProcSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<ExtProcConfig>, Vec<PolicyError>) {
	match resolver.backend_cluster(policy_namespace, &spec.backend_ref) {
		Ok(cluster) => (
			Some(ExtProcConfig {
				cluster,
				failure_mode: spec.failure_mode,
			}),
			vec![],
		),
		Err(e) => (None, vec![e]),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::snapshot::Snapshot;

	fn snap_with_service() -> Snapshot {
		let mut snap = Snapshot::default();
		snap.insert_service(ServiceObject {
			metadata: ObjectMeta {
				name: strng::new("authz"),
				namespace: strng::new("default"),
				..Default::default()
			},
			ports: vec![9000],
		});
		snap
	}

	#[test]
	fn test_rules_require_content() {
		let (cfg, errors) = translate_rules(&AuthorizationSpec::default());
		assert!(cfg.is_none());
		assert_eq!(errors.len(), 1);

		let spec = AuthorizationSpec {
			allow: vec![strng::new("jwt.sub == 'admin'")],
			deny: vec![strng::new("  ")],
		};
		let (cfg, errors) = translate_rules(&spec);
		assert_eq!(errors.len(), 1);
		let cfg = cfg.unwrap();
		assert_eq!(cfg.allow.len(), 1);
		assert!(cfg.deny.is_empty());
	}

	#[test]
	fn test_ext_auth_failure_modes() {
		let snap = snap_with_service();
		let base = ExtAuthSpec {
			backend_ref: BackendRef {
				kind: None,
				name: strng::new("authz"),
				namespace: None,
				port: Some(9000),
			},
			context: None,
			fail_open: None,
			status_on_error: None,
			include_request_headers: vec![],
			forward_body: None,
		};

		let (cfg, _) = translate_ext_auth(&base, "default", &snap);
		assert_eq!(cfg.unwrap().failure_mode, FailureModeConfig::Deny);

		let open = ExtAuthSpec {
			fail_open: Some(true),
			..base.clone()
		};
		let (cfg, _) = translate_ext_auth(&open, "default", &snap);
		assert_eq!(cfg.unwrap().failure_mode, FailureModeConfig::Allow);

		let status = ExtAuthSpec {
			fail_open: Some(false),
			status_on_error: Some(503),
			..base
		};
		let (cfg, _) = translate_ext_auth(&status, "default", &snap);
		assert_eq!(cfg.unwrap().failure_mode, FailureModeConfig::DenyWithStatus(503));
	}

	#[test]
	fn test_ext_proc_missing_backend() {
		let spec = ExtProcSpec {
			backend_ref: BackendRef {
				kind: None,
				name: strng::new("missing"),
				namespace: None,
				port: None,
			},
			failure_mode: ExtFailureMode::FailClosed,
		};
		let (cfg, errors) = translate_ext_proc(&spec, "default", &Snapshot::default());
		assert!(cfg.is_none());
		assert!(errors[0].retryable());
	}
}
