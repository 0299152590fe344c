//! Rate limiting: local token buckets held by the proxy itself, and global
//! descriptor-based limits enforced by an external service. The two are independent
//! and may coexist on one route.

use crate::snapshot::Resolver;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::wire::*;
use crate::*;

pub fn translate_local(
	specs: &[LocalRateLimitSpec],
) -> (Option<LocalRateLimitConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let mut limits = Vec::new();
	for spec in specs {
		let (cost, per_fill) = match (spec.requests, spec.tokens) {
			(Some(r), None) => (RateLimitCost::Requests, r),
			(None, Some(t)) => (RateLimitCost::Tokens, t),
			_ => {
				errors.push(PolicyError::Validation(
					"local rate limit requires exactly one of requests and tokens".to_string(),
				));
				continue;
			},
		};
		if per_fill == 0 {
			errors.push(PolicyError::Validation(
				"local rate limit must allow at least one request per unit".to_string(),
			));
			continue;
		}
		limits.push(TokenBucketConfig {
			cost,
			max_tokens: u64::from(per_fill) + u64::from(spec.burst.unwrap_or(0)),
			tokens_per_fill: u64::from(per_fill),
			fill_interval: spec.unit.as_duration(),
		});
	}
	if limits.is_empty() {
		return (None, errors);
	}
	(Some(LocalRateLimitConfig { limits }), errors)
}

pub fn translate_global(
	spec: &GlobalRateLimitSpec,
	policy_namespace: &str,
	resolver: &dyn Resolver,
) -> (Option<GlobalRateLimitConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let cluster = match resolver.backend_cluster(policy_namespace, &spec.backend_ref) {
		Ok(c) => c,
		Err(e) => {
			errors.push(e);
			return (None, errors);
		},
	};

	let mut descriptors = Vec::new();
	for d in &spec.descriptors {
		if d.entries.is_empty() {
			errors.push(PolicyError::Validation(
				"rate limit descriptor requires at least one entry".to_string(),
			));
			continue;
		}
		let mut entries = Vec::new();
		for e in &d.entries {
			if e.expression.is_empty() {
				errors.push(PolicyError::Validation(format!(
					"rate limit descriptor entry {} has an empty expression",
					e.name
				)));
				continue;
			}
			entries.push(DescriptorEntryConfig {
				name: e.name.clone(),
				expression: e.expression.clone(),
			});
		}
		if !entries.is_empty() {
			descriptors.push(DescriptorConfig {
				entries,
				unit: d.unit,
			});
		}
	}
	if descriptors.is_empty() {
		errors.push(PolicyError::Validation(
			"global rate limit requires at least one descriptor".to_string(),
		));
		return (None, errors);
	}

	(
		Some(GlobalRateLimitConfig {
			domain: spec.domain.clone(),
			cluster,
			descriptors,
		}),
		errors,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::snapshot::Snapshot;

	#[test]
	fn test_local_bucket_with_burst() {
		let specs = vec![LocalRateLimitSpec {
			requests: Some(10),
			tokens: None,
			unit: RateLimitWindow::Minutes,
			burst: Some(5),
		}];
		let (cfg, errors) = translate_local(&specs);
		assert!(errors.is_empty());
		let cfg = cfg.unwrap();
		assert_eq!(cfg.limits.len(), 1);
		assert_eq!(cfg.limits[0].cost, RateLimitCost::Requests);
		assert_eq!(cfg.limits[0].max_tokens, 15);
		assert_eq!(cfg.limits[0].tokens_per_fill, 10);
		assert_eq!(cfg.limits[0].fill_interval, Duration::from_secs(60));
	}

	#[test]
	fn test_local_requires_exactly_one_cost() {
		let both = vec![LocalRateLimitSpec {
			requests: Some(10),
			tokens: Some(10),
			unit: RateLimitWindow::Seconds,
			burst: None,
		}];
		let (cfg, errors) = translate_local(&both);
		assert!(cfg.is_none());
		assert_eq!(errors.len(), 1);

		let neither = vec![LocalRateLimitSpec {
			requests: None,
			tokens: None,
			unit: RateLimitWindow::Seconds,
			burst: None,
		}];
		let (cfg, errors) = translate_local(&neither);
		assert!(cfg.is_none());
		assert_eq!(errors.len(), 1);
	}

	#[test]
	fn test_global_resolves_cluster() {
		let mut snap = Snapshot::default();
		snap.insert_service(ServiceObject {
			metadata: ObjectMeta {
				name: strng::new("ratelimit"),
				namespace: strng::new("infra"),
				..Default::default()
			},
			ports: vec![8081],
		});
		let spec = GlobalRateLimitSpec {
			backend_ref: BackendRef {
				kind: None,
				name: strng::new("ratelimit"),
				namespace: Some(strng::new("infra")),
				port: Some(8081),
			},
			domain: strng::new("api"),
			descriptors: vec![RateLimitDescriptorSpec {
				entries: vec![RateLimitDescriptorEntry {
					name: strng::new("client-ip"),
					expression: strng::new("source.address"),
				}],
				unit: None,
			}],
		};
		let (cfg, errors) = translate_global(&spec, "default", &snap);
		assert!(errors.is_empty(), "{errors:?}");
		let cfg = cfg.unwrap();
		assert_eq!(cfg.cluster, strng::new("service/infra/ratelimit:8081"));
		assert_eq!(cfg.domain, strng::new("api"));
		assert_eq!(cfg.descriptors[0].entries[0].name, strng::new("client-ip"));
	}
}
