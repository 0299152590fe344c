use super::*;
use crate::types::api::*;
use crate::types::ir::*;
use crate::*;

fn traffic_fragment(ns: &str, name: &str, level: AttachmentLevel, traffic: TrafficSpec) -> AttachedFragment {
	AttachedFragment {
		policy: Arc::new(PolicyObject {
			metadata: ObjectMeta {
				name: strng::new(name),
				namespace: strng::new(ns),
				..Default::default()
			},
			spec: PolicySpec {
				target_refs: vec![],
				target_selectors: vec![],
				frontend: None,
				traffic: Some(traffic),
				backend: None,
			},
		}),
		level,
		weight: 0,
	}
}

fn timeout_spec(secs: u64) -> TimeoutSpec {
	TimeoutSpec {
		request: Some(Duration::from_secs(secs)),
	}
}

#[test]
fn test_overridable_last_setter_wins() {
	let fragments = vec![
		traffic_fragment(
			"default",
			"gw-policy",
			AttachmentLevel::Gateway,
			TrafficSpec {
				timeouts: Some(timeout_spec(30)),
				csrf: Some(CsrfSpec {
					additional_origins: vec![strng::new("https://a.example.com")],
				}),
				..Default::default()
			},
		),
		traffic_fragment(
			"default",
			"route-policy",
			AttachmentLevel::Route,
			TrafficSpec {
				timeouts: Some(timeout_spec(5)),
				..Default::default()
			},
		),
	];
	let res = merge_traffic(&EffectiveTrafficPolicy::default(), &fragments, MergeMode::Overridable);
	// timeouts set by both: the more specific fragment wins. csrf set only once.
	assert_eq!(res.policy.timeouts, Some(timeout_spec(5)));
	assert_eq!(
		res.policy.csrf.as_ref().unwrap().additional_origins,
		vec![strng::new("https://a.example.com")]
	);
	// Fields no fragment set remain unset.
	assert_eq!(res.policy.retry, None);
	assert_eq!(res.origins.get("timeouts"), Some(&strng::new("default/route-policy")));
	assert_eq!(res.origins.get("csrf"), Some(&strng::new("default/gw-policy")));
}

#[test]
fn test_overridable_replaces_caller_base() {
	let base = EffectiveTrafficPolicy {
		timeouts: Some(timeout_spec(60)),
		..Default::default()
	};
	let fragments = vec![traffic_fragment(
		"default",
		"p",
		AttachmentLevel::Route,
		TrafficSpec {
			timeouts: Some(timeout_spec(5)),
			..Default::default()
		},
	)];
	let res = merge_traffic(&base, &fragments, MergeMode::Overridable);
	assert_eq!(res.policy.timeouts, Some(timeout_spec(5)));
}

#[test]
fn test_augmented_never_touches_base_fields() {
	let base = EffectiveTrafficPolicy {
		timeouts: Some(timeout_spec(60)),
		..Default::default()
	};
	let fragments = vec![traffic_fragment(
		"default",
		"p",
		AttachmentLevel::Route,
		TrafficSpec {
			timeouts: Some(timeout_spec(5)),
			retry: Some(RetrySpec {
				attempts: Some(3),
				..Default::default()
			}),
			..Default::default()
		},
	)];
	let res = merge_traffic(&base, &fragments, MergeMode::Augmented);
	// Pre-populated field kept; unset field filled from the fragment.
	assert_eq!(res.policy.timeouts, Some(timeout_spec(60)));
	assert_eq!(res.policy.retry.as_ref().unwrap().attempts, Some(3));
	// The kept field has no fragment origin.
	assert_eq!(res.origins.get("timeouts"), None);
	assert_eq!(res.origins.get("retry"), Some(&strng::new("default/p")));
}

#[test]
fn test_field_level_merge_is_not_deep() {
	let fragments = vec![
		traffic_fragment(
			"default",
			"a",
			AttachmentLevel::Gateway,
			TrafficSpec {
				cors: Some(CorsSpec {
					allow_origins: vec![strng::new("https://a.example.com")],
					..Default::default()
				}),
				..Default::default()
			},
		),
		traffic_fragment(
			"default",
			"b",
			AttachmentLevel::Route,
			TrafficSpec {
				cors: Some(CorsSpec {
					allow_headers: vec![strng::new("x-custom")],
					..Default::default()
				}),
				..Default::default()
			},
		),
	];
	let res = merge_traffic(&EffectiveTrafficPolicy::default(), &fragments, MergeMode::Overridable);
	// The whole cors value comes from the winning fragment; nothing is blended in.
	let cors = res.policy.cors.unwrap();
	assert!(cors.allow_origins.is_empty());
	assert_eq!(cors.allow_headers, vec![strng::new("x-custom")]);
}

#[test]
fn test_merge_is_deterministic() {
	let fragments = vec![
		traffic_fragment(
			"default",
			"a",
			AttachmentLevel::Gateway,
			TrafficSpec {
				timeouts: Some(timeout_spec(1)),
				..Default::default()
			},
		),
		traffic_fragment(
			"default",
			"b",
			AttachmentLevel::Route,
			TrafficSpec {
				timeouts: Some(timeout_spec(2)),
				..Default::default()
			},
		),
	];
	let a = merge_traffic(&EffectiveTrafficPolicy::default(), &fragments, MergeMode::Overridable);
	let b = merge_traffic(&EffectiveTrafficPolicy::default(), &fragments, MergeMode::Overridable);
	assert_eq!(a, b);
}

#[test]
fn test_origin_namespace_lookup() {
	let fragments = vec![traffic_fragment(
		"auth-system",
		"jwt",
		AttachmentLevel::Gateway,
		TrafficSpec {
			timeouts: Some(timeout_spec(1)),
			..Default::default()
		},
	)];
	let res = merge_traffic(&EffectiveTrafficPolicy::default(), &fragments, MergeMode::Overridable);
	assert_eq!(res.origin_namespace("timeouts", "default"), "auth-system");
	assert_eq!(res.origin_namespace("retry", "default"), "default");
}
