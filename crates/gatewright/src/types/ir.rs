//! Intermediate representation: resolved policy attachments and the effective
//! (post-merge) policy for one traffic-processing unit.

use crate::types::api::*;
use crate::*;

/// Position in the attachment hierarchy, most general first. Later (more specific)
/// levels override earlier ones during the merge fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum AttachmentLevel {
	Gateway,
	ListenerSet,
	Listener,
	Route,
	RouteRule,
	Backend,
}

/// One policy object's contribution to a unit, before merging.
#[derive(Debug, Clone)]
pub struct AttachedFragment {
	pub policy: Arc<PolicyObject>,
	pub level: AttachmentLevel,
	pub weight: i32,
}

impl AttachedFragment {
	pub fn name(&self) -> Strng {
		strng::format!("{}/{}", self.policy.metadata.namespace, self.policy.metadata.name)
	}
}

/// Identity of the unit being translated, with its full ancestry. The index matches
/// policy targets against every populated level.
#[derive(Debug, Clone, Default)]
pub struct AttachmentPoint {
	pub gateway: Option<ObjectKey>,
	pub listener_set: Option<ObjectKey>,
	pub listener: Option<ListenerName>,
	pub route: Option<ObjectKey>,
	pub rule: Option<RouteRuleName>,
	pub service: Option<ObjectKey>,
	pub backend: Option<ObjectKey>,
}

impl AttachmentPoint {
	pub fn listener(gateway: ObjectKey, listener_set: Option<ObjectKey>, listener: ListenerName) -> Self {
		AttachmentPoint {
			gateway: Some(gateway),
			listener_set,
			listener: Some(listener),
			..Default::default()
		}
	}

	pub fn route_rule(
		gateway: ObjectKey,
		listener: Option<ListenerName>,
		route: ObjectKey,
		rule: RouteRuleName,
	) -> Self {
		AttachmentPoint {
			gateway: Some(gateway),
			listener,
			route: Some(route),
			rule: Some(rule),
			..Default::default()
		}
	}

	pub fn backend(key: ObjectKey) -> Self {
		AttachmentPoint {
			backend: Some(key),
			..Default::default()
		}
	}

	pub fn service(key: ObjectKey) -> Self {
		AttachmentPoint {
			service: Some(key),
			..Default::default()
		}
	}
}

/// Effective per-request policy for one unit: each field holds the winning fragment's
/// value, or nothing if no fragment set it. Never a deep merge of two fragments.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveTrafficPolicy {
	pub transformation: Option<TransformationSpec>,
	pub ext_proc: Option<ExtProcSpec>,
	pub ext_auth: Option<ExtAuthSpec>,
	pub rate_limit: Option<RateLimitSpec>,
	pub cors: Option<CorsSpec>,
	pub csrf: Option<CsrfSpec>,
	pub header_modifiers: Option<HeaderModifiersSpec>,
	pub hostname_rewrite: Option<HostnameRewriteSpec>,
	pub url_rewrite: Option<UrlRewriteSpec>,
	pub compression: Option<CompressionSpec>,
	pub timeouts: Option<TimeoutSpec>,
	pub retry: Option<RetrySpec>,
	pub authorization: Option<AuthorizationSpec>,
	pub jwt_authentication: Option<JwtAuthenticationSpec>,
	pub basic_authentication: Option<BasicAuthenticationSpec>,
	pub api_key_authentication: Option<ApiKeyAuthenticationSpec>,
	pub direct_response: Option<DirectResponseSpec>,
}

/// The source fragment each effective field was taken from, keyed by field name.
/// Purely diagnostic; surfaced so operators can see which policy won a field.
pub type MergeOrigins = std::collections::BTreeMap<&'static str, Strng>;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveFrontendPolicy {
	pub http: Option<FrontendHttpSpec>,
	pub tls: Option<FrontendTlsSpec>,
	pub tcp: Option<FrontendTcpSpec>,
	pub access_log: Option<AccessLogSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBackendPolicy {
	pub http: Option<BackendHttpSpec>,
	pub tcp: Option<BackendTcpSpec>,
	pub tls: Option<BackendTlsSpec>,
	pub auth: Option<BackendAuthSpec>,
}
