//! Source object model: the declarative policy objects and the target resources they
//! attach to, as handed to us by the controller's object cache.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::anyhow;

use crate::*;

/// Annotation carrying the policy precedence weight. Higher weight wins among policies
/// attached at the same specificity level; negative values are allowed.
pub const POLICY_WEIGHT_ANNOTATION: &str = "gatewright.dev/policy-weight";

pub type PolicyName = Strng;
pub type GatewayName = Strng;
pub type ListenerName = Strng;
pub type RouteName = Strng;
pub type RouteRuleName = Strng;
pub type BackendName = Strng;
pub type CelExpression = Strng;

/// `namespace/name` pair identifying one namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
	pub namespace: Strng,
	pub name: Strng,
}

impl ObjectKey {
	pub fn new(namespace: impl AsRef<str>, name: impl AsRef<str>) -> Self {
		ObjectKey {
			namespace: strng::new(namespace),
			name: strng::new(name),
		}
	}
}

impl Display for ObjectKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

impl FromStr for ObjectKey {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let Some((namespace, name)) = s.split_once('/') else {
			return Err(anyhow!("invalid object key: {s}"));
		};
		Ok(ObjectKey::new(namespace, name))
	}
}

impl serde::Serialize for ObjectKey {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		ser_display(self, serializer)
	}
}

impl<'de> serde::Deserialize<'de> for ObjectKey {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		de_parse(deserializer)
	}
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct ObjectMeta {
	pub name: Strng,
	pub namespace: Strng,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub labels: BTreeMap<Strng, Strng>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub annotations: BTreeMap<Strng, Strng>,
}

impl ObjectMeta {
	pub fn key(&self) -> ObjectKey {
		ObjectKey {
			namespace: self.namespace.clone(),
			name: self.name.clone(),
		}
	}

	/// Parse the precedence weight annotation. Unset means weight 0.
	pub fn precedence_weight(&self) -> anyhow::Result<i32> {
		let Some(raw) = self.annotations.get(POLICY_WEIGHT_ANNOTATION) else {
			return Ok(0);
		};
		raw
			.parse::<i32>()
			.map_err(|_| anyhow!("invalid value for annotation {POLICY_WEIGHT_ANNOTATION}: {raw}; must be an integer"))
	}

	pub fn matches_labels(&self, selector: &BTreeMap<Strng, Strng>) -> bool {
		selector
			.iter()
			.all(|(k, v)| self.labels.get(k) == Some(v))
	}
}

/// The resource kinds a policy may attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TargetKind {
	Gateway,
	HTTPRoute,
	XListenerSet,
	Service,
	Backend,
}

impl TargetKind {
	/// Resolve a `(group, kind)` pair against the attachment allow-list.
	pub fn from_group_kind(group: &str, kind: &str) -> Option<TargetKind> {
		match (group, kind) {
			("gateway.networking.k8s.io", "Gateway") => Some(TargetKind::Gateway),
			("gateway.networking.k8s.io", "HTTPRoute") => Some(TargetKind::HTTPRoute),
			("gateway.networking.x-k8s.io", "XListenerSet") => Some(TargetKind::XListenerSet),
			("" | "core", "Service") => Some(TargetKind::Service),
			("gateway.gatewright.dev", "Backend") => Some(TargetKind::Backend),
			_ => None,
		}
	}
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct TargetRef {
	#[serde(default)]
	pub group: Strng,
	pub kind: Strng,
	pub name: Strng,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub section_name: Option<Strng>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct TargetSelector {
	#[serde(default)]
	pub group: Strng,
	pub kind: Strng,
	pub match_labels: BTreeMap<Strng, Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub section_name: Option<Strng>,
}

#[apply(schema!)]
pub struct PolicyObject {
	pub metadata: ObjectMeta,
	pub spec: PolicySpec,
}

#[apply(schema!)]
pub struct PolicySpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub target_refs: Vec<TargetRef>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub target_selectors: Vec<TargetSelector>,
	/// Inbound connection handling. May only target a Gateway, with no section.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frontend: Option<FrontendSpec>,
	/// Per-request processing.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub traffic: Option<TrafficSpec>,
	/// Outbound connection handling.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub backend: Option<BackendSpec>,
}

// ===== frontend =====

#[apply(schema!)]
#[derive(Default, PartialEq)]
pub struct FrontendSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http: Option<FrontendHttpSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tls: Option<FrontendTlsSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tcp: Option<FrontendTcpSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_log: Option<AccessLogSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct FrontendHttpSpec {
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub idle_timeout: Option<Duration>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_concurrent_streams: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub per_connection_buffer_limit_bytes: Option<u32>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct FrontendTlsSpec {
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub handshake_timeout: Option<Duration>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub alpn: Vec<String>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct FrontendTcpSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<KeepaliveSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct KeepaliveSpec {
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub time: Option<Duration>,
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub interval: Option<Duration>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retries: Option<u32>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct AccessLogSpec {
	/// CEL expression; an entry is emitted only when it evaluates to true.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filter: Option<CelExpression>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attributes: Option<AttributesSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct AttributesSpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub remove: Vec<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub add: Vec<AttributeAdd>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct AttributeAdd {
	pub name: Strng,
	pub expression: CelExpression,
}

// ===== traffic =====

#[apply(schema!)]
#[derive(Copy, Default, PartialEq, Eq)]
pub enum PolicyPhase {
	/// Runs before the routing decision; only policies that can influence routing are
	/// allowed here, and only Gateway/XListenerSet targets.
	PreRouting,
	#[default]
	PostRouting,
}

#[apply(schema!)]
#[derive(Default, PartialEq)]
pub struct TrafficSpec {
	#[serde(default)]
	pub phase: PolicyPhase,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transformation: Option<TransformationSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ext_proc: Option<ExtProcSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ext_auth: Option<ExtAuthSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rate_limit: Option<RateLimitSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cors: Option<CorsSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub csrf: Option<CsrfSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub header_modifiers: Option<HeaderModifiersSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hostname_rewrite: Option<HostnameRewriteSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url_rewrite: Option<UrlRewriteSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compression: Option<CompressionSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeouts: Option<TimeoutSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retry: Option<RetrySpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub authorization: Option<AuthorizationSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jwt_authentication: Option<JwtAuthenticationSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub basic_authentication: Option<BasicAuthenticationSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_key_authentication: Option<ApiKeyAuthenticationSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub direct_response: Option<DirectResponseSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct TransformationSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request: Option<TransformSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<TransformSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct TransformSpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub set: Vec<HeaderTransform>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub add: Vec<HeaderTransform>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub remove: Vec<Strng>,
	/// CEL expression producing the new body; unset leaves the body untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<CelExpression>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct HeaderTransform {
	pub name: Strng,
	pub expression: CelExpression,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct ExtProcSpec {
	pub backend_ref: BackendRef,
	#[serde(default)]
	pub failure_mode: ExtFailureMode,
}

#[apply(schema!)]
#[derive(Copy, Default, PartialEq, Eq)]
pub enum ExtFailureMode {
	#[default]
	FailClosed,
	FailOpen,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct ExtAuthSpec {
	pub backend_ref: BackendRef,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<BTreeMap<String, String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fail_open: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status_on_error: Option<u16>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub include_request_headers: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub forward_body: Option<ExtAuthBodySpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct ExtAuthBodySpec {
	pub max_size: u32,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct RateLimitSpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub local: Vec<LocalRateLimitSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub global: Option<GlobalRateLimitSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct LocalRateLimitSpec {
	/// Allowed HTTP requests per unit. Exactly one of requests/tokens must be set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub requests: Option<u32>,
	/// Allowed LLM tokens per unit. Exactly one of requests/tokens must be set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tokens: Option<u32>,
	pub unit: RateLimitWindow,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub burst: Option<u32>,
}

#[apply(schema!)]
#[derive(Copy, PartialEq, Eq)]
pub enum RateLimitWindow {
	Seconds,
	Minutes,
	Hours,
}

impl RateLimitWindow {
	pub fn as_duration(&self) -> Duration {
		match self {
			RateLimitWindow::Seconds => Duration::from_secs(1),
			RateLimitWindow::Minutes => Duration::from_secs(60),
			RateLimitWindow::Hours => Duration::from_secs(3600),
		}
	}
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct GlobalRateLimitSpec {
	pub backend_ref: BackendRef,
	/// Arbitrary string letting one rate limit server distinguish applications.
	pub domain: Strng,
	pub descriptors: Vec<RateLimitDescriptorSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct RateLimitDescriptorSpec {
	pub entries: Vec<RateLimitDescriptorEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unit: Option<RateLimitCost>,
}

#[apply(schema!)]
#[derive(Copy, PartialEq, Eq)]
pub enum RateLimitCost {
	Requests,
	Tokens,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct RateLimitDescriptorEntry {
	pub name: Strng,
	pub expression: CelExpression,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct CorsSpec {
	#[serde(default)]
	pub allow_credentials: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub allow_headers: Vec<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub allow_methods: Vec<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub allow_origins: Vec<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub expose_headers: Vec<Strng>,
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub max_age: Option<Duration>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct CsrfSpec {
	/// Origins trusted in addition to the destination origin, `<scheme>://<host>(:<port>)`.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub additional_origins: Vec<Strng>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct HeaderModifiersSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request: Option<HeaderModifierSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<HeaderModifierSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct HeaderModifierSpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub add: Vec<HeaderValueSpec>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub set: Vec<HeaderValueSpec>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub remove: Vec<Strng>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct HeaderValueSpec {
	pub name: Strng,
	pub value: Strng,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct HostnameRewriteSpec {
	pub mode: HostnameRewriteMode,
}

#[apply(schema!)]
#[derive(Copy, PartialEq, Eq)]
pub enum HostnameRewriteMode {
	/// Set the Host header from the destination.
	Auto,
	/// Pass the original Host header through.
	None,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub enum UrlRewriteSpec {
	/// Replace the matched path prefix with the given value.
	PrefixReplace(Strng),
	/// Arbitrary pattern/substitution rewrite.
	Pattern { pattern: String, substitution: String },
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct CompressionSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response_compression: Option<ToggleSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_decompression: Option<ToggleSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct ToggleSpec {
	/// Present means off; the feature is on by default once the section is configured.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub disable: Option<Disabled>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct Disabled {}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct TimeoutSpec {
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub request: Option<Duration>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct RetrySpec {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub codes: Vec<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attempts: Option<u32>,
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub backoff: Option<Duration>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct AuthorizationSpec {
	/// CEL expressions; a request is allowed if any allow rule matches and no deny rule does.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub allow: Vec<CelExpression>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub deny: Vec<CelExpression>,
}

#[apply(schema!)]
#[derive(Copy, Default, PartialEq, Eq)]
pub enum AuthenticationMode {
	/// A valid credential must be present.
	#[default]
	Strict,
	/// Validate a credential when present; absent credentials pass through.
	Optional,
	/// Never reject; validated data is only made available to later steps.
	Permissive,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct JwtAuthenticationSpec {
	#[serde(default)]
	pub mode: AuthenticationMode,
	pub providers: Vec<JwtProviderSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct JwtProviderSpec {
	pub name: Strng,
	pub issuer: Strng,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub audiences: Vec<String>,
	pub jwks: JwksSpec,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub claims_to_headers: Vec<ClaimToHeader>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_source: Option<TokenSourceSpec>,
	/// Forward the validated token to the backend.
	#[serde(default)]
	pub keep_token: bool,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct ClaimToHeader {
	pub claim: Strng,
	pub header: Strng,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub enum TokenSourceSpec {
	Header {
		name: Strng,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		prefix: Option<Strng>,
	},
	QueryParameter(Strng),
}

/// Where the JSON Web Key Set comes from. Exactly one source; modeled as a sum so every
/// translator matches exhaustively.
#[apply(schema!)]
#[derive(PartialEq, Eq)]
#[serde(rename_all_fields = "camelCase")]
pub enum JwksSpec {
	/// Inline key material: a PEM public key, a single JWK, or a JWK set.
	Inline(String),
	/// A config object holding the key material under the fixed `jwks` key.
	ConfigRef { name: Strng },
	/// Fetched by the proxy at runtime; we only emit the reference and cache hint.
	Remote {
		url: Strng,
		backend_ref: BackendRef,
		#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
		cache_duration: Option<Duration>,
	},
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct BasicAuthenticationSpec {
	#[serde(default)]
	pub mode: AuthenticationMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub realm: Option<String>,
	/// Inline htpasswd lines. Exactly one of users/secretRef must be set.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub users: Vec<String>,
	/// Secret holding the htpasswd file under the `.htpasswd` key (or an explicit key).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret_ref: Option<SecretRef>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct ApiKeyAuthenticationSpec {
	#[serde(default)]
	pub mode: AuthenticationMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret_ref: Option<SecretRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret_selector: Option<SecretSelector>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct SecretSelector {
	pub match_labels: BTreeMap<Strng, Strng>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct DirectResponseSpec {
	pub status: u16,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
}

// ===== backend (policy section) =====

#[apply(schema!)]
#[derive(Default, PartialEq)]
pub struct BackendSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http: Option<BackendHttpSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tcp: Option<BackendTcpSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tls: Option<BackendTlsSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth: Option<BackendAuthSpec>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct BackendHttpSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<HttpVersion>,
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub pool_idle_timeout: Option<Duration>,
}

#[apply(schema!)]
#[derive(Copy, PartialEq, Eq)]
pub enum HttpVersion {
	#[serde(rename = "HTTP1")]
	Http1,
	#[serde(rename = "HTTP2")]
	Http2,
	Auto,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct BackendTcpSpec {
	#[serde(default, with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub connect_timeout: Option<Duration>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<KeepaliveSpec>,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct BackendTlsSpec {
	/// Inline client certificate chain (PEM). Requires `key`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cert: Option<String>,
	/// Inline client private key (PEM). Requires `cert`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	/// Inline root CA bundle (PEM) used to validate the backend.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root_ca: Option<String>,
	/// Secret carrying tls.crt/tls.key/ca.crt instead of inline material.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret_ref: Option<SecretRef>,
	/// Validate against the system trust store instead of an explicit root CA.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub well_known_ca_certificates: Option<WellKnownCa>,
	#[serde(default)]
	pub insecure_skip_verify: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sni: Option<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub verify_subject_alt_names: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub alpn: Vec<String>,
}

#[apply(schema!)]
#[derive(Copy, PartialEq, Eq)]
pub enum WellKnownCa {
	System,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub enum BackendAuthSpec {
	/// Inline key used as the Authorization header value. Least secure; prefer a secret.
	Key(String),
	/// Secret storing the value under the `Authorization` key.
	SecretRef(SecretRef),
	/// Pass through the inbound Authorization header.
	Passthrough {},
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct SecretRef {
	pub name: Strng,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<Strng>,
}

/// Reference to a backend service used by a policy (ext authz/proc, remote JWKS,
/// global rate limit).
#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct BackendRef {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<Strng>,
	pub name: Strng,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
}

// ===== target resources =====

#[apply(schema!)]
pub struct Gateway {
	pub metadata: ObjectMeta,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub listeners: Vec<ListenerInfo>,
}

#[apply(schema!)]
pub struct ListenerInfo {
	pub name: ListenerName,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hostname: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
}

/// A listener extension resource: contributes extra listeners to a parent gateway.
#[apply(schema!)]
pub struct ListenerSet {
	pub metadata: ObjectMeta,
	pub gateway: ObjectKey,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub listeners: Vec<ListenerInfo>,
}

#[apply(schema!)]
pub struct HttpRoute {
	pub metadata: ObjectMeta,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub hostnames: Vec<Strng>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub parent_gateways: Vec<ObjectKey>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub rules: Vec<RouteRuleInfo>,
}

#[apply(schema!)]
#[derive(Default)]
pub struct RouteRuleInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<RouteRuleName>,
	/// The PathPrefix match of this rule, when it has one. Prefix-replace rewrites are
	/// compiled against it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path_prefix: Option<Strng>,
	/// Builtin route filters: these are part of the route spec itself and take
	/// precedence over attached policy for the fields they set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url_rewrite: Option<UrlRewriteSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_header_modifier: Option<HeaderModifierSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response_header_modifier: Option<HeaderModifierSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeouts: Option<TimeoutSpec>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub retry: Option<RetrySpec>,
}

impl RouteRuleInfo {
	pub fn rule_name(&self, idx: usize) -> Strng {
		self
			.name
			.clone()
			.unwrap_or_else(|| strng::format!("rule{}", idx))
	}
}

#[apply(schema!)]
pub struct ServiceObject {
	pub metadata: ObjectMeta,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub ports: Vec<u16>,
}

#[apply(schema!)]
pub struct BackendObject {
	pub metadata: ObjectMeta,
	pub spec: BackendType,
}

/// The supported backend shapes. Tagged; every translator matches exhaustively.
#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub enum BackendType {
	Static(StaticBackend),
	DynamicForwardProxy(DynamicForwardProxyBackend),
	CloudFunction(CloudFunctionBackend),
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct StaticBackend {
	pub hosts: Vec<StaticHost>,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct StaticHost {
	pub host: Strng,
	pub port: u16,
}

#[apply(schema!)]
#[derive(Default, PartialEq, Eq)]
pub struct DynamicForwardProxyBackend {
	/// Wrap upstream connections in TLS, validated against the system trust store.
	#[serde(default)]
	pub enable_tls: bool,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct CloudFunctionBackend {
	pub region: Strng,
	pub function: Strng,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qualifier: Option<Strng>,
	#[serde(default)]
	pub invocation_mode: InvocationMode,
	/// Host override, e.g. for local emulators. Disables TLS when set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub endpoint: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth: Option<CloudFunctionAuth>,
	#[serde(default)]
	pub payload_transform: PayloadTransform,
}

#[apply(schema!)]
#[derive(Copy, Default, PartialEq, Eq)]
pub enum InvocationMode {
	#[default]
	Sync,
	Async,
}

#[apply(schema!)]
#[derive(Copy, Default, PartialEq, Eq)]
pub enum PayloadTransform {
	/// Wrap the HTTP request into the provider's invocation envelope.
	#[default]
	Envelope,
	/// Send the raw body as the payload.
	None,
}

#[apply(schema!)]
#[derive(PartialEq, Eq)]
pub struct CloudFunctionAuth {
	pub secret_ref: SecretRef,
}

#[apply(schema!)]
pub struct Secret {
	pub metadata: ObjectMeta,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub data: BTreeMap<Strng, String>,
}

/// A config object holding non-sensitive key material (inline JWKS under `jwks`).
#[apply(schema!)]
pub struct ConfigObject {
	pub metadata: ObjectMeta,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub data: BTreeMap<Strng, String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_target_kind_allow_list() {
		assert_eq!(
			TargetKind::from_group_kind("gateway.networking.k8s.io", "Gateway"),
			Some(TargetKind::Gateway)
		);
		assert_eq!(TargetKind::from_group_kind("", "Service"), Some(TargetKind::Service));
		assert_eq!(TargetKind::from_group_kind("apps", "Deployment"), None);
	}

	#[test]
	fn test_precedence_weight() {
		let mut meta = ObjectMeta {
			name: strng::new("p"),
			namespace: strng::new("default"),
			..Default::default()
		};
		assert_eq!(meta.precedence_weight().unwrap(), 0);
		meta
			.annotations
			.insert(strng::new(POLICY_WEIGHT_ANNOTATION), strng::new("-3"));
		assert_eq!(meta.precedence_weight().unwrap(), -3);
		meta
			.annotations
			.insert(strng::new(POLICY_WEIGHT_ANNOTATION), strng::new("high"));
		assert!(meta.precedence_weight().is_err());
	}

	#[test]
	fn test_policy_object_parses() {
		let p: PolicyObject = serde_json::from_value(serde_json::json!({
			"metadata": {"name": "jwt", "namespace": "default"},
			"spec": {
				"targetRefs": [{"group": "gateway.networking.k8s.io", "kind": "HTTPRoute", "name": "api"}],
				"traffic": {
					"jwtAuthentication": {
						"providers": [{
							"name": "auth0",
							"issuer": "https://example.auth0.com",
							"jwks": {"remote": {
								"url": "https://example.auth0.com/.well-known/jwks.json",
								"backendRef": {"name": "auth0", "port": 443},
								"cacheDuration": "10m"
							}}
						}]
					}
				}
			}
		}))
		.unwrap();
		let traffic = p.spec.traffic.unwrap();
		assert_eq!(traffic.phase, PolicyPhase::PostRouting);
		let jwt = traffic.jwt_authentication.unwrap();
		assert_eq!(jwt.mode, AuthenticationMode::Strict);
		let JwksSpec::Remote { cache_duration, .. } = &jwt.providers[0].jwks else {
			panic!("expected remote jwks");
		};
		assert_eq!(*cache_duration, Some(Duration::from_secs(600)));
	}

	#[test]
	fn test_object_key_round_trip() {
		let k: ObjectKey = "default/api".parse().unwrap();
		assert_eq!(k, ObjectKey::new("default", "api"));
		assert_eq!(k.to_string(), "default/api");
		assert!("no-slash".parse::<ObjectKey>().is_err());
	}
}
