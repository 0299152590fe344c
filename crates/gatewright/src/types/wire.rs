//! Proxy-consumable wire configuration: HTTP filter instances, per-route overrides,
//! cluster descriptors and endpoint sets. Everything here is structurally comparable so
//! the reactive substrate can skip re-emitting identical output.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};

use crate::translate::PolicyError;
use crate::types::api::*;
use crate::*;

pub const JWT_AUTHN_FILTER: &str = "envoy.filters.http.jwt_authn";
pub const BASIC_AUTH_FILTER: &str = "envoy.filters.http.basic_auth";
pub const API_KEY_AUTH_FILTER: &str = "envoy.filters.http.api_key_auth";
pub const COMPRESSOR_FILTER: &str = "envoy.filters.http.compressor";
pub const DECOMPRESSOR_FILTER: &str = "envoy.filters.http.decompressor";
pub const LOCAL_RATELIMIT_FILTER: &str = "envoy.filters.http.local_ratelimit";
pub const GLOBAL_RATELIMIT_FILTER: &str = "envoy.filters.http.ratelimit";
pub const EXT_AUTHZ_FILTER: &str = "envoy.filters.http.ext_authz";
pub const EXT_PROC_FILTER: &str = "envoy.filters.http.ext_proc";
pub const RBAC_FILTER: &str = "envoy.filters.http.rbac";
pub const CORS_FILTER: &str = "envoy.filters.http.cors";
pub const CSRF_FILTER: &str = "envoy.filters.http.csrf";
pub const TRANSFORMATION_FILTER: &str = "envoy.filters.http.transformation";

/// The full output of one translation run.
#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct Translation {
	pub gateways: BTreeMap<Strng, GatewayConfig>,
	pub clusters: BTreeMap<Strng, Cluster>,
	/// Per-object validation errors, for the status sink. Translation always proceeds
	/// with whatever parts succeeded.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<ObjectErrors>,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct ObjectErrors {
	pub object: ObjectRef,
	pub errors: Vec<PolicyError>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectRef {
	pub kind: Strng,
	pub namespace: Strng,
	pub name: Strng,
}

impl ObjectRef {
	pub fn new(kind: impl AsRef<str>, key: &ObjectKey) -> Self {
		ObjectRef {
			kind: strng::new(kind),
			namespace: key.namespace.clone(),
			name: key.name.clone(),
		}
	}
}

impl Display for ObjectRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
	}
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct GatewayConfig {
	/// One filter chain per listener, keyed by listener name.
	pub filter_chains: BTreeMap<ListenerName, FilterChainConfig>,
	/// Per-route wire config, keyed by `{route namespace}/{route name}/{rule}`.
	pub routes: BTreeMap<Strng, RouteUnitConfig>,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct FilterChainConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub listener: Option<ListenerSettings>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_log: Option<AccessLogConfig>,
	/// Ordered filter instances. PreRouting policy materializes as enabled filters;
	/// route-scoped filters are inserted disabled and enabled per route.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub http_filters: Vec<HttpFilter>,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct ListenerSettings {
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub idle_timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_concurrent_streams: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub per_connection_buffer_limit_bytes: Option<u32>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub tls_handshake_timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub alpn: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<KeepaliveSpec>,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct AccessLogConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filter: Option<CelExpression>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub remove: Vec<Strng>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub add: Vec<AttributeAdd>,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct HttpFilter {
	pub name: Strng,
	/// Disabled filters have no effect unless a route opts in via a per-route override.
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub disabled: bool,
	pub filter: FilterKind,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub enum FilterKind {
	JwtAuthn(JwtAuthnConfig),
	BasicAuth(BasicAuthConfig),
	ApiKeyAuth(ApiKeyAuthConfig),
	Compressor(CompressorConfig),
	Decompressor(DecompressorConfig),
	LocalRateLimit(LocalRateLimitConfig),
	GlobalRateLimit(GlobalRateLimitConfig),
	ExtAuthz(ExtAuthzConfig),
	ExtProc(ExtProcConfig),
	Rbac(RbacConfig),
	Cors(CorsConfig),
	Csrf(CsrfConfig),
	Transformation(TransformationSpec),
	/// Per-route reference into the jwt_authn requirement map.
	JwtRequirementName(Strng),
}

// ===== jwt =====

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct JwtAuthnConfig {
	/// Wire providers keyed by their globally unique name.
	pub providers: BTreeMap<Strng, JwtProviderConfig>,
	pub requirement_map: BTreeMap<Strng, JwtRequirement>,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct JwtProviderConfig {
	pub issuer: Strng,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub audiences: Vec<String>,
	/// Metadata key under which the validated payload is stored.
	pub payload_in_metadata: Strng,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub claim_to_headers: Vec<JwtClaimToHeader>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub forward: bool,
	/// Claims can affect later routing decisions, so mappings invalidate the route cache.
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub clear_route_cache: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub from_headers: Vec<JwtHeaderSource>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub from_params: Vec<Strng>,
	pub jwks: JwksSourceConfig,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct JwtClaimToHeader {
	pub claim: Strng,
	pub header: Strng,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct JwtHeaderSource {
	pub name: Strng,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value_prefix: Option<Strng>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub enum JwksSourceConfig {
	/// Serialized JWK set, validated at translation time.
	LocalInline { keyset: String },
	/// Fetched by the proxy at runtime.
	Remote {
		url: Strng,
		cluster: Strng,
		#[serde(with = "serde_dur")]
		timeout: Duration,
		#[serde(with = "serde_dur")]
		cache_duration: Duration,
	},
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub enum JwtRequirement {
	Provider(Strng),
	/// OR semantics: any listed requirement satisfies.
	Any(Vec<JwtRequirement>),
	/// Missing tokens pass; present tokens must validate.
	AllowMissing(Box<JwtRequirement>),
	/// Nothing is rejected; validation results are only recorded.
	AllowMissingOrFailed(Box<JwtRequirement>),
}

// ===== authn (basic / api key) =====

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct BasicAuthConfig {
	/// htpasswd lines, already filtered to supported hashes.
	pub users: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub realm: Option<String>,
	pub mode: AuthenticationMode,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct ApiKeyAuthConfig {
	pub mode: AuthenticationMode,
	pub credentials: Vec<ApiKeyCredential>,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct ApiKeyCredential {
	pub key: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
}

// ===== compression =====

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct CompressorConfig {
	/// Codec at the listener; fixed gzip with default parameters.
	pub codec: Strng,
}

impl Default for CompressorConfig {
	fn default() -> Self {
		CompressorConfig {
			codec: strng::literal!("gzip"),
		}
	}
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct DecompressorConfig {
	pub codec: Strng,
}

impl Default for DecompressorConfig {
	fn default() -> Self {
		DecompressorConfig {
			codec: strng::literal!("gzip"),
		}
	}
}

// ===== rate limiting =====

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct LocalRateLimitConfig {
	pub limits: Vec<TokenBucketConfig>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct TokenBucketConfig {
	pub cost: RateLimitCost,
	pub max_tokens: u64,
	pub tokens_per_fill: u64,
	#[serde(with = "serde_dur")]
	pub fill_interval: Duration,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct GlobalRateLimitConfig {
	pub domain: Strng,
	pub cluster: Strng,
	pub descriptors: Vec<DescriptorConfig>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct DescriptorConfig {
	pub entries: Vec<DescriptorEntryConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unit: Option<RateLimitCost>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct DescriptorEntryConfig {
	pub name: Strng,
	pub expression: CelExpression,
}

// ===== ext authz / ext proc / rbac =====

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct ExtAuthzConfig {
	pub cluster: Strng,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub context: BTreeMap<String, String>,
	pub failure_mode: FailureModeConfig,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub include_request_headers: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub include_request_body: Option<BodyOptionsConfig>,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub enum FailureModeConfig {
	Allow,
	#[default]
	Deny,
	DenyWithStatus(u16),
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct BodyOptionsConfig {
	pub max_request_bytes: u32,
	pub allow_partial_message: bool,
	pub pack_as_bytes: bool,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct ExtProcConfig {
	pub cluster: Strng,
	pub failure_mode: ExtFailureMode,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub struct RbacConfig {
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub allow: Vec<CelExpression>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub deny: Vec<CelExpression>,
}

// ===== cors / csrf =====

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub struct CorsConfig {
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub allow_credentials: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub allow_headers: Vec<Strng>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub allow_methods: Vec<Strng>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub allow_origins: Vec<Strng>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub expose_headers: Vec<Strng>,
	/// Max age in whole seconds, as the proxy consumes it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_age: Option<u64>,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub struct CsrfConfig {
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub additional_origins: Vec<Strng>,
}

// ===== per-route =====

#[apply(schema_ser!)]
#[derive(Default, PartialEq)]
pub struct RouteUnitConfig {
	/// Per-route filter overrides, keyed by filter name.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub per_filter: BTreeMap<Strng, FilterOverride>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rewrite: Option<RewriteConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub host_rewrite: Option<HostnameRewriteMode>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_headers: Option<HeaderModifierSpec>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_headers: Option<HeaderModifierSpec>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry: Option<RetryConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub direct_response: Option<DirectResponseSpec>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub clear_route_cache: bool,
	/// Outbound-connection policy contributed by Gateway/Listener/Route-scoped
	/// backend sections; applied by the proxy to this route's upstream connections.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub backend_policy: Option<BackendPolicyConfig>,
}

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub enum FilterOverride {
	Enabled,
	Disabled,
	Config(FilterKind),
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub enum RewriteConfig {
	Regex { pattern: String, substitution: String },
	Prefix(Strng),
}

impl RewriteConfig {
	pub fn is_prefix_style(&self) -> bool {
		match self {
			RewriteConfig::Prefix(_) => true,
			// An anchored prefix regex is still a prefix-style replacement.
			RewriteConfig::Regex { pattern, .. } => {
				pattern.starts_with('^') && pattern.ends_with("/*")
			},
		}
	}
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct RetryConfig {
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub codes: Vec<u16>,
	pub attempts: u8,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub backoff: Option<Duration>,
}

// ===== clusters =====

#[apply(schema_ser!)]
#[derive(PartialEq)]
pub struct Cluster {
	pub name: Strng,
	pub discovery: DiscoveryType,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub endpoints: Vec<Target>,
	/// SNI hint for DNS-discovered clusters; only effective once TLS is configured.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sni: Option<Strng>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls: Option<UpstreamTlsConfig>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub connect_timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_version: Option<HttpVersion>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub pool_idle_timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<KeepaliveSpec>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub auth: Option<BackendAuthConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cloud_function: Option<CloudFunctionConfig>,
}

impl Cluster {
	pub fn new(name: Strng, discovery: DiscoveryType) -> Self {
		Cluster {
			name,
			discovery,
			endpoints: vec![],
			sni: None,
			tls: None,
			connect_timeout: None,
			http_version: None,
			pool_idle_timeout: None,
			keepalive: None,
			auth: None,
			cloud_function: None,
		}
	}
}

#[apply(schema_ser!)]
#[derive(Copy, PartialEq, Eq)]
pub enum DiscoveryType {
	/// All endpoints are pre-resolved literal addresses.
	Static,
	/// At least one endpoint needs resolution; the proxy resolves via DNS.
	StrictDns,
	/// Discovery is delegated to the dynamic resolver extension.
	DynamicForwardProxy,
}

/// A backend endpoint: a literal address, or a hostname the proxy must resolve.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Target {
	Address(SocketAddr),
	Hostname(Strng, u16),
}

impl TryFrom<(&str, u16)> for Target {
	type Error = anyhow::Error;

	fn try_from((host, port): (&str, u16)) -> Result<Self, Self::Error> {
		match host.parse::<IpAddr>() {
			Ok(ip) => Ok(Target::Address(SocketAddr::new(ip, port))),
			Err(_) => Ok(Target::Hostname(host.into(), port)),
		}
	}
}

impl Display for Target {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Target::Address(addr) => write!(f, "{addr}"),
			Target::Hostname(hostname, port) => write!(f, "{hostname}:{port}"),
		}
	}
}

impl serde::Serialize for Target {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub struct UpstreamTlsConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cert_chain: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub private_key: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub root_ca: Option<RootCaConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sni: Option<Strng>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub alpn: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub subject_alt_names: Vec<String>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub insecure_skip_verify: bool,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub enum RootCaConfig {
	Inline(String),
	SystemTrust,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub enum BackendAuthConfig {
	/// Value for the Authorization header, resolved from inline config or a secret.
	Key(String),
	Passthrough,
}

#[apply(schema_ser!)]
#[derive(Default, PartialEq, Eq)]
pub struct BackendPolicyConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_version: Option<HttpVersion>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub pool_idle_timeout: Option<Duration>,
	#[serde(with = "serde_dur_option", skip_serializing_if = "Option::is_none")]
	pub connect_timeout: Option<Duration>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keepalive: Option<KeepaliveSpec>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls: Option<UpstreamTlsConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub auth: Option<BackendAuthConfig>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct CloudFunctionConfig {
	pub function_arn: Strng,
	pub invocation_mode: InvocationMode,
	pub payload_transform: PayloadTransform,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub credentials: Option<CloudFunctionCredentials>,
}

#[apply(schema_ser!)]
#[derive(PartialEq, Eq)]
pub struct CloudFunctionCredentials {
	pub access_key_id: String,
	pub secret_access_key: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_token: Option<String>,
}
