//! The translation pipeline: Policy Index -> Merge Engine -> per-type translators.
//! Everything is a pure function of the snapshot; errors accumulate per owning object
//! and never abort processing of other units.

pub mod apikey;
pub mod authz;
pub mod backend;
pub mod backendtls;
pub mod basicauth;
pub mod compression;
pub mod cors;
pub mod csrf;
pub mod frontend;
pub mod headers;
pub mod jwt;
pub mod ratelimit;
pub mod retry;
pub mod url_rewrite;

use std::collections::BTreeMap;

use crate::index::PolicyIndex;
use crate::merge::{self, MergeMode, MergeResult};
use crate::snapshot::{Resolver, Snapshot};
use crate::types::api::*;
use crate::types::ir::*;
use crate::types::wire::*;
use crate::*;

/// Per-object translation error. Reference errors are retryable: they clear on their
/// own once the snapshot catches up. Validation and conflict errors need a spec change.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyError {
	#[error("{kind} {namespace}/{name} not found")]
	NotFound {
		kind: Strng,
		namespace: Strng,
		name: Strng,
	},
	#[error("invalid configuration: {0}")]
	Validation(String),
	#[error("conflict: {0}")]
	Conflict(String),
}

impl PolicyError {
	pub fn not_found(kind: impl AsRef<str>, namespace: impl AsRef<str>, name: impl AsRef<str>) -> Self {
		PolicyError::NotFound {
			kind: strng::new(kind),
			namespace: strng::new(namespace),
			name: strng::new(name),
		}
	}

	/// Whether the error is expected to clear once the external snapshot completes.
	pub fn retryable(&self) -> bool {
		matches!(self, PolicyError::NotFound { .. })
	}
}

#[derive(Default)]
struct ErrorSink {
	inner: BTreeMap<ObjectRef, Vec<PolicyError>>,
}

impl ErrorSink {
	fn record(&mut self, object: ObjectRef, errors: Vec<PolicyError>) {
		if !errors.is_empty() {
			self.inner.entry(object).or_default().extend(errors);
		}
	}

	fn into_list(self) -> Vec<ObjectErrors> {
		self
			.inner
			.into_iter()
			.map(|(object, errors)| ObjectErrors { object, errors })
			.collect()
	}
}

/// The policy object that won a field, for error attribution; falls back to the unit's
/// own object when the field came from route builtins.
fn field_owner(origins: &MergeOrigins, field: &str, fallback: &ObjectRef) -> ObjectRef {
	origins
		.get(field)
		.and_then(|full| full.parse::<ObjectKey>().ok())
		.map(|k| ObjectRef::new("Policy", &k))
		.unwrap_or_else(|| fallback.clone())
}

/// Translate one full snapshot. Pure and deterministic: the same snapshot always
/// yields a structurally equal [`Translation`].
pub fn translate(snapshot: &Snapshot) -> Translation {
	let index = PolicyIndex::build(snapshot);
	let mut sink = ErrorSink::default();
	for oe in index.errors() {
		sink.record(oe.object.clone(), oe.errors.clone());
	}

	let mut clusters = BTreeMap::new();
	translate_backends(snapshot, &index, &mut clusters, &mut sink);

	let mut gateways = BTreeMap::new();
	for (gw_key, gw) in &snapshot.gateways {
		let cfg = translate_gateway(snapshot, &index, gw_key, gw, &mut sink);
		gateways.insert(strng::new(gw_key.to_string()), cfg);
	}

	Translation {
		gateways,
		clusters,
		errors: sink.into_list(),
	}
}

fn translate_backends(
	snapshot: &Snapshot,
	index: &PolicyIndex,
	clusters: &mut BTreeMap<Strng, Cluster>,
	sink: &mut ErrorSink,
) {
	for (key, be) in &snapshot.backends {
		let fragments = index.resolve(&AttachmentPoint::backend(key.clone()));
		let merged = merge::merge_backend(&EffectiveBackendPolicy::default(), &fragments, MergeMode::Overridable);
		let (cluster, errors) = backend::translate(be, &merged.policy, snapshot);
		sink.record(ObjectRef::new("Backend", key), errors);
		clusters.insert(cluster.name.clone(), cluster);
	}
	for (key, svc) in &snapshot.services {
		let fragments = index.resolve(&AttachmentPoint::service(key.clone()));
		let merged = merge::merge_backend(&EffectiveBackendPolicy::default(), &fragments, MergeMode::Overridable);
		for port in &svc.ports {
			let (cluster, errors) = backend::translate_service(svc, *port, &merged.policy, snapshot);
			sink.record(ObjectRef::new("Service", key), errors);
			clusters.insert(cluster.name.clone(), cluster);
		}
	}
}

fn translate_gateway(
	snapshot: &Snapshot,
	index: &PolicyIndex,
	gw_key: &ObjectKey,
	gw: &Gateway,
	sink: &mut ErrorSink,
) -> GatewayConfig {
	let mut out = GatewayConfig::default();
	let mut needs = ChainNeeds::default();
	let gw_ref = ObjectRef::new("Gateway", gw_key);

	// Listener inventory: the gateway's own listeners plus any contributed by listener
	// sets attached to it.
	let mut listeners: Vec<(Option<ObjectKey>, &ListenerInfo)> =
		gw.listeners.iter().map(|l| (None, l)).collect();
	for ls in snapshot.listener_sets.values() {
		if ls.gateway == *gw_key {
			listeners.extend(ls.listeners.iter().map(|l| (Some(ls.metadata.key()), l)));
		}
	}

	for (ls_key, listener) in listeners {
		let point = AttachmentPoint::listener(gw_key.clone(), ls_key, listener.name.clone());
		let fragments = index.resolve(&point);

		let front = merge::merge_frontend(&EffectiveFrontendPolicy::default(), &fragments, MergeMode::Overridable);
		let (settings, access_log, errors) = frontend::translate(&front.policy);
		sink.record(gw_ref.clone(), errors);

		let pre_fragments = phase_fragments(&fragments, PolicyPhase::PreRouting);
		let pre = merge::merge_traffic(&EffectiveTrafficPolicy::default(), &pre_fragments, MergeMode::Overridable);
		let http_filters = pre_routing_filters(&pre, gw_key, &gw_ref, snapshot, sink);

		out.filter_chains.insert(
			listener.name.clone(),
			FilterChainConfig {
				listener: settings,
				access_log,
				http_filters,
			},
		);
	}

	for (route_key, route) in &snapshot.routes {
		if !route.parent_gateways.contains(gw_key) {
			continue;
		}
		for (idx, rule) in route.rules.iter().enumerate() {
			let rule_name = rule.rule_name(idx);
			let point = AttachmentPoint::route_rule(gw_key.clone(), None, route_key.clone(), rule_name.clone());
			let fragments = index.resolve(&point);

			let unit = translate_route_rule(route_key, rule, &fragments, snapshot, &mut needs, sink);
			out
				.routes
				.insert(strng::format!("{}/{}", route_key, rule_name), unit);
		}
	}

	// Route-scoped filters materialize once per chain, disabled, the first time any
	// route in the gateway needs them.
	for chain in out.filter_chains.values_mut() {
		needs.materialize(chain);
	}
	out
}

fn phase_fragments(fragments: &[AttachedFragment], phase: PolicyPhase) -> Vec<AttachedFragment> {
	fragments
		.iter()
		.filter(|f| {
			f.policy
				.spec
				.traffic
				.as_ref()
				.is_some_and(|t| t.phase == phase)
		})
		.cloned()
		.collect()
}

/// Route-builtin filters form the pre-populated base of the merge: they are part of
/// the route spec itself, so attached policy augments rather than overrides them.
fn builtin_base(rule: &RouteRuleInfo) -> EffectiveTrafficPolicy {
	let header_modifiers = if rule.request_header_modifier.is_some() || rule.response_header_modifier.is_some() {
		Some(HeaderModifiersSpec {
			request: rule.request_header_modifier.clone(),
			response: rule.response_header_modifier.clone(),
		})
	} else {
		None
	};
	EffectiveTrafficPolicy {
		url_rewrite: rule.url_rewrite.clone(),
		header_modifiers,
		timeouts: rule.timeouts.clone(),
		retry: rule.retry.clone(),
		..Default::default()
	}
}

fn translate_route_rule(
	route_key: &ObjectKey,
	rule: &RouteRuleInfo,
	fragments: &[AttachedFragment],
	snapshot: &Snapshot,
	needs: &mut ChainNeeds,
	sink: &mut ErrorSink,
) -> RouteUnitConfig {
	let route_ref = ObjectRef::new("HTTPRoute", route_key);
	let post = phase_fragments(fragments, PolicyPhase::PostRouting);
	let merged = merge::merge_traffic(&builtin_base(rule), &post, MergeMode::Augmented);
	let policy = &merged.policy;
	let unit_namespace = route_key.namespace.clone();

	let mut unit = RouteUnitConfig::default();
	let record = |field: &str, errors: Vec<PolicyError>, sink: &mut ErrorSink| {
		sink.record(field_owner(&merged.origins, field, &route_ref), errors);
	};

	if let Some(t) = &policy.timeouts {
		unit.timeout = t.request;
	}
	if let Some(r) = &policy.retry {
		let (cfg, errors) = retry::translate(r);
		record("retry", errors, sink);
		unit.retry = cfg;
	}
	if let Some(h) = &policy.header_modifiers {
		let (request, response, errors) = headers::translate_modifiers(h);
		record("header_modifiers", errors, sink);
		unit.request_headers = request;
		unit.response_headers = response;
	}
	if let Some(h) = &policy.hostname_rewrite {
		unit.host_rewrite = Some(h.mode);
	}
	if let Some(rw) = &policy.url_rewrite {
		match url_rewrite::translate(rw, rule.path_prefix.as_deref()) {
			Ok(rewrite) => url_rewrite::apply(&mut unit, rewrite, MergeMode::Augmented),
			Err(e) => record("url_rewrite", vec![e], sink),
		}
	}
	if let Some(dr) = &policy.direct_response {
		if http::StatusCode::from_u16(dr.status).is_ok() {
			unit.direct_response = Some(dr.clone());
		} else {
			record(
				"direct_response",
				vec![PolicyError::Validation(format!(
					"direct response: invalid status code {}",
					dr.status
				))],
				sink,
			);
		}
	}
	if let Some(c) = &policy.cors {
		let (cfg, errors) = cors::translate(c);
		record("cors", errors, sink);
		if let Some(cfg) = cfg {
			unit
				.per_filter
				.insert(strng::new(CORS_FILTER), FilterOverride::Config(FilterKind::Cors(cfg)));
		}
	}
	if let Some(c) = &policy.csrf {
		let (cfg, errors) = csrf::translate(c);
		record("csrf", errors, sink);
		if let Some(cfg) = cfg {
			unit
				.per_filter
				.insert(strng::new(CSRF_FILTER), FilterOverride::Config(FilterKind::Csrf(cfg)));
		}
	}
	if let Some(t) = &policy.transformation {
		let (cfg, errors) = translate_transformation(t);
		record("transformation", errors, sink);
		if let Some(cfg) = cfg {
			unit.per_filter.insert(
				strng::new(TRANSFORMATION_FILTER),
				FilterOverride::Config(FilterKind::Transformation(cfg)),
			);
		}
	}
	if let Some(a) = &policy.authorization {
		let (cfg, errors) = authz::translate_rules(a);
		record("authorization", errors, sink);
		if let Some(cfg) = cfg {
			unit
				.per_filter
				.insert(strng::new(RBAC_FILTER), FilterOverride::Config(FilterKind::Rbac(cfg)));
		}
	}
	if let Some(e) = &policy.ext_auth {
		let ns = merged.origin_namespace("ext_auth", &unit_namespace);
		let (cfg, errors) = authz::translate_ext_auth(e, ns, snapshot);
		record("ext_auth", errors, sink);
		if let Some(cfg) = cfg {
			unit.per_filter.insert(
				strng::new(EXT_AUTHZ_FILTER),
				FilterOverride::Config(FilterKind::ExtAuthz(cfg)),
			);
		}
	}
	if let Some(e) = &policy.ext_proc {
		let ns = merged.origin_namespace("ext_proc", &unit_namespace);
		let (cfg, errors) = authz::translate_ext_proc(e, ns, snapshot);
		record("ext_proc", errors, sink);
		if let Some(cfg) = cfg {
			unit.per_filter.insert(
				strng::new(EXT_PROC_FILTER),
				FilterOverride::Config(FilterKind::ExtProc(cfg)),
			);
		}
	}
	if let Some(rl) = &policy.rate_limit {
		if !rl.local.is_empty() {
			let (cfg, errors) = ratelimit::translate_local(&rl.local);
			record("rate_limit", errors, sink);
			if let Some(cfg) = cfg {
				unit.per_filter.insert(
					strng::new(LOCAL_RATELIMIT_FILTER),
					FilterOverride::Config(FilterKind::LocalRateLimit(cfg)),
				);
			}
		}
		if let Some(global) = &rl.global {
			let ns = merged.origin_namespace("rate_limit", &unit_namespace);
			let (cfg, errors) = ratelimit::translate_global(global, ns, snapshot);
			record("rate_limit", errors, sink);
			if let Some(cfg) = cfg {
				unit.per_filter.insert(
					strng::new(GLOBAL_RATELIMIT_FILTER),
					FilterOverride::Config(FilterKind::GlobalRateLimit(cfg)),
				);
			}
		}
	}
	if let Some(j) = &policy.jwt_authentication {
		let ns = merged.origin_namespace("jwt_authentication", &unit_namespace).to_string();
		let policy_name = origin_name(&merged.origins, "jwt_authentication").unwrap_or_else(|| route_key.name.clone());
		let (translation, errors) = jwt::translate(j, &ns, &policy_name, snapshot);
		record("jwt_authentication", errors, sink);
		if let Some(t) = translation {
			unit.clear_route_cache |= t.clear_route_cache;
			unit.per_filter.insert(
				strng::new(JWT_AUTHN_FILTER),
				FilterOverride::Config(FilterKind::JwtRequirementName(t.requirement_name.clone())),
			);
			needs.jwt_needed = true;
			needs.jwt.providers.extend(t.providers);
			needs.jwt.requirement_map.insert(t.requirement_name, t.requirement);
		}
	}
	if let Some(b) = &policy.basic_authentication {
		let ns = merged.origin_namespace("basic_authentication", &unit_namespace).to_string();
		let (cfg, errors) = basicauth::translate(b, &ns, snapshot);
		record("basic_authentication", errors, sink);
		if let Some(cfg) = cfg {
			unit.per_filter.insert(
				strng::new(BASIC_AUTH_FILTER),
				FilterOverride::Config(FilterKind::BasicAuth(cfg)),
			);
			needs.basic_auth = true;
		}
	}
	if let Some(a) = &policy.api_key_authentication {
		let ns = merged.origin_namespace("api_key_authentication", &unit_namespace).to_string();
		let (cfg, errors) = apikey::translate(a, &ns, snapshot);
		record("api_key_authentication", errors, sink);
		if let Some(cfg) = cfg {
			unit.per_filter.insert(
				strng::new(API_KEY_AUTH_FILTER),
				FilterOverride::Config(FilterKind::ApiKeyAuth(cfg)),
			);
		}
	}
	if let Some(c) = &policy.compression {
		let wants = compression::translate(c);
		if let Some(enabled) = wants.compressor {
			let over = if enabled {
				needs.compressor = true;
				FilterOverride::Enabled
			} else {
				FilterOverride::Disabled
			};
			unit.per_filter.insert(strng::new(COMPRESSOR_FILTER), over);
		}
		if let Some(enabled) = wants.decompressor {
			let over = if enabled {
				needs.decompressor = true;
				FilterOverride::Enabled
			} else {
				FilterOverride::Disabled
			};
			unit.per_filter.insert(strng::new(DECOMPRESSOR_FILTER), over);
		}
	}

	// Outbound-connection policy attached above the backend level rides along with the
	// route unit; backend/service-level fragments apply on the clusters themselves.
	let be_merged = merge::merge_backend(&EffectiveBackendPolicy::default(), fragments, MergeMode::Overridable);
	if be_merged.policy != EffectiveBackendPolicy::default() {
		unit.backend_policy = translate_backend_policy(&be_merged, &unit_namespace, snapshot, &route_ref, sink);
	}

	unit
}

fn origin_name(origins: &MergeOrigins, field: &str) -> Option<Strng> {
	origins
		.get(field)
		.and_then(|full| full.split_once('/').map(|(_, name)| strng::new(name)))
}

fn translate_backend_policy(
	merged: &MergeResult<EffectiveBackendPolicy>,
	unit_namespace: &str,
	resolver: &dyn Resolver,
	fallback: &ObjectRef,
	sink: &mut ErrorSink,
) -> Option<BackendPolicyConfig> {
	let mut cfg = BackendPolicyConfig::default();
	let policy = &merged.policy;
	if let Some(http) = &policy.http {
		cfg.http_version = http.version;
		cfg.pool_idle_timeout = http.pool_idle_timeout;
	}
	if let Some(tcp) = &policy.tcp {
		cfg.connect_timeout = tcp.connect_timeout;
		cfg.keepalive = tcp.keepalive.clone();
	}
	if let Some(tls) = &policy.tls {
		let ns = merged.origin_namespace("tls", unit_namespace);
		let (tls_cfg, errors) = backendtls::translate(tls, ns, resolver);
		sink.record(field_owner(&merged.origins, "tls", fallback), errors);
		cfg.tls = tls_cfg;
	}
	if let Some(auth) = &policy.auth {
		let ns = merged.origin_namespace("auth", unit_namespace);
		match backend::translate_auth(auth, ns, resolver) {
			Ok(a) => cfg.auth = Some(a),
			Err(e) => sink.record(field_owner(&merged.origins, "auth", fallback), vec![e]),
		}
	}
	(cfg != BackendPolicyConfig::default()).then_some(cfg)
}

fn translate_transformation(
	spec: &TransformationSpec,
) -> (Option<TransformationSpec>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let mut check = |t: &Option<TransformSpec>, direction: &str| {
		let Some(t) = t else { return };
		for h in t.set.iter().chain(t.add.iter()) {
			if h.expression.trim().is_empty() {
				errors.push(PolicyError::Validation(format!(
					"{direction} transformation: empty expression for header {}",
					h.name
				)));
			}
		}
		if let Some(body) = &t.body
			&& body.trim().is_empty()
		{
			errors.push(PolicyError::Validation(format!(
				"{direction} transformation: empty body expression"
			)));
		}
	};
	check(&spec.request, "request");
	check(&spec.response, "response");
	if !errors.is_empty() {
		return (None, errors);
	}
	(Some(spec.clone()), errors)
}

/// Pre-routing filter instances run for the whole chain and get their own instance
/// names, so per-route overrides on the route-scoped instances cannot touch them.
fn pre_routing_name(filter: &str) -> Strng {
	strng::format!("{filter}.pre_routing")
}

fn pre_routing_filters(
	pre: &MergeResult<EffectiveTrafficPolicy>,
	gw_key: &ObjectKey,
	gw_ref: &ObjectRef,
	resolver: &dyn Resolver,
	sink: &mut ErrorSink,
) -> Vec<HttpFilter> {
	let mut filters = Vec::new();
	let policy = &pre.policy;

	if let Some(j) = &policy.jwt_authentication {
		let ns = pre.origin_namespace("jwt_authentication", &gw_key.namespace).to_string();
		let policy_name = origin_name(&pre.origins, "jwt_authentication").unwrap_or_else(|| gw_key.name.clone());
		let (translation, errors) = jwt::translate(j, &ns, &policy_name, resolver);
		sink.record(field_owner(&pre.origins, "jwt_authentication", gw_ref), errors);
		if let Some(t) = translation {
			let mut cfg = JwtAuthnConfig {
				providers: t.providers,
				requirement_map: BTreeMap::new(),
			};
			cfg.requirement_map.insert(t.requirement_name, t.requirement);
			filters.push(HttpFilter {
				name: pre_routing_name(JWT_AUTHN_FILTER),
				disabled: false,
				filter: FilterKind::JwtAuthn(cfg),
			});
		}
	}
	if let Some(e) = &policy.ext_auth {
		let ns = pre.origin_namespace("ext_auth", &gw_key.namespace);
		let (cfg, errors) = authz::translate_ext_auth(e, ns, resolver);
		sink.record(field_owner(&pre.origins, "ext_auth", gw_ref), errors);
		if let Some(cfg) = cfg {
			filters.push(HttpFilter {
				name: pre_routing_name(EXT_AUTHZ_FILTER),
				disabled: false,
				filter: FilterKind::ExtAuthz(cfg),
			});
		}
	}
	if let Some(e) = &policy.ext_proc {
		let ns = pre.origin_namespace("ext_proc", &gw_key.namespace);
		let (cfg, errors) = authz::translate_ext_proc(e, ns, resolver);
		sink.record(field_owner(&pre.origins, "ext_proc", gw_ref), errors);
		if let Some(cfg) = cfg {
			filters.push(HttpFilter {
				name: pre_routing_name(EXT_PROC_FILTER),
				disabled: false,
				filter: FilterKind::ExtProc(cfg),
			});
		}
	}
	if let Some(t) = &policy.transformation {
		let (cfg, errors) = translate_transformation(t);
		sink.record(field_owner(&pre.origins, "transformation", gw_ref), errors);
		if let Some(cfg) = cfg {
			filters.push(HttpFilter {
				name: pre_routing_name(TRANSFORMATION_FILTER),
				disabled: false,
				filter: FilterKind::Transformation(cfg),
			});
		}
	}
	filters
}

/// Which route-scoped filters this gateway's chains must carry. They are appended
/// disabled; routes opt in through their per-route overrides.
#[derive(Default)]
struct ChainNeeds {
	jwt: JwtAuthnConfig,
	jwt_needed: bool,
	basic_auth: bool,
	compressor: bool,
	decompressor: bool,
}

impl ChainNeeds {
	fn materialize(&self, chain: &mut FilterChainConfig) {
		if self.jwt_needed {
			chain.http_filters.push(HttpFilter {
				name: strng::new(JWT_AUTHN_FILTER),
				disabled: true,
				filter: FilterKind::JwtAuthn(self.jwt.clone()),
			});
		}
		if self.basic_auth {
			chain.http_filters.push(HttpFilter {
				name: strng::new(BASIC_AUTH_FILTER),
				disabled: true,
				// An empty data source would be rejected by the proxy, so the
				// placeholder is a comment line.
				filter: FilterKind::BasicAuth(BasicAuthConfig {
					users: "#".to_string(),
					realm: None,
					mode: AuthenticationMode::Strict,
				}),
			});
		}
		if self.compressor {
			chain.http_filters.push(HttpFilter {
				name: strng::new(COMPRESSOR_FILTER),
				disabled: true,
				filter: FilterKind::Compressor(CompressorConfig::default()),
			});
		}
		if self.decompressor {
			chain.http_filters.push(HttpFilter {
				name: strng::new(DECOMPRESSOR_FILTER),
				disabled: true,
				filter: FilterKind::Decompressor(DecompressorConfig::default()),
			});
		}
	}
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
