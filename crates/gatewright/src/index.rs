//! Policy index: expands every policy object's target refs and selectors into
//! concrete attachments, then answers "which fragments apply to this unit, in which
//! order" for the merge fold.

use crate::snapshot::Snapshot;
use crate::translate::PolicyError;
use crate::types::api::*;
use crate::types::ir::*;
use crate::types::wire::{ObjectErrors, ObjectRef};
use crate::*;

/// Traffic fields a PreRouting fragment may carry: only processing that can influence
/// the routing decision runs before it.
const PRE_ROUTING_FIELDS: &[&str] = &["extAuth", "extProc", "transformation", "jwtAuthentication"];

#[derive(Debug, Default)]
pub struct PolicyIndex {
	entries: Vec<IndexEntry>,
	errors: Vec<ObjectErrors>,
}

#[derive(Debug)]
struct IndexEntry {
	policy: Arc<PolicyObject>,
	weight: i32,
	kind: TargetKind,
	target: ObjectKey,
	section: Option<Strng>,
}

impl PolicyIndex {
	pub fn build(snapshot: &Snapshot) -> PolicyIndex {
		let mut index = PolicyIndex::default();
		for policy in &snapshot.policies {
			let mut errors = Vec::new();
			index.add_policy(snapshot, policy, &mut errors);
			if !errors.is_empty() {
				index.errors.push(ObjectErrors {
					object: ObjectRef::new("Policy", &policy.metadata.key()),
					errors,
				});
			}
		}
		index
	}

	/// Per-policy errors found while indexing, for the status sink.
	pub fn errors(&self) -> &[ObjectErrors] {
		&self.errors
	}

	fn add_policy(&mut self, snapshot: &Snapshot, policy: &Arc<PolicyObject>, errors: &mut Vec<PolicyError>) {
		let spec = &policy.spec;
		let has_refs = !spec.target_refs.is_empty();
		let has_selectors = !spec.target_selectors.is_empty();
		if has_refs == has_selectors {
			errors.push(PolicyError::Validation(
				"exactly one of targetRefs and targetSelectors must be set".to_string(),
			));
			return;
		}

		let weight = match policy.metadata.precedence_weight() {
			Ok(w) => w,
			Err(e) => {
				errors.push(PolicyError::Validation(e.to_string()));
				0
			},
		};

		// Resolve every target to a (kind, name, section) triple. All targets on one
		// policy must agree on a single kind.
		let mut resolved: Vec<(TargetKind, Strng, Option<Strng>)> = Vec::new();
		for r in &spec.target_refs {
			match TargetKind::from_group_kind(&r.group, &r.kind) {
				Some(kind) => resolved.push((kind, r.name.clone(), r.section_name.clone())),
				None => errors.push(PolicyError::Validation(format!(
					"target kind {}/{} is not attachable",
					r.group, r.kind
				))),
			}
		}
		for s in &spec.target_selectors {
			let Some(kind) = TargetKind::from_group_kind(&s.group, &s.kind) else {
				errors.push(PolicyError::Validation(format!(
					"target kind {}/{} is not attachable",
					s.group, s.kind
				)));
				continue;
			};
			for name in select_names(snapshot, kind, &policy.metadata.namespace, &s.match_labels) {
				resolved.push((kind, name, s.section_name.clone()));
			}
		}

		// Matching nothing is not a failure; the policy is simply inert.
		if resolved.is_empty() {
			return;
		}

		let kinds = resolved.iter().map(|(k, _, _)| *k).unique().collect_vec();
		if kinds.len() > 1 {
			errors.push(PolicyError::Conflict(format!(
				"targets must agree on a single kind, found {kinds:?}"
			)));
			return;
		}

		self.validate_sections(policy, &resolved, kinds.first().copied(), errors);

		let namespace = &policy.metadata.namespace;
		for (kind, name, section) in resolved {
			self.entries.push(IndexEntry {
				policy: policy.clone(),
				weight,
				kind,
				target: ObjectKey {
					namespace: namespace.clone(),
					name,
				},
				section,
			});
		}
	}

	fn validate_sections(
		&self,
		policy: &PolicyObject,
		resolved: &[(TargetKind, Strng, Option<Strng>)],
		kind: Option<TargetKind>,
		errors: &mut Vec<PolicyError>,
	) {
		if policy.spec.frontend.is_some() {
			let sectioned = resolved.iter().any(|(_, _, s)| s.is_some());
			if kind != Some(TargetKind::Gateway) || sectioned {
				errors.push(PolicyError::Validation(
					"frontend policy may only target a whole Gateway".to_string(),
				));
			}
		}
		let Some(traffic) = policy.spec.traffic.as_ref() else {
			return;
		};
		if traffic.phase == PolicyPhase::PreRouting {
			if !matches!(kind, Some(TargetKind::Gateway | TargetKind::XListenerSet)) {
				errors.push(PolicyError::Validation(
					"phase PreRouting may only target a Gateway or XListenerSet".to_string(),
				));
			}
			if let Some(field) = disallowed_pre_routing_field(traffic) {
				errors.push(PolicyError::Validation(format!(
					"phase PreRouting only supports {}; found {field}",
					PRE_ROUTING_FIELDS.join(", ")
				)));
			}
		}
	}

	/// Ordered fragment list for one unit. Ascending specificity, then weight; at equal
	/// specificity and weight the lexicographically-first name wins, so names sort
	/// descending and the winner lands last in the fold. A policy matching nothing is
	/// simply absent.
	pub fn resolve(&self, point: &AttachmentPoint) -> Vec<AttachedFragment> {
		let mut matched: Vec<AttachedFragment> = self
			.entries
			.iter()
			.filter_map(|e| {
				e.match_level(point).map(|level| AttachedFragment {
					policy: e.policy.clone(),
					level,
					weight: e.weight,
				})
			})
			.collect();
		matched.sort_by(|a, b| {
			a.level
				.cmp(&b.level)
				.then(a.weight.cmp(&b.weight))
				.then_with(|| b.name().cmp(&a.name()))
		});
		matched
	}
}

impl IndexEntry {
	fn match_level(&self, point: &AttachmentPoint) -> Option<AttachmentLevel> {
		match self.kind {
			TargetKind::Gateway => {
				if point.gateway.as_ref() != Some(&self.target) {
					return None;
				}
				match &self.section {
					// No section: the whole gateway, flowing down to every listener,
					// still ranked at gateway specificity.
					None => Some(AttachmentLevel::Gateway),
					Some(s) => (point.listener.as_ref() == Some(s)).then_some(AttachmentLevel::Listener),
				}
			},
			TargetKind::XListenerSet => {
				if point.listener_set.as_ref() != Some(&self.target) {
					return None;
				}
				match &self.section {
					None => Some(AttachmentLevel::ListenerSet),
					Some(s) => (point.listener.as_ref() == Some(s)).then_some(AttachmentLevel::Listener),
				}
			},
			TargetKind::HTTPRoute => {
				if point.route.as_ref() != Some(&self.target) {
					return None;
				}
				match &self.section {
					None => Some(AttachmentLevel::Route),
					Some(s) => (point.rule.as_ref() == Some(s)).then_some(AttachmentLevel::RouteRule),
				}
			},
			TargetKind::Service => (self.section.is_none()
				&& point.service.as_ref() == Some(&self.target))
			.then_some(AttachmentLevel::Backend),
			TargetKind::Backend => (self.section.is_none()
				&& point.backend.as_ref() == Some(&self.target))
			.then_some(AttachmentLevel::Backend),
		}
	}
}

fn select_names(
	snapshot: &Snapshot,
	kind: TargetKind,
	namespace: &Strng,
	labels: &std::collections::BTreeMap<Strng, Strng>,
) -> Vec<Strng> {
	fn matching<T>(
		objs: &std::collections::BTreeMap<ObjectKey, Arc<T>>,
		meta: impl Fn(&T) -> &ObjectMeta,
		namespace: &Strng,
		labels: &std::collections::BTreeMap<Strng, Strng>,
	) -> Vec<Strng> {
		objs
			.values()
			.filter(|o| {
				let m = meta(o);
				&m.namespace == namespace && m.matches_labels(labels)
			})
			.map(|o| meta(o).name.clone())
			.collect()
	}
	match kind {
		TargetKind::Gateway => matching(&snapshot.gateways, |g| &g.metadata, namespace, labels),
		TargetKind::XListenerSet => matching(&snapshot.listener_sets, |l| &l.metadata, namespace, labels),
		TargetKind::HTTPRoute => matching(&snapshot.routes, |r| &r.metadata, namespace, labels),
		TargetKind::Service => matching(&snapshot.services, |s| &s.metadata, namespace, labels),
		TargetKind::Backend => matching(&snapshot.backends, |b| &b.metadata, namespace, labels),
	}
}

fn disallowed_pre_routing_field(traffic: &TrafficSpec) -> Option<&'static str> {
	if traffic.rate_limit.is_some() {
		return Some("rateLimit");
	}
	if traffic.cors.is_some() {
		return Some("cors");
	}
	if traffic.csrf.is_some() {
		return Some("csrf");
	}
	if traffic.header_modifiers.is_some() {
		return Some("headerModifiers");
	}
	if traffic.hostname_rewrite.is_some() {
		return Some("hostnameRewrite");
	}
	if traffic.url_rewrite.is_some() {
		return Some("urlRewrite");
	}
	if traffic.compression.is_some() {
		return Some("compression");
	}
	if traffic.timeouts.is_some() {
		return Some("timeouts");
	}
	if traffic.retry.is_some() {
		return Some("retry");
	}
	if traffic.authorization.is_some() {
		return Some("authorization");
	}
	if traffic.basic_authentication.is_some() {
		return Some("basicAuthentication");
	}
	if traffic.api_key_authentication.is_some() {
		return Some("apiKeyAuthentication");
	}
	if traffic.direct_response.is_some() {
		return Some("directResponse");
	}
	None
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
